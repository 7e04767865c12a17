use serde::{Deserialize, Serialize};

use crate::error::{PredictionError, Result};

pub const DEFAULT_LOGISTIC_SLOPE: f64 = 3.0;
pub const MAX_LOGISTIC_SLOPE: f64 = 50.0;
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Record,
    Striking,
    Grappling,
    Form,
    Physical,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Record,
        Category::Striking,
        Category::Grappling,
        Category::Form,
        Category::Physical,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Record => "record",
            Category::Striking => "striking",
            Category::Grappling => "grappling",
            Category::Form => "form",
            Category::Physical => "physical",
        }
    }
}

/// Raw, unvalidated weights as they appear in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightsFile {
    #[serde(default)]
    pub record: f64,
    #[serde(default)]
    pub striking: f64,
    #[serde(default)]
    pub grappling: f64,
    #[serde(default)]
    pub form: f64,
    #[serde(default)]
    pub physical: f64,
}

/// Category weights, normalized to sum to 1.0. Only obtainable through validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionWeights {
    record: f64,
    striking: f64,
    grappling: f64,
    form: f64,
    physical: f64,
}

impl PredictionWeights {
    pub fn new(record: f64, striking: f64, grappling: f64, form: f64, physical: f64) -> Result<Self> {
        let raw = [record, striking, grappling, form, physical];
        for (cat, w) in Category::ALL.iter().zip(raw) {
            if !w.is_finite() {
                return Err(PredictionError::configuration(format!(
                    "weight for {} is not a finite number",
                    cat.name()
                )));
            }
            if w < 0.0 {
                return Err(PredictionError::configuration(format!(
                    "weight for {} is negative ({w})",
                    cat.name()
                )));
            }
        }
        let total: f64 = raw.iter().sum();
        if total <= 0.0 {
            return Err(PredictionError::configuration("weights sum to zero"));
        }
        Ok(Self {
            record: record / total,
            striking: striking / total,
            grappling: grappling / total,
            form: form / total,
            physical: physical / total,
        })
    }

    /// Balanced weights: record and striking lead, physical attributes matter least.
    pub fn balanced() -> Self {
        Self {
            record: 0.25,
            striking: 0.25,
            grappling: 0.20,
            form: 0.20,
            physical: 0.10,
        }
    }

    pub fn striking_focused() -> Self {
        Self {
            record: 0.20,
            striking: 0.37,
            grappling: 0.13,
            form: 0.20,
            physical: 0.10,
        }
    }

    pub fn grappling_focused() -> Self {
        Self {
            record: 0.20,
            striking: 0.15,
            grappling: 0.35,
            form: 0.20,
            physical: 0.10,
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "balanced" => Ok(Self::balanced()),
            "striking" | "striking_focused" => Ok(Self::striking_focused()),
            "grappling" | "grappling_focused" => Ok(Self::grappling_focused()),
            other => Err(PredictionError::configuration(format!(
                "unknown weights preset '{other}'"
            ))),
        }
    }

    pub fn weight(&self, category: Category) -> f64 {
        match category {
            Category::Record => self.record,
            Category::Striking => self.striking,
            Category::Grappling => self.grappling,
            Category::Form => self.form,
            Category::Physical => self.physical,
        }
    }

    pub fn total(&self) -> f64 {
        Category::ALL.iter().map(|c| self.weight(*c)).sum()
    }
}

impl Default for PredictionWeights {
    fn default() -> Self {
        Self::balanced()
    }
}

impl TryFrom<WeightsFile> for PredictionWeights {
    type Error = PredictionError;

    fn try_from(raw: WeightsFile) -> Result<Self> {
        Self::new(raw.record, raw.striking, raw.grappling, raw.form, raw.physical)
    }
}

/// Tunable constants of the model that are not category weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Slope of the logistic mapping from combined advantage to probability.
    pub logistic_slope: f64,
    /// Number of most recent results kept in a snapshot's form string.
    pub form_window: usize,
    /// Lowest confidence ever reported; debut-vs-debut predictions sit exactly here.
    pub confidence_floor: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            logistic_slope: DEFAULT_LOGISTIC_SLOPE,
            form_window: crate::snapshot::DEFAULT_FORM_WINDOW,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
        }
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<()> {
        if !self.logistic_slope.is_finite()
            || self.logistic_slope <= 0.0
            || self.logistic_slope > MAX_LOGISTIC_SLOPE
        {
            return Err(PredictionError::configuration(format!(
                "logistic slope must be in (0, {MAX_LOGISTIC_SLOPE}], got {}",
                self.logistic_slope
            )));
        }
        if self.form_window == 0 {
            return Err(PredictionError::configuration("form window must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.confidence_floor) {
            return Err(PredictionError::configuration(format!(
                "confidence floor must be in [0, 1), got {}",
                self.confidence_floor
            )));
        }
        Ok(())
    }
}
