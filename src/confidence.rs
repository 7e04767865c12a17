//! Trustworthiness of a prediction, from data completeness and recency only.

use serde::{Deserialize, Serialize};

use crate::features::FighterFeatures;
use crate::weights::DEFAULT_CONFIDENCE_FLOOR;

const QUALITY_SHARE: f64 = 0.45;
const EXPERIENCE_SHARE: f64 = 0.35;
const RECENCY_SHARE: f64 = 0.20;

const FRESH_DAYS: f64 = 365.0;
const STALE_DAYS: f64 = 1460.0;
/// An unknown gap scores as stale so losing the date can never help.
const UNKNOWN_RECENCY: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    Low,
    Medium,
    High,
}

impl ConfidenceLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            ConfidenceLabel::High
        } else if score >= 0.4 {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLabel::Low => "Low",
            ConfidenceLabel::Medium => "Medium",
            ConfidenceLabel::High => "High",
        }
    }
}

/// The three inputs of the overall score, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    pub data_quality: f64,
    pub experience: f64,
    pub recency: f64,
}

impl ConfidenceFactors {
    pub fn from_features(a: &FighterFeatures, b: &FighterFeatures) -> Self {
        let defaulted = (a.meta.defaulted_fraction() + b.meta.defaulted_fraction()) / 2.0;
        let sample = a.meta.sample_size.min(b.meta.sample_size);
        let days = match (a.meta.days_since_last_fight, b.meta.days_since_last_fight) {
            (Some(x), Some(y)) => Some(x.max(y)),
            _ => None,
        };
        Self {
            data_quality: (1.0 - defaulted).clamp(0.0, 1.0),
            experience: experience_factor(sample),
            recency: recency_factor(days),
        }
    }

    fn weighted(&self) -> f64 {
        QUALITY_SHARE * self.data_quality
            + EXPERIENCE_SHARE * self.experience
            + RECENCY_SHARE * self.recency
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceScorer {
    floor: f64,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_FLOOR)
    }
}

impl ConfidenceScorer {
    pub fn new(floor: f64) -> Self {
        Self {
            floor: floor.clamp(0.0, 1.0),
        }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Confidence in [floor, 1]. Does not look at either fighter's win probability.
    pub fn score(&self, a: &FighterFeatures, b: &FighterFeatures) -> f64 {
        self.score_factors(&ConfidenceFactors::from_features(a, b))
    }

    pub fn score_factors(&self, factors: &ConfidenceFactors) -> f64 {
        factors.weighted().clamp(self.floor, 1.0)
    }
}

fn experience_factor(fights: u32) -> f64 {
    match fights {
        20.. => 1.0,
        15..=19 => 0.9,
        10..=14 => 0.75,
        5..=9 => 0.5,
        3..=4 => 0.3,
        _ => 0.1,
    }
}

fn recency_factor(days: Option<i64>) -> f64 {
    match days {
        None => UNKNOWN_RECENCY,
        Some(d) => {
            let d = d.max(0) as f64;
            if d <= FRESH_DAYS {
                1.0
            } else {
                (1.0 - (d - FRESH_DAYS) / (STALE_DAYS - FRESH_DAYS)).max(0.0)
            }
        }
    }
}
