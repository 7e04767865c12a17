use thiserror::Error;

/// Typed failures surfaced by the prediction core.
///
/// Pure stages (extraction, prediction, confidence) never produce these on well-formed
/// input; only configuration loading and data access do.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("insufficient or contradictory data: {reason}")]
    InsufficientData { reason: String },

    #[error(transparent)]
    DataAccess(#[from] anyhow::Error),
}

impl PredictionError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn insufficient_data(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }

    pub fn fight_not_found(id: u64) -> Self {
        Self::NotFound { entity: "fight", id }
    }

    pub fn fighter_not_found(id: u64) -> Self {
        Self::NotFound {
            entity: "fighter",
            id,
        }
    }

    /// Errors a batch caller may skip over instead of aborting.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, PredictionError>;
