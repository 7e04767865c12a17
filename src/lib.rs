pub mod backtest;
pub mod calibration;
pub mod cli;
pub mod confidence;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod fight_db;
pub mod logging;
pub mod model;
pub mod predictor;
pub mod snapshot;
pub mod store;
pub mod store_worker;
pub mod synthetic;
pub mod weights;

pub use config::EngineConfig;
pub use engine::{Prediction, PredictionBasis, PredictionEngine};
pub use error::{PredictionError, Result};
pub use store::{FightDataSource, MemoryStore};
