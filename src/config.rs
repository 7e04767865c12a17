use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::{PredictionError, Result};
use crate::weights::{ModelParams, PredictionWeights, WeightsFile};

pub const ENV_WEIGHTS_PRESET: &str = "FIGHT_WEIGHTS_PRESET";
pub const ENV_WEIGHTS_PATH: &str = "FIGHT_WEIGHTS_PATH";
pub const ENV_LOGISTIC_SLOPE: &str = "FIGHT_LOGISTIC_SLOPE";
pub const ENV_FORM_WINDOW: &str = "FIGHT_FORM_WINDOW";
pub const ENV_CONFIDENCE_FLOOR: &str = "FIGHT_CONFIDENCE_FLOOR";
pub const ENV_DB_PATH: &str = "FIGHT_DB_PATH";

const CACHE_DIR: &str = "fight-forecast";
const DB_FILE: &str = "fights.sqlite";

/// Everything the engine needs besides a data source. Validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineConfig {
    pub weights: PredictionWeights,
    pub params: ModelParams,
}

impl EngineConfig {
    pub fn new(weights: PredictionWeights, params: ModelParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { weights, params })
    }

    /// Reads `.env.local` / `.env`, then the process environment.
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. A weights file wins over a preset name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let weights = match (get(ENV_WEIGHTS_PATH), get(ENV_WEIGHTS_PRESET)) {
            (Some(path), _) => load_weights_file(Path::new(path.trim()))?,
            (None, Some(name)) => PredictionWeights::preset(&name)?,
            (None, None) => PredictionWeights::default(),
        };

        let mut params = ModelParams::default();
        if let Some(raw) = get(ENV_LOGISTIC_SLOPE) {
            params.logistic_slope = parse_value(ENV_LOGISTIC_SLOPE, &raw)?;
        }
        if let Some(raw) = get(ENV_FORM_WINDOW) {
            params.form_window = parse_value(ENV_FORM_WINDOW, &raw)?;
        }
        if let Some(raw) = get(ENV_CONFIDENCE_FLOOR) {
            params.confidence_floor = parse_value(ENV_CONFIDENCE_FLOOR, &raw)?;
        }
        Self::new(weights, params)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| PredictionError::configuration(format!("{key}: cannot parse '{raw}'")))
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn load_weights_file(path: &Path) -> Result<PredictionWeights> {
    let raw = fs::read_to_string(path).map_err(|err| {
        PredictionError::configuration(format!("read weights {}: {err}", path.display()))
    })?;
    let file: WeightsFile = serde_json::from_str(&raw).map_err(|err| {
        PredictionError::configuration(format!("parse weights {}: {err}", path.display()))
    })?;
    PredictionWeights::try_from(file)
}

pub fn save_weights_file(path: &Path, weights: &PredictionWeights) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(weights).context("serialize weights")?;
    fs::write(&tmp, json).context("write weights")?;
    fs::rename(&tmp, path).context("swap weights")?;
    Ok(())
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

/// `--db` value, then `FIGHT_DB_PATH`, then the cache dir.
pub fn resolve_db_path(cli: Option<PathBuf>) -> Option<PathBuf> {
    cli.or_else(|| {
        std::env::var(ENV_DB_PATH)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    })
    .or_else(default_db_path)
}
