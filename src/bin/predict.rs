use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use fight_forecast::cli;
use fight_forecast::model::{Fight, Fighter, FighterId};
use fight_forecast::weights::{PredictionWeights, WeightsFile};
use fight_forecast::{EngineConfig, MemoryStore, PredictionEngine, logging};

/// One hypothetical bout plus everything needed to predict it.
#[derive(Debug, serde::Deserialize)]
struct MatchupCase {
    fighter_a: FighterId,
    fighter_b: FighterId,
    as_of: NaiveDate,
    fighters: Vec<Fighter>,
    #[serde(default)]
    history: Vec<Fight>,
    #[serde(default)]
    weights: Option<WeightsFile>,
}

fn main() -> Result<()> {
    logging::init();
    let args = cli::args();
    let path = args
        .iter()
        .find(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/matchup_case.json"));

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let case: MatchupCase = serde_json::from_str(&raw).context("parse matchup case")?;

    let mut config = EngineConfig::from_env()?;
    if let Some(w) = case.weights {
        config.weights = PredictionWeights::try_from(w)?;
    }

    let mut store = MemoryStore::new();
    for fighter in case.fighters {
        store.insert_fighter(fighter);
    }
    for fight in case.history {
        store.insert_fight(fight);
    }

    let engine = PredictionEngine::new(store, config)?;
    let prediction = engine.predict_matchup(case.fighter_a, case.fighter_b, case.as_of)?;

    if cli::has_flag(&args, "--summary") {
        println!(
            "{} vs {}",
            prediction.fighter_a.name, prediction.fighter_b.name
        );
        println!(
            "Winner: {} ({:.1}%)",
            prediction.winner_name,
            prediction.win_probability * 100.0
        );
        println!(
            "Confidence: {:.2} ({})",
            prediction.confidence,
            prediction.confidence_label.as_str()
        );
        println!(
            "Method: {} ({:.0}%)",
            prediction.method.method.label(),
            prediction.method.probability * 100.0
        );
        for factor in &prediction.key_factors {
            println!("  + {factor}");
        }
        for warning in &prediction.warnings {
            println!("  ! {warning}");
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    }
    Ok(())
}
