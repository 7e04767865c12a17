use std::collections::HashMap;

use anyhow::{Context, Result};

use fight_forecast::cli;
use fight_forecast::config;
use fight_forecast::fight_db::FightDb;
use fight_forecast::snapshot::SnapshotBuilder;
use fight_forecast::synthetic::{self, LeagueSpec};
use fight_forecast::{EngineConfig, logging};

fn main() -> Result<()> {
    logging::init();
    let engine_config = EngineConfig::from_env()?;
    let args = cli::args();
    let db_path = config::resolve_db_path(cli::db_path_arg(&args))
        .context("unable to resolve sqlite path")?;
    let mut db = FightDb::open(&db_path)?;

    if let Some(fights) = cli::usize_arg(&args, "--import-synthetic") {
        let league = synthetic::generate(&LeagueSpec {
            fights,
            seed: cli::usize_arg(&args, "--seed").unwrap_or(7) as u64,
            ..LeagueSpec::default()
        });
        let rows = db.import(&league.fighters, &league.fights)?;
        println!("Imported {rows} synthetic rows into {}", db_path.display());
    }

    let fighters: HashMap<_, _> = db
        .all_fighters()?
        .into_iter()
        .map(|f| (f.id, f))
        .collect();
    let fights = db.all_fights()?;

    let builder = SnapshotBuilder::new(engine_config.params.form_window);
    let (snapshots, summary) = builder.calculate_all(&fighters, &fights);
    let saved = db.save_snapshots(&snapshots)?;

    tracing::info!(
        fights = summary.fights_processed,
        saved,
        debuts = summary.debuts,
        missing = summary.missing_fighters,
        "snapshot backfill finished"
    );
    println!("DB: {}", db_path.display());
    println!("Completed fights processed: {}", summary.fights_processed);
    println!("Snapshots saved: {saved}");
    println!("Debuts (no prior fights): {}", summary.debuts);
    if summary.missing_fighters > 0 {
        println!("Missing fighter records: {}", summary.missing_fighters);
    }
    Ok(())
}
