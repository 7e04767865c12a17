use anyhow::{Context, Result};

use fight_forecast::backtest::{self, BacktestOptions, BacktestReport};
use fight_forecast::cli;
use fight_forecast::config;
use fight_forecast::fight_db::FightDb;
use fight_forecast::synthetic::{self, LeagueSpec};
use fight_forecast::{EngineConfig, MemoryStore, PredictionEngine, logging};

fn main() -> Result<()> {
    logging::init();
    let engine_config = EngineConfig::from_env()?;
    let args = cli::args();

    let store = match cli::usize_arg(&args, "--synthetic") {
        Some(fights) => {
            let spec = LeagueSpec {
                fights,
                seed: cli::usize_arg(&args, "--seed").unwrap_or(7) as u64,
                ..LeagueSpec::default()
            };
            tracing::info!(fights, seed = spec.seed, "generating synthetic league");
            synthetic::generate(&spec).into_store()
        }
        None => load_db_store(&args)?,
    };

    let opts = BacktestOptions {
        limit: cli::usize_arg(&args, "--limit"),
        bins: cli::usize_arg(&args, "--bins").unwrap_or(backtest::DEFAULT_BINS),
    };
    let engine = PredictionEngine::new(store, engine_config)?;
    let report = backtest::run_all(&engine, &opts)?;

    if cli::has_flag(&args, "--json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, cli::has_flag(&args, "--verbose"));
    }
    Ok(())
}

fn load_db_store(args: &[String]) -> Result<MemoryStore> {
    let db_path = config::resolve_db_path(cli::db_path_arg(args))
        .context("unable to resolve sqlite path")?;
    let db = FightDb::open(&db_path)?;
    let store = db.load_memory_store()?;
    tracing::info!(
        path = %db_path.display(),
        fights = store.fight_count(),
        snapshots = store.snapshot_count(),
        "loaded fight database"
    );
    Ok(store)
}

fn print_report(report: &BacktestReport, verbose: bool) {
    if verbose {
        for r in &report.records {
            println!(
                "fight {:>6}  p(A)={:.3}  conf={:.2} {:<6}  picked {:>6}  actual {:>6}  {}",
                r.fight_id,
                r.probability_a,
                r.confidence,
                r.confidence_label.as_str(),
                r.predicted_winner,
                r.actual_winner,
                if r.correct { "ok" } else { "miss" }
            );
        }
        println!();
    }

    println!("Evaluated: {} (skipped {})", report.evaluated, report.skipped);
    println!("Accuracy:  {:.1}%", report.metrics.accuracy * 100.0);
    println!("Brier:     {:.4}", report.metrics.brier);
    println!("Log loss:  {:.4}", report.metrics.log_loss);
    println!("ECE:       {:.4}", report.ece);

    println!();
    println!("By confidence:");
    for (label, group) in &report.by_confidence {
        println!(
            "  {:<6} {:>5} fights  {:.1}%",
            label.as_str(),
            group.total,
            group.accuracy() * 100.0
        );
    }
    println!("By method:");
    for (method, group) in &report.by_method {
        println!(
            "  {:<10} {:>5} fights  {:.1}%",
            method,
            group.total,
            group.accuracy() * 100.0
        );
    }
    println!("Calibration:");
    for bin in report.bins.iter().filter(|b| b.count > 0) {
        println!(
            "  [{:.1}, {:.1})  n={:<5} pred={:.3}  actual={:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }
}
