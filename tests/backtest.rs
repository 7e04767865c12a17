use fight_forecast::backtest::{self, BacktestOptions};
use fight_forecast::confidence::ConfidenceLabel;
use fight_forecast::synthetic::{self, LeagueSpec};
use fight_forecast::{EngineConfig, PredictionEngine};

fn synthetic_engine(fights: usize, seed: u64) -> PredictionEngine<fight_forecast::MemoryStore> {
    let store = synthetic::generate(&LeagueSpec {
        fighters: 30,
        fights,
        upcoming: 5,
        seed,
        ..LeagueSpec::default()
    })
    .into_store();
    PredictionEngine::new(store, EngineConfig::default()).unwrap()
}

#[test]
fn synthetic_league_beats_a_coin_flip() {
    let engine = synthetic_engine(600, 17);
    let report = backtest::run_all(&engine, &BacktestOptions::default()).unwrap();

    assert!(report.evaluated > 500);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.records.len(), report.evaluated);
    assert!(report.metrics.accuracy > 0.55, "accuracy {}", report.metrics.accuracy);
    assert!(report.metrics.brier < 0.25, "brier {}", report.metrics.brier);
    assert!((0.0..=1.0).contains(&report.ece));

    let by_conf: usize = report.by_confidence.values().map(|g| g.total).sum();
    let by_method: usize = report.by_method.values().map(|g| g.total).sum();
    assert_eq!(by_conf, report.evaluated);
    assert_eq!(by_method, report.evaluated);
    assert!(report.by_confidence.contains_key(&ConfidenceLabel::High));

    let binned: usize = report.bins.iter().map(|b| b.count).sum();
    assert_eq!(binned, report.evaluated);
}

#[test]
fn limit_keeps_the_most_recent_fights() {
    let engine = synthetic_engine(200, 5);
    let all = backtest::run_all(&engine, &BacktestOptions::default()).unwrap();
    let opts = BacktestOptions {
        limit: Some(40),
        ..BacktestOptions::default()
    };
    let recent = backtest::run_all(&engine, &opts).unwrap();

    assert_eq!(recent.evaluated, 40);
    let tail: Vec<_> = all.records[all.records.len() - 40..]
        .iter()
        .map(|r| r.fight_id)
        .collect();
    let ids: Vec<_> = recent.records.iter().map(|r| r.fight_id).collect();
    assert_eq!(ids, tail);
}

#[test]
fn replay_is_deterministic_across_runs() {
    let engine = synthetic_engine(150, 23);
    let first = backtest::run_all(&engine, &BacktestOptions::default()).unwrap();
    let second = backtest::run_all(&engine, &BacktestOptions::default()).unwrap();
    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.records, second.records);
}
