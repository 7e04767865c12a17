//! Walk-forward replay of decided fights, each predicted from pre-fight data only.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::calibration::{self, CalibrationBin, Metrics};
use crate::confidence::ConfidenceLabel;
use crate::engine::PredictionEngine;
use crate::error::Result;
use crate::model::{Fight, FightId, FighterId, ResultMethod};
use crate::store::FightDataSource;

pub const DEFAULT_BINS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct BacktestOptions {
    /// Only the most recent `limit` decided fights.
    pub limit: Option<usize>,
    pub bins: usize,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            limit: None,
            bins: DEFAULT_BINS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRecord {
    pub fight_id: FightId,
    pub predicted_winner: FighterId,
    pub actual_winner: FighterId,
    pub probability_a: f64,
    pub a_won: bool,
    pub confidence: f64,
    pub confidence_label: ConfidenceLabel,
    pub method: Option<ResultMethod>,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GroupAccuracy {
    pub total: usize,
    pub correct: usize,
}

impl GroupAccuracy {
    fn add(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub evaluated: usize,
    pub skipped: usize,
    pub metrics: Metrics,
    pub by_confidence: BTreeMap<ConfidenceLabel, GroupAccuracy>,
    pub by_method: BTreeMap<&'static str, GroupAccuracy>,
    pub bins: Vec<CalibrationBin>,
    pub ece: f64,
    pub records: Vec<BacktestRecord>,
}

/// Replays every completed fight in the engine's own store.
pub fn run_all<S>(engine: &PredictionEngine<S>, opts: &BacktestOptions) -> Result<BacktestReport>
where
    S: FightDataSource + Sync,
{
    let fights = engine.source().completed_fights()?;
    run(engine, &fights, opts)
}

/// Predicts each decided fight in `fights` in parallel. Fights whose data is missing or
/// contradictory are counted as skipped; store failures abort the run.
pub fn run<S>(
    engine: &PredictionEngine<S>,
    fights: &[Fight],
    opts: &BacktestOptions,
) -> Result<BacktestReport>
where
    S: FightDataSource + Sync,
{
    let mut decided: Vec<&Fight> = fights.iter().filter(|f| f.is_decided()).collect();
    decided.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
    if let Some(limit) = opts.limit
        && decided.len() > limit
    {
        decided = decided.split_off(decided.len() - limit);
    }

    let outcomes: Vec<Result<Option<BacktestRecord>>> = decided
        .par_iter()
        .map(|fight| replay_one(engine, fight))
        .collect();

    let mut records = Vec::with_capacity(outcomes.len());
    let mut skipped = 0usize;
    for outcome in outcomes {
        match outcome? {
            Some(rec) => records.push(rec),
            None => skipped += 1,
        }
    }

    let report = summarize(records, skipped, opts.bins);
    info!(
        evaluated = report.evaluated,
        skipped = report.skipped,
        accuracy = report.metrics.accuracy,
        brier = report.metrics.brier,
        log_loss = report.metrics.log_loss,
        ece = report.ece,
        "backtest finished"
    );
    Ok(report)
}

fn replay_one<S>(engine: &PredictionEngine<S>, fight: &Fight) -> Result<Option<BacktestRecord>>
where
    S: FightDataSource + Sync,
{
    let Some(actual_winner) = fight.winner else {
        return Ok(None);
    };
    let prediction = match engine.predict_loaded(fight) {
        Ok(p) => p,
        Err(err) if err.is_skippable() => {
            warn!(fight_id = fight.id, error = %err, "skipping fight in backtest");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };
    Ok(Some(BacktestRecord {
        fight_id: fight.id,
        predicted_winner: prediction.winner_id,
        actual_winner,
        probability_a: prediction.probability_a,
        a_won: actual_winner == fight.fighter_a,
        confidence: prediction.confidence,
        confidence_label: prediction.confidence_label,
        method: fight.method,
        correct: prediction.winner_id == actual_winner,
    }))
}

pub fn summarize(records: Vec<BacktestRecord>, skipped: usize, bins: usize) -> BacktestReport {
    let probs: Vec<f64> = records.iter().map(|r| r.probability_a).collect();
    let outcomes: Vec<bool> = records.iter().map(|r| r.a_won).collect();
    let metrics = calibration::evaluate_probs(&probs, &outcomes);
    let bins = calibration::calibration_bins(&probs, &outcomes, bins);
    let ece = calibration::expected_calibration_error(&bins);

    let mut by_confidence: BTreeMap<ConfidenceLabel, GroupAccuracy> = BTreeMap::new();
    let mut by_method: BTreeMap<&'static str, GroupAccuracy> = BTreeMap::new();
    for r in &records {
        by_confidence
            .entry(r.confidence_label)
            .or_default()
            .add(r.correct);
        let method = r.method.map(ResultMethod::label).unwrap_or("Unknown");
        by_method.entry(method).or_default().add(r.correct);
    }

    BacktestReport {
        evaluated: records.len(),
        skipped,
        metrics,
        by_confidence,
        by_method,
        bins,
        ece,
        records,
    }
}
