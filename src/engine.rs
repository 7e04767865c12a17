//! The prediction pipeline: load, snapshot, extract, predict, score, assemble.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::EngineConfig;
use crate::confidence::{ConfidenceFactors, ConfidenceLabel, ConfidenceScorer};
use crate::error::{PredictionError, Result};
use crate::features::{FeatureExtractor, FeatureSource, FighterFeatures};
use crate::model::{Fight, FightId, Fighter, FighterId, Side};
use crate::predictor::{AdvantageBreakdown, MethodCall, RuleBasedPredictor};
use crate::snapshot::{FighterSnapshot, SnapshotBuilder};
use crate::store::FightDataSource;

const MAX_KEY_FACTORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FighterRef {
    pub id: FighterId,
    pub name: String,
}

/// How much history the prediction stands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionBasis {
    /// Point-in-time snapshots for both fighters.
    Full,
    /// At least one side fell back to career totals or had no history.
    PartialHistory,
    /// Neither fighter has any history; fixed coin flip at the confidence floor.
    DebutFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub fight_id: Option<FightId>,
    pub as_of: NaiveDate,
    pub fighter_a: FighterRef,
    pub fighter_b: FighterRef,
    pub winner_id: FighterId,
    pub winner_side: Side,
    pub winner_name: String,
    pub probability_a: f64,
    pub probability_b: f64,
    pub win_probability: f64,
    pub combined_advantage: f64,
    pub confidence: f64,
    pub confidence_label: ConfidenceLabel,
    pub confidence_factors: ConfidenceFactors,
    pub breakdown: AdvantageBreakdown,
    pub method: MethodCall,
    pub key_factors: Vec<String>,
    pub warnings: Vec<String>,
    pub basis: PredictionBasis,
}

impl Prediction {
    pub fn probability_for(&self, fighter: FighterId) -> Option<f64> {
        if fighter == self.fighter_a.id {
            Some(self.probability_a)
        } else if fighter == self.fighter_b.id {
            Some(self.probability_b)
        } else {
            None
        }
    }
}

pub struct PredictionEngine<S> {
    source: S,
    extractor: FeatureExtractor,
    snapshots: SnapshotBuilder,
    predictor: RuleBasedPredictor,
    scorer: ConfidenceScorer,
}

impl<S: FightDataSource> PredictionEngine<S> {
    pub fn new(source: S, config: EngineConfig) -> Result<Self> {
        config.params.validate()?;
        Ok(Self {
            source,
            extractor: FeatureExtractor,
            snapshots: SnapshotBuilder::new(config.params.form_window),
            predictor: RuleBasedPredictor::new(config.weights, config.params.logistic_slope),
            scorer: ConfidenceScorer::new(config.params.confidence_floor),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Predicts a stored fight from data strictly before its date.
    #[instrument(level = "debug", skip(self))]
    pub fn predict_fight(&self, fight_id: FightId) -> Result<Prediction> {
        let fight = self
            .source
            .fight(fight_id)?
            .ok_or_else(|| PredictionError::fight_not_found(fight_id))?;
        self.predict_loaded(&fight)
    }

    /// Predicts a bout that is not in the store, as of `as_of`.
    #[instrument(level = "debug", skip(self))]
    pub fn predict_matchup(
        &self,
        fighter_a: FighterId,
        fighter_b: FighterId,
        as_of: NaiveDate,
    ) -> Result<Prediction> {
        if fighter_a == fighter_b {
            return Err(PredictionError::insufficient_data(format!(
                "fighter {fighter_a} cannot fight themselves"
            )));
        }
        let a = self.load_fighter(fighter_a)?;
        let b = self.load_fighter(fighter_b)?;
        let snap_a = self.side_snapshot(&a, None, as_of)?;
        let snap_b = self.side_snapshot(&b, None, as_of)?;
        Ok(self.assemble(None, &a, &b, snap_a.as_ref(), snap_b.as_ref(), as_of))
    }

    /// Predictions for the next `limit` scheduled fights. Fights that reference missing
    /// fighters or contradictory data are logged and skipped.
    pub fn predict_upcoming(&self, limit: usize) -> Result<Vec<Prediction>> {
        let fights = self.source.upcoming_fights(limit)?;
        let mut out = Vec::with_capacity(fights.len());
        for fight in &fights {
            match self.predict_loaded(fight) {
                Ok(p) => out.push(p),
                Err(err) if err.is_skippable() => {
                    warn!(fight_id = fight.id, error = %err, "skipping upcoming fight");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    pub fn predict_loaded(&self, fight: &Fight) -> Result<Prediction> {
        if fight.fighter_a == fight.fighter_b {
            return Err(PredictionError::insufficient_data(format!(
                "fight {} lists fighter {} on both sides",
                fight.id, fight.fighter_a
            )));
        }
        let a = self.load_fighter(fight.fighter_a)?;
        let b = self.load_fighter(fight.fighter_b)?;
        let snap_a = self.side_snapshot(&a, Some(fight.id), fight.date)?;
        let snap_b = self.side_snapshot(&b, Some(fight.id), fight.date)?;
        Ok(self.assemble(
            Some(fight.id),
            &a,
            &b,
            snap_a.as_ref(),
            snap_b.as_ref(),
            fight.date,
        ))
    }

    fn load_fighter(&self, id: FighterId) -> Result<Fighter> {
        self.source
            .fighter(id)?
            .ok_or_else(|| PredictionError::fighter_not_found(id))
    }

    /// Stored snapshot for (fighter, fight) if one exists and is sound, otherwise one built
    /// from history with `as_of` as the cutoff. `None` means no prior fights.
    fn side_snapshot(
        &self,
        fighter: &Fighter,
        fight_id: Option<FightId>,
        as_of: NaiveDate,
    ) -> Result<Option<FighterSnapshot>> {
        if let Some(fid) = fight_id
            && let Some(stored) = self.source.snapshot(fighter.id, fid)?
        {
            stored.validate()?;
            if stored.as_of > as_of {
                return Err(PredictionError::insufficient_data(format!(
                    "stored snapshot for fighter {} postdates fight {fid}",
                    fighter.id
                )));
            }
            // A sound but empty snapshot carries nothing; history decides.
            if stored.fights_counted > 0 {
                debug!(fighter_id = fighter.id, fight_id = fid, "using stored snapshot");
                return Ok(Some(stored));
            }
        }

        let history = self.source.fighter_history(fighter.id)?;
        let built = self.snapshots.build(fighter, &history, as_of);
        Ok(match (built, fight_id) {
            (Some(snap), Some(fid)) => Some(snap.with_fight(fid)),
            (built, _) => built,
        })
    }

    /// Pure assembly from already loaded inputs.
    pub fn assemble(
        &self,
        fight_id: Option<FightId>,
        a: &Fighter,
        b: &Fighter,
        snap_a: Option<&FighterSnapshot>,
        snap_b: Option<&FighterSnapshot>,
        as_of: NaiveDate,
    ) -> Prediction {
        let fa = self.extractor.extract(a, snap_a, as_of);
        let fb = self.extractor.extract(b, snap_b, as_of);
        let factors = ConfidenceFactors::from_features(&fa, &fb);

        if is_debut(&fa) && is_debut(&fb) {
            debug!(?fight_id, "both fighters debut, returning coin flip");
            return self.debut_fallback(fight_id, &fa, &fb, factors, as_of);
        }

        let verdict = self.predictor.predict(&fa, &fb);
        let confidence = self.scorer.score_factors(&factors);
        let basis = if snap_a.is_some() && snap_b.is_some() {
            PredictionBasis::Full
        } else {
            PredictionBasis::PartialHistory
        };

        let mut warnings = verdict.warnings;
        for f in [&fa, &fb] {
            if f.meta.source == FeatureSource::RawRecord && f.meta.has_history() {
                warnings.push(format!(
                    "{} has no point-in-time snapshot; using career totals",
                    f.fighter_name
                ));
            }
        }
        let mut key_factors = verdict.factors;
        key_factors.truncate(MAX_KEY_FACTORS);

        let (winner_id, winner_name) = match verdict.winner {
            Side::A => (a.id, a.name.clone()),
            Side::B => (b.id, b.name.clone()),
        };
        let win_probability = match verdict.winner {
            Side::A => verdict.probability_a,
            Side::B => verdict.probability_b,
        };

        debug!(
            ?fight_id,
            probability_a = verdict.probability_a,
            confidence,
            "prediction assembled"
        );

        Prediction {
            fight_id,
            as_of,
            fighter_a: fighter_ref(a),
            fighter_b: fighter_ref(b),
            winner_id,
            winner_side: verdict.winner,
            winner_name,
            probability_a: verdict.probability_a,
            probability_b: verdict.probability_b,
            win_probability,
            combined_advantage: verdict.combined,
            confidence,
            confidence_label: ConfidenceLabel::from_score(confidence),
            confidence_factors: factors,
            breakdown: verdict.breakdown,
            method: verdict.method,
            key_factors,
            warnings,
            basis,
        }
    }

    fn debut_fallback(
        &self,
        fight_id: Option<FightId>,
        fa: &FighterFeatures,
        fb: &FighterFeatures,
        factors: ConfidenceFactors,
        as_of: NaiveDate,
    ) -> Prediction {
        let verdict = self.predictor.predict(fa, fb);
        let confidence = self.scorer.floor();
        let mut warnings = verdict.warnings;
        warnings.push("Neither fighter has prior fights; prediction is a coin flip".to_string());

        Prediction {
            fight_id,
            as_of,
            fighter_a: FighterRef {
                id: fa.fighter_id,
                name: fa.fighter_name.clone(),
            },
            fighter_b: FighterRef {
                id: fb.fighter_id,
                name: fb.fighter_name.clone(),
            },
            winner_id: fa.fighter_id,
            winner_side: Side::A,
            winner_name: fa.fighter_name.clone(),
            probability_a: 0.5,
            probability_b: 0.5,
            win_probability: 0.5,
            combined_advantage: 0.0,
            confidence,
            confidence_label: ConfidenceLabel::from_score(confidence),
            confidence_factors: factors,
            breakdown: AdvantageBreakdown::default(),
            method: verdict.method,
            key_factors: Vec::new(),
            warnings,
            basis: PredictionBasis::DebutFallback,
        }
    }
}

fn is_debut(features: &FighterFeatures) -> bool {
    !features.meta.has_history()
}

fn fighter_ref(f: &Fighter) -> FighterRef {
    FighterRef {
        id: f.id,
        name: f.name.clone(),
    }
}
