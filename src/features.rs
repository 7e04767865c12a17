//! Normalized, fighter-comparable feature vectors.
//!
//! Features come either from a point-in-time snapshot or, for fighters without one, from
//! the career totals on the fighter record. Both paths go through [`HasComparableStats`]
//! so the extractor never cares which one it was handed. Every value that had to be
//! filled with a neutral default is listed in [`ExtractionMeta::defaulted`].

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Fighter, FighterId};
use crate::snapshot::FighterSnapshot;

pub const MAX_FIGHTS_FOR_EXPERIENCE: f64 = 40.0;
pub const MAX_DAYS_FOR_ACTIVITY: f64 = 730.0;

const DEFAULT_WIN_RATE: f64 = 0.5;
const DEFAULT_STRIKING_ACCURACY: f64 = 0.45;
const DEFAULT_STRIKING_DEFENSE: f64 = 0.55;
const DEFAULT_STRIKES_PER_MIN: f64 = 3.0;
const DEFAULT_TAKEDOWN_ACCURACY: f64 = 0.35;
const DEFAULT_TAKEDOWN_DEFENSE: f64 = 0.60;
const DEFAULT_TAKEDOWNS_PER_15: f64 = 1.0;
const DEFAULT_SUBMISSIONS_PER_15: f64 = 0.5;
const DEFAULT_ACTIVITY: f64 = 0.5;

const MAX_STRIKES_PER_MIN: f64 = 20.0;
const MAX_GRAPPLING_PER_15: f64 = 15.0;

// Most recent result first.
const FORM_WEIGHTS: [f64; 5] = [0.35, 0.25, 0.20, 0.12, 0.08];
const FORM_WEIGHT_TAIL: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    WinRate,
    FinishRate,
    StrikingAccuracy,
    StrikingDefense,
    StrikesLandedPerMin,
    StrikesAbsorbedPerMin,
    TakedownAccuracy,
    TakedownDefense,
    TakedownsPer15,
    SubmissionsPer15,
    RecentForm,
    Activity,
    Height,
    Reach,
    Age,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 15] = [
        FeatureKind::WinRate,
        FeatureKind::FinishRate,
        FeatureKind::StrikingAccuracy,
        FeatureKind::StrikingDefense,
        FeatureKind::StrikesLandedPerMin,
        FeatureKind::StrikesAbsorbedPerMin,
        FeatureKind::TakedownAccuracy,
        FeatureKind::TakedownDefense,
        FeatureKind::TakedownsPer15,
        FeatureKind::SubmissionsPer15,
        FeatureKind::RecentForm,
        FeatureKind::Activity,
        FeatureKind::Height,
        FeatureKind::Reach,
        FeatureKind::Age,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureSource {
    Snapshot,
    RawRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMeta {
    pub source: FeatureSource,
    /// Fights that contributed to the numbers.
    pub sample_size: u32,
    pub days_since_last_fight: Option<i64>,
    pub defaulted: BTreeSet<FeatureKind>,
}

impl ExtractionMeta {
    pub fn defaulted_fraction(&self) -> f64 {
        self.defaulted.len() as f64 / FeatureKind::ALL.len() as f64
    }

    pub fn has_history(&self) -> bool {
        self.sample_size > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterFeatures {
    pub fighter_id: FighterId,
    pub fighter_name: String,

    pub win_rate: f64,
    pub finish_rate: f64,
    pub ko_rate: f64,
    pub submission_rate: f64,
    pub total_fights: u32,
    pub experience_score: f64,

    pub striking_accuracy: f64,
    pub striking_defense: f64,
    pub strikes_landed_per_min: f64,
    pub strikes_absorbed_per_min: f64,
    pub strike_differential: f64,

    pub takedown_accuracy: f64,
    pub takedown_defense: f64,
    pub takedowns_per_15: f64,
    pub submissions_per_15: f64,

    pub win_streak: u32,
    pub loss_streak: u32,
    pub recent_form_score: f64,
    pub activity_score: f64,

    pub height_cm: Option<f64>,
    pub reach_cm: Option<f64>,
    pub age_years: Option<f64>,

    pub meta: ExtractionMeta,
}

impl FighterFeatures {
    pub fn is_defaulted(&self, kind: FeatureKind) -> bool {
        self.meta.defaulted.contains(&kind)
    }
}

/// The comparable statistics a fighter exposes, regardless of where they came from.
/// `None` means the value is unknown, never zero.
pub trait HasComparableStats {
    fn record(&self) -> (u32, u32, u32);
    fn sample_size(&self) -> u32;
    fn finish_rate(&self) -> Option<f64>;
    fn ko_rate(&self) -> Option<f64>;
    fn submission_rate(&self) -> Option<f64>;
    fn striking_accuracy(&self) -> Option<f64>;
    fn striking_defense(&self) -> Option<f64>;
    fn strikes_landed_per_min(&self) -> Option<f64>;
    fn strikes_absorbed_per_min(&self) -> Option<f64>;
    fn takedown_accuracy(&self) -> Option<f64>;
    fn takedown_defense(&self) -> Option<f64>;
    fn takedowns_per_15(&self) -> Option<f64>;
    fn submissions_per_15(&self) -> Option<f64>;
    fn streaks(&self) -> (u32, u32);
    fn recent_form(&self) -> Option<&str>;
    fn days_since_last_fight(&self, as_of: NaiveDate) -> Option<i64>;
    fn height_cm(&self) -> Option<f64>;
    fn reach_cm(&self) -> Option<f64>;
    fn age_years(&self, as_of: NaiveDate) -> Option<f64>;
}

impl HasComparableStats for FighterSnapshot {
    fn record(&self) -> (u32, u32, u32) {
        (self.wins, self.losses, self.draws)
    }

    fn sample_size(&self) -> u32 {
        self.fights_counted
    }

    fn finish_rate(&self) -> Option<f64> {
        self.finish_rate
    }

    fn ko_rate(&self) -> Option<f64> {
        self.ko_rate
    }

    fn submission_rate(&self) -> Option<f64> {
        self.submission_rate
    }

    fn striking_accuracy(&self) -> Option<f64> {
        self.striking.and_then(|s| s.accuracy)
    }

    fn striking_defense(&self) -> Option<f64> {
        self.striking.and_then(|s| s.defense)
    }

    fn strikes_landed_per_min(&self) -> Option<f64> {
        self.striking.map(|s| s.landed_per_min)
    }

    fn strikes_absorbed_per_min(&self) -> Option<f64> {
        self.striking.map(|s| s.absorbed_per_min)
    }

    fn takedown_accuracy(&self) -> Option<f64> {
        self.grappling.and_then(|g| g.takedown_accuracy)
    }

    fn takedown_defense(&self) -> Option<f64> {
        self.grappling.and_then(|g| g.takedown_defense)
    }

    fn takedowns_per_15(&self) -> Option<f64> {
        self.grappling.map(|g| g.takedowns_per_15)
    }

    fn submissions_per_15(&self) -> Option<f64> {
        self.grappling.map(|g| g.submissions_per_15)
    }

    fn streaks(&self) -> (u32, u32) {
        (self.win_streak, self.loss_streak)
    }

    fn recent_form(&self) -> Option<&str> {
        Some(self.recent_form.as_str()).filter(|s| !s.is_empty())
    }

    fn days_since_last_fight(&self, _as_of: NaiveDate) -> Option<i64> {
        // Measured against the snapshot's own cutoff, which is the fight date.
        self.days_since_last_fight
    }

    fn height_cm(&self) -> Option<f64> {
        self.height_cm
    }

    fn reach_cm(&self) -> Option<f64> {
        self.reach_cm
    }

    fn age_years(&self, _as_of: NaiveDate) -> Option<f64> {
        self.age_years.map(f64::from)
    }
}

impl HasComparableStats for Fighter {
    fn record(&self) -> (u32, u32, u32) {
        (self.career.wins, self.career.losses, self.career.draws)
    }

    fn sample_size(&self) -> u32 {
        self.career.total_fights()
    }

    fn finish_rate(&self) -> Option<f64> {
        None
    }

    fn ko_rate(&self) -> Option<f64> {
        None
    }

    fn submission_rate(&self) -> Option<f64> {
        None
    }

    fn striking_accuracy(&self) -> Option<f64> {
        self.career.striking_accuracy
    }

    fn striking_defense(&self) -> Option<f64> {
        self.career.striking_defense
    }

    fn strikes_landed_per_min(&self) -> Option<f64> {
        self.career.strikes_landed_per_min
    }

    fn strikes_absorbed_per_min(&self) -> Option<f64> {
        self.career.strikes_absorbed_per_min
    }

    fn takedown_accuracy(&self) -> Option<f64> {
        self.career.takedown_accuracy
    }

    fn takedown_defense(&self) -> Option<f64> {
        self.career.takedown_defense
    }

    fn takedowns_per_15(&self) -> Option<f64> {
        self.career.takedowns_per_15
    }

    fn submissions_per_15(&self) -> Option<f64> {
        self.career.submissions_per_15
    }

    fn streaks(&self) -> (u32, u32) {
        (0, 0)
    }

    fn recent_form(&self) -> Option<&str> {
        None
    }

    fn days_since_last_fight(&self, as_of: NaiveDate) -> Option<i64> {
        self.career
            .last_fight_date
            .filter(|d| *d < as_of)
            .map(|d| (as_of - d).num_days())
    }

    fn height_cm(&self) -> Option<f64> {
        self.height_cm
    }

    fn reach_cm(&self) -> Option<f64> {
        self.reach_cm
    }

    fn age_years(&self, as_of: NaiveDate) -> Option<f64> {
        self.age_on(as_of).map(f64::from)
    }
}

/// Where a fighter's numbers come from for one prediction.
#[derive(Debug, Clone, Copy)]
pub enum StatSource<'a> {
    Snapshot(&'a FighterSnapshot),
    RawRecordFallback(&'a Fighter),
}

impl<'a> StatSource<'a> {
    pub fn select(fighter: &'a Fighter, snapshot: Option<&'a FighterSnapshot>) -> Self {
        match snapshot {
            Some(snap) => StatSource::Snapshot(snap),
            None => StatSource::RawRecordFallback(fighter),
        }
    }

    pub fn kind(&self) -> FeatureSource {
        match self {
            StatSource::Snapshot(_) => FeatureSource::Snapshot,
            StatSource::RawRecordFallback(_) => FeatureSource::RawRecord,
        }
    }

    fn stats(&self) -> &dyn HasComparableStats {
        match self {
            StatSource::Snapshot(s) => *s as &dyn HasComparableStats,
            StatSource::RawRecordFallback(f) => *f as &dyn HasComparableStats,
        }
    }
}

impl HasComparableStats for StatSource<'_> {
    fn record(&self) -> (u32, u32, u32) {
        self.stats().record()
    }

    fn sample_size(&self) -> u32 {
        self.stats().sample_size()
    }

    fn finish_rate(&self) -> Option<f64> {
        self.stats().finish_rate()
    }

    fn ko_rate(&self) -> Option<f64> {
        self.stats().ko_rate()
    }

    fn submission_rate(&self) -> Option<f64> {
        self.stats().submission_rate()
    }

    fn striking_accuracy(&self) -> Option<f64> {
        self.stats().striking_accuracy()
    }

    fn striking_defense(&self) -> Option<f64> {
        self.stats().striking_defense()
    }

    fn strikes_landed_per_min(&self) -> Option<f64> {
        self.stats().strikes_landed_per_min()
    }

    fn strikes_absorbed_per_min(&self) -> Option<f64> {
        self.stats().strikes_absorbed_per_min()
    }

    fn takedown_accuracy(&self) -> Option<f64> {
        self.stats().takedown_accuracy()
    }

    fn takedown_defense(&self) -> Option<f64> {
        self.stats().takedown_defense()
    }

    fn takedowns_per_15(&self) -> Option<f64> {
        self.stats().takedowns_per_15()
    }

    fn submissions_per_15(&self) -> Option<f64> {
        self.stats().submissions_per_15()
    }

    fn streaks(&self) -> (u32, u32) {
        self.stats().streaks()
    }

    fn recent_form(&self) -> Option<&str> {
        self.stats().recent_form()
    }

    fn days_since_last_fight(&self, as_of: NaiveDate) -> Option<i64> {
        self.stats().days_since_last_fight(as_of)
    }

    fn height_cm(&self) -> Option<f64> {
        self.stats().height_cm()
    }

    fn reach_cm(&self) -> Option<f64> {
        self.stats().reach_cm()
    }

    fn age_years(&self, as_of: NaiveDate) -> Option<f64> {
        self.stats().age_years(as_of)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Features for `fighter` as of `as_of`, preferring `snapshot` when present.
    pub fn extract(
        &self,
        fighter: &Fighter,
        snapshot: Option<&FighterSnapshot>,
        as_of: NaiveDate,
    ) -> FighterFeatures {
        let source = StatSource::select(fighter, snapshot);
        self.extract_from(fighter, &source, as_of)
    }

    pub fn extract_from(
        &self,
        fighter: &Fighter,
        source: &StatSource<'_>,
        as_of: NaiveDate,
    ) -> FighterFeatures {
        let mut defaulted = BTreeSet::new();
        let mut take = |kind: FeatureKind, value: Option<f64>, default: f64, max: f64| {
            match value.filter(|v| v.is_finite()) {
                Some(v) => v.clamp(0.0, max),
                None => {
                    defaulted.insert(kind);
                    default
                }
            }
        };

        let (wins, losses, draws) = source.record();
        let total_fights = wins.saturating_add(losses).saturating_add(draws);
        let decided = u64::from(wins) + u64::from(losses);
        let win_rate = if decided > 0 {
            f64::from(wins) / decided as f64
        } else {
            take(FeatureKind::WinRate, None, DEFAULT_WIN_RATE, 1.0)
        };

        let finish_rate = take(FeatureKind::FinishRate, source.finish_rate(), 0.0, 1.0);
        let ko_rate = source.ko_rate().filter(|v| v.is_finite()).unwrap_or(0.0).clamp(0.0, 1.0);
        let submission_rate = source
            .submission_rate()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);

        let striking_accuracy = take(
            FeatureKind::StrikingAccuracy,
            source.striking_accuracy(),
            DEFAULT_STRIKING_ACCURACY,
            1.0,
        );
        let striking_defense = take(
            FeatureKind::StrikingDefense,
            source.striking_defense(),
            DEFAULT_STRIKING_DEFENSE,
            1.0,
        );
        let strikes_landed_per_min = take(
            FeatureKind::StrikesLandedPerMin,
            source.strikes_landed_per_min(),
            DEFAULT_STRIKES_PER_MIN,
            MAX_STRIKES_PER_MIN,
        );
        let strikes_absorbed_per_min = take(
            FeatureKind::StrikesAbsorbedPerMin,
            source.strikes_absorbed_per_min(),
            DEFAULT_STRIKES_PER_MIN,
            MAX_STRIKES_PER_MIN,
        );

        let takedown_accuracy = take(
            FeatureKind::TakedownAccuracy,
            source.takedown_accuracy(),
            DEFAULT_TAKEDOWN_ACCURACY,
            1.0,
        );
        let takedown_defense = take(
            FeatureKind::TakedownDefense,
            source.takedown_defense(),
            DEFAULT_TAKEDOWN_DEFENSE,
            1.0,
        );
        let takedowns_per_15 = take(
            FeatureKind::TakedownsPer15,
            source.takedowns_per_15(),
            DEFAULT_TAKEDOWNS_PER_15,
            MAX_GRAPPLING_PER_15,
        );
        let submissions_per_15 = take(
            FeatureKind::SubmissionsPer15,
            source.submissions_per_15(),
            DEFAULT_SUBMISSIONS_PER_15,
            MAX_GRAPPLING_PER_15,
        );

        let recent_form_score = match source.recent_form() {
            Some(form) => form_score(form),
            None => {
                defaulted.insert(FeatureKind::RecentForm);
                0.0
            }
        };

        let days_since_last_fight = source.days_since_last_fight(as_of);
        let activity_score = match days_since_last_fight {
            Some(days) => (1.0 - days as f64 / MAX_DAYS_FOR_ACTIVITY).max(0.0),
            None => {
                defaulted.insert(FeatureKind::Activity);
                DEFAULT_ACTIVITY
            }
        };

        let height_cm = source.height_cm().filter(|v| v.is_finite() && *v > 0.0);
        let reach_cm = source.reach_cm().filter(|v| v.is_finite() && *v > 0.0);
        let age_years = source.age_years(as_of);
        for (kind, present) in [
            (FeatureKind::Height, height_cm.is_some()),
            (FeatureKind::Reach, reach_cm.is_some()),
            (FeatureKind::Age, age_years.is_some()),
        ] {
            if !present {
                defaulted.insert(kind);
            }
        }

        let (win_streak, loss_streak) = source.streaks();

        FighterFeatures {
            fighter_id: fighter.id,
            fighter_name: fighter.name.clone(),
            win_rate,
            finish_rate,
            ko_rate,
            submission_rate,
            total_fights,
            experience_score: (f64::from(total_fights) / MAX_FIGHTS_FOR_EXPERIENCE).min(1.0),
            striking_accuracy,
            striking_defense,
            strikes_landed_per_min,
            strikes_absorbed_per_min,
            strike_differential: strikes_landed_per_min - strikes_absorbed_per_min,
            takedown_accuracy,
            takedown_defense,
            takedowns_per_15,
            submissions_per_15,
            win_streak,
            loss_streak,
            recent_form_score,
            activity_score,
            height_cm,
            reach_cm,
            age_years,
            meta: ExtractionMeta {
                source: source.kind(),
                sample_size: source.sample_size(),
                days_since_last_fight,
                defaulted,
            },
        }
    }
}

/// Recency-weighted form in [-1, 1] from an oldest-to-newest `W`/`L`/`D` string.
pub fn form_score(form: &str) -> f64 {
    let score: f64 = form
        .chars()
        .rev()
        .enumerate()
        .map(|(i, c)| {
            let w = FORM_WEIGHTS.get(i).copied().unwrap_or(FORM_WEIGHT_TAIL);
            match c.to_ascii_uppercase() {
                'W' => w,
                'L' => -w,
                _ => 0.0,
            }
        })
        .sum();
    score.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FightRecord, Outcome};
    use crate::snapshot::build_snapshot;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn form_score_weights_recent_results_most() {
        assert!(form_score("WWWWW") > 0.8);
        assert!(form_score("LLLLL") < -0.8);
        let mixed = form_score("WLWLW");
        assert!(-0.5 < mixed && mixed < 0.5);
        assert!(form_score("LW") > form_score("WL"));
        assert_eq!(form_score(""), 0.0);
    }

    #[test]
    fn raw_record_fallback_marks_missing_stats() {
        let mut fighter = Fighter::new(7, "Debut");
        fighter.height_cm = Some(175.0);
        let feats = FeatureExtractor.extract(&fighter, None, d(2024, 1, 1));

        assert_eq!(feats.meta.source, FeatureSource::RawRecord);
        assert_eq!(feats.meta.sample_size, 0);
        assert_eq!(feats.win_rate, 0.5);
        assert!(feats.is_defaulted(FeatureKind::WinRate));
        assert!(feats.is_defaulted(FeatureKind::StrikingAccuracy));
        assert!(feats.is_defaulted(FeatureKind::Reach));
        assert!(!feats.is_defaulted(FeatureKind::Height));
        assert_eq!(feats.striking_accuracy, 0.45);
        assert!(feats.reach_cm.is_none());
    }

    #[test]
    fn snapshot_is_preferred_over_career_totals() {
        let mut fighter = Fighter::new(3, "Vet");
        fighter.career.wins = 20;
        let history = [FightRecord {
            fight_id: 1,
            date: d(2023, 1, 1),
            opponent: 9,
            outcome: Outcome::Loss,
            method: None,
            is_title_fight: false,
            weight_class: None,
            fight_seconds: None,
            own_stats: None,
            opponent_stats: None,
        }];
        let snap = build_snapshot(&fighter, &history, d(2024, 1, 1)).unwrap();
        let feats = FeatureExtractor.extract(&fighter, Some(&snap), d(2024, 1, 1));
        assert_eq!(feats.meta.source, FeatureSource::Snapshot);
        assert_eq!(feats.win_rate, 0.0);
        assert_eq!(feats.total_fights, 1);
        assert_eq!(feats.loss_streak, 1);
        assert_eq!(feats.meta.days_since_last_fight, Some(365));
        assert!(!feats.is_defaulted(FeatureKind::Activity));
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let mut fighter = Fighter::new(4, "Odd");
        fighter.career.wins = 1;
        fighter.career.striking_accuracy = Some(1.7);
        fighter.career.strikes_landed_per_min = Some(-2.0);
        let feats = FeatureExtractor.extract(&fighter, None, d(2024, 1, 1));
        assert_eq!(feats.striking_accuracy, 1.0);
        assert_eq!(feats.strikes_landed_per_min, 0.0);
        assert!(!feats.is_defaulted(FeatureKind::StrikingAccuracy));
    }

    #[test]
    fn huge_career_totals_saturate() {
        let mut fighter = Fighter::new(6, "Corrupt Row");
        fighter.career.wins = u32::MAX;
        fighter.career.losses = u32::MAX;
        fighter.career.draws = 3;
        let feats = FeatureExtractor.extract(&fighter, None, d(2024, 1, 1));
        assert_eq!(feats.total_fights, u32::MAX);
        assert_eq!(feats.meta.sample_size, u32::MAX);
        assert!((feats.win_rate - 0.5).abs() < 1e-9);
        assert_eq!(feats.experience_score, 1.0);
    }

    #[test]
    fn extraction_is_deterministic() {
        let mut fighter = Fighter::new(5, "Same");
        fighter.career.wins = 3;
        fighter.career.losses = 1;
        let a = FeatureExtractor.extract(&fighter, None, d(2024, 1, 1));
        let b = FeatureExtractor.extract(&fighter, None, d(2024, 1, 1));
        assert_eq!(a, b);
    }
}
