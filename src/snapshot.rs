//! Point-in-time fighter statistics.
//!
//! A snapshot summarizes everything known about a fighter strictly before a cutoff date.
//! Fights on the cutoff date itself are excluded so that a same-card bout can never leak
//! into the prediction for the fight being scored.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PredictionError, Result};
use crate::model::{Fight, FightId, FightRecord, FightStatus, Fighter, FighterId, Outcome, ResultMethod};

pub const DEFAULT_FORM_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikingAggregate {
    pub accuracy: Option<f64>,
    pub defense: Option<f64>,
    pub landed_per_min: f64,
    pub absorbed_per_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrapplingAggregate {
    pub takedown_accuracy: Option<f64>,
    pub takedown_defense: Option<f64>,
    pub takedowns_per_15: f64,
    pub submissions_per_15: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterSnapshot {
    pub fighter_id: FighterId,
    #[serde(default)]
    pub fight_id: Option<FightId>,
    pub as_of: NaiveDate,

    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub no_contests: u32,

    pub ko_wins: u32,
    pub submission_wins: u32,
    pub decision_wins: u32,
    pub ko_losses: u32,
    pub submission_losses: u32,
    pub decision_losses: u32,

    pub win_streak: u32,
    pub loss_streak: u32,
    pub longest_win_streak: u32,

    // Fractions of wins; `None` until the fighter has a decided result.
    pub finish_rate: Option<f64>,
    pub ko_rate: Option<f64>,
    pub submission_rate: Option<f64>,

    /// Oldest to newest, one of `W`, `L`, `D` per fight in the form window.
    pub recent_form: String,
    pub recent_wins: u32,
    pub recent_losses: u32,

    pub striking: Option<StrikingAggregate>,
    pub grappling: Option<GrapplingAggregate>,
    pub avg_fight_seconds: Option<f64>,

    pub height_cm: Option<f64>,
    pub reach_cm: Option<f64>,
    pub age_years: Option<u32>,

    pub last_fight_date: Option<NaiveDate>,
    pub days_since_last_fight: Option<i64>,
    pub fights_counted: u32,
}

impl FighterSnapshot {
    pub fn with_fight(mut self, fight_id: FightId) -> Self {
        self.fight_id = Some(fight_id);
        self
    }

    pub fn record(&self) -> String {
        format!("{}-{}-{}", self.wins, self.losses, self.draws)
    }

    /// Rejects snapshots whose numbers contradict each other. Stored snapshots come from
    /// outside the core, so they are checked before use.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(PredictionError::insufficient_data(format!(
                "snapshot for fighter {}: {reason}",
                self.fighter_id
            )))
        };

        let results = total([self.wins, self.losses, self.draws, self.no_contests]);
        if results > u64::from(self.fights_counted) {
            return fail(format!(
                "record {} (+{} nc) exceeds {} counted fights",
                self.record(),
                self.no_contests,
                self.fights_counted
            ));
        }
        if total([self.ko_wins, self.submission_wins, self.decision_wins]) > u64::from(self.wins) {
            return fail("win methods exceed wins".to_string());
        }
        if total([self.ko_losses, self.submission_losses, self.decision_losses])
            > u64::from(self.losses)
        {
            return fail("loss methods exceed losses".to_string());
        }
        if self.win_streak > self.wins || self.loss_streak > self.losses {
            return fail("streak longer than record".to_string());
        }
        if self.win_streak > 0 && self.loss_streak > 0 {
            return fail("simultaneous win and loss streak".to_string());
        }
        if self.longest_win_streak < self.win_streak || self.longest_win_streak > self.wins {
            return fail("longest win streak out of range".to_string());
        }
        if total([self.recent_wins, self.recent_losses]) > total([self.wins, self.losses]) {
            return fail("recent form exceeds record".to_string());
        }
        for (name, rate) in [
            ("finish rate", self.finish_rate),
            ("ko rate", self.ko_rate),
            ("submission rate", self.submission_rate),
        ] {
            if let Some(r) = rate {
                if !(0.0..=1.0).contains(&r) {
                    return fail(format!("{name} {r} outside [0, 1]"));
                }
            }
        }
        if let Some(s) = &self.striking {
            let fractions_ok = [s.accuracy, s.defense]
                .into_iter()
                .flatten()
                .all(|v| (0.0..=1.0).contains(&v));
            if !fractions_ok || !(s.landed_per_min >= 0.0) || !(s.absorbed_per_min >= 0.0) {
                return fail("striking aggregate out of range".to_string());
            }
        }
        if let Some(g) = &self.grappling {
            let fractions_ok = [g.takedown_accuracy, g.takedown_defense]
                .into_iter()
                .flatten()
                .all(|v| (0.0..=1.0).contains(&v));
            if !fractions_ok || !(g.takedowns_per_15 >= 0.0) || !(g.submissions_per_15 >= 0.0) {
                return fail("grappling aggregate out of range".to_string());
            }
        }
        if let Some(last) = self.last_fight_date {
            if last >= self.as_of {
                return fail(format!("last fight {last} not before cutoff {}", self.as_of));
            }
        }
        if self.days_since_last_fight.is_some_and(|d| d < 0) {
            return fail("negative days since last fight".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SnapshotBuilder {
    pub form_window: usize,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self {
            form_window: DEFAULT_FORM_WINDOW,
        }
    }
}

/// Point-in-time snapshot with the default form window. `None` for a debut.
pub fn build_snapshot(
    fighter: &Fighter,
    history: &[FightRecord],
    as_of: NaiveDate,
) -> Option<FighterSnapshot> {
    SnapshotBuilder::default().build(fighter, history, as_of)
}

#[derive(Debug, Default)]
struct BoutTotals {
    seconds: f64,
    landed: u64,
    attempted: u64,
    opp_landed: u64,
    opp_attempted: u64,
    td_landed: u64,
    td_attempted: u64,
    opp_td_landed: u64,
    opp_td_attempted: u64,
    sub_attempts: u64,
    fights: u32,
}

impl SnapshotBuilder {
    pub fn new(form_window: usize) -> Self {
        Self {
            form_window: form_window.max(1),
        }
    }

    pub fn build(
        &self,
        fighter: &Fighter,
        history: &[FightRecord],
        as_of: NaiveDate,
    ) -> Option<FighterSnapshot> {
        let mut prior: Vec<&FightRecord> = history.iter().filter(|r| r.date < as_of).collect();
        if prior.is_empty() {
            return None;
        }
        prior.sort_by(|a, b| a.date.cmp(&b.date).then(a.fight_id.cmp(&b.fight_id)));

        let mut snap = FighterSnapshot {
            fighter_id: fighter.id,
            fight_id: None,
            as_of,
            wins: 0,
            losses: 0,
            draws: 0,
            no_contests: 0,
            ko_wins: 0,
            submission_wins: 0,
            decision_wins: 0,
            ko_losses: 0,
            submission_losses: 0,
            decision_losses: 0,
            win_streak: 0,
            loss_streak: 0,
            longest_win_streak: 0,
            finish_rate: None,
            ko_rate: None,
            submission_rate: None,
            recent_form: String::new(),
            recent_wins: 0,
            recent_losses: 0,
            striking: None,
            grappling: None,
            avg_fight_seconds: None,
            height_cm: fighter.height_cm,
            reach_cm: fighter.reach_cm,
            age_years: fighter.age_on(as_of),
            last_fight_date: prior.last().map(|r| r.date),
            days_since_last_fight: None,
            fights_counted: prior.len() as u32,
        };
        snap.days_since_last_fight = snap.last_fight_date.map(|d| (as_of - d).num_days());

        let mut current = 0u32;
        let mut streak_is_wins = true;
        let mut fight_seconds = Vec::new();
        let mut bouts = BoutTotals::default();

        for rec in &prior {
            match rec.outcome {
                Outcome::NoContest => {
                    snap.no_contests += 1;
                    continue;
                }
                Outcome::Draw => {
                    snap.draws += 1;
                    current = 0;
                }
                Outcome::Win => {
                    snap.wins += 1;
                    match rec.method {
                        Some(ResultMethod::KoTko) => snap.ko_wins += 1,
                        Some(ResultMethod::Submission) => snap.submission_wins += 1,
                        Some(ResultMethod::Decision) => snap.decision_wins += 1,
                        _ => {}
                    }
                    if streak_is_wins {
                        current += 1;
                    } else {
                        current = 1;
                        streak_is_wins = true;
                    }
                    snap.longest_win_streak = snap.longest_win_streak.max(current);
                }
                Outcome::Loss => {
                    snap.losses += 1;
                    match rec.method {
                        Some(ResultMethod::KoTko) => snap.ko_losses += 1,
                        Some(ResultMethod::Submission) => snap.submission_losses += 1,
                        Some(ResultMethod::Decision) => snap.decision_losses += 1,
                        _ => {}
                    }
                    if streak_is_wins {
                        current = 1;
                        streak_is_wins = false;
                    } else {
                        current += 1;
                    }
                }
            }

            if let Some(secs) = rec.fight_seconds {
                fight_seconds.push(f64::from(secs));
            }
            accumulate_bout(&mut bouts, rec);
        }

        if streak_is_wins {
            snap.win_streak = current;
        } else {
            snap.loss_streak = current;
        }

        if snap.wins + snap.losses > 0 {
            let wins = f64::from(snap.wins);
            let ratio = |n: u32| if snap.wins > 0 { f64::from(n) / wins } else { 0.0 };
            snap.finish_rate = Some(ratio(snap.ko_wins + snap.submission_wins));
            snap.ko_rate = Some(ratio(snap.ko_wins));
            snap.submission_rate = Some(ratio(snap.submission_wins));
        }

        if !fight_seconds.is_empty() {
            snap.avg_fight_seconds =
                Some(fight_seconds.iter().sum::<f64>() / fight_seconds.len() as f64);
        }

        let recent: Vec<Outcome> = prior
            .iter()
            .map(|r| r.outcome)
            .filter(|o| *o != Outcome::NoContest)
            .collect();
        let start = recent.len().saturating_sub(self.form_window);
        for outcome in &recent[start..] {
            match outcome {
                Outcome::Win => snap.recent_wins += 1,
                Outcome::Loss => snap.recent_losses += 1,
                _ => {}
            }
            if let Some(c) = outcome.form_char() {
                snap.recent_form.push(c);
            }
        }

        if bouts.fights > 0 && bouts.seconds > 0.0 {
            let minutes = bouts.seconds / 60.0;
            snap.striking = Some(StrikingAggregate {
                accuracy: fraction(bouts.landed, bouts.attempted),
                defense: fraction(bouts.opp_landed, bouts.opp_attempted).map(|p| 1.0 - p),
                landed_per_min: bouts.landed as f64 / minutes,
                absorbed_per_min: bouts.opp_landed as f64 / minutes,
            });
            snap.grappling = Some(GrapplingAggregate {
                takedown_accuracy: fraction(bouts.td_landed, bouts.td_attempted),
                takedown_defense: fraction(bouts.opp_td_landed, bouts.opp_td_attempted)
                    .map(|p| 1.0 - p),
                takedowns_per_15: bouts.td_landed as f64 / minutes * 15.0,
                submissions_per_15: bouts.sub_attempts as f64 / minutes * 15.0,
            });
        }

        Some(snap)
    }

    /// Builds the pre-fight snapshot of both participants for every completed fight.
    /// Debuts produce no snapshot; the engine falls back to raw records for them.
    pub fn calculate_all(
        &self,
        fighters: &HashMap<FighterId, Fighter>,
        fights: &[Fight],
    ) -> (Vec<FighterSnapshot>, BackfillSummary) {
        let mut histories: HashMap<FighterId, Vec<FightRecord>> = HashMap::new();
        for fight in fights {
            for id in [fight.fighter_a, fight.fighter_b] {
                if let Some(rec) = fight.record_for(id) {
                    histories.entry(id).or_default().push(rec);
                }
            }
        }

        let mut summary = BackfillSummary::default();
        let mut out = Vec::new();
        for fight in fights.iter().filter(|f| f.status == FightStatus::Completed) {
            summary.fights_processed += 1;
            for id in [fight.fighter_a, fight.fighter_b] {
                let Some(fighter) = fighters.get(&id) else {
                    summary.missing_fighters += 1;
                    continue;
                };
                let history = histories.get(&id).map(Vec::as_slice).unwrap_or(&[]);
                match self.build(fighter, history, fight.date) {
                    Some(snap) => {
                        out.push(snap.with_fight(fight.id));
                        summary.snapshots_built += 1;
                    }
                    None => summary.debuts += 1,
                }
            }
        }
        (out, summary)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub fights_processed: usize,
    pub snapshots_built: usize,
    pub debuts: usize,
    pub missing_fighters: usize,
}

fn accumulate_bout(totals: &mut BoutTotals, rec: &FightRecord) {
    let (Some(own), Some(opp), Some(secs)) = (rec.own_stats, rec.opponent_stats, rec.fight_seconds)
    else {
        return;
    };
    if secs == 0 {
        return;
    }
    totals.seconds += f64::from(secs);
    totals.landed += u64::from(own.sig_strikes_landed);
    totals.attempted += u64::from(own.sig_strikes_attempted);
    totals.opp_landed += u64::from(opp.sig_strikes_landed);
    totals.opp_attempted += u64::from(opp.sig_strikes_attempted);
    totals.td_landed += u64::from(own.takedowns_landed);
    totals.td_attempted += u64::from(own.takedowns_attempted);
    totals.opp_td_landed += u64::from(opp.takedowns_landed);
    totals.opp_td_attempted += u64::from(opp.takedowns_attempted);
    totals.sub_attempts += u64::from(own.submission_attempts);
    totals.fights += 1;
}

/// Widened sum of stored counters, which may hold anything a blob decoded to.
fn total<const N: usize>(counts: [u32; N]) -> u64 {
    counts.into_iter().map(u64::from).sum()
}

fn fraction(num: u64, den: u64) -> Option<f64> {
    if den == 0 {
        return None;
    }
    Some((num as f64 / den as f64).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoutStats;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(id: u64, date: NaiveDate, outcome: Outcome, method: Option<ResultMethod>) -> FightRecord {
        FightRecord {
            fight_id: id,
            date,
            opponent: 100 + id,
            outcome,
            method,
            is_title_fight: false,
            weight_class: None,
            fight_seconds: Some(900),
            own_stats: None,
            opponent_stats: None,
        }
    }

    fn fighter() -> Fighter {
        let mut f = Fighter::new(1, "Test Fighter");
        f.date_of_birth = Some(d(1990, 6, 1));
        f.height_cm = Some(180.0);
        f.reach_cm = Some(185.0);
        f
    }

    #[test]
    fn debut_has_no_snapshot() {
        assert!(build_snapshot(&fighter(), &[], d(2020, 1, 1)).is_none());
        let later = [rec(1, d(2020, 1, 1), Outcome::Win, None)];
        assert!(build_snapshot(&fighter(), &later, d(2020, 1, 1)).is_none());
    }

    #[test]
    fn same_day_fight_is_excluded() {
        let history = [
            rec(1, d(2019, 1, 1), Outcome::Win, None),
            rec(2, d(2020, 1, 1), Outcome::Loss, None),
        ];
        let snap = build_snapshot(&fighter(), &history, d(2020, 1, 1)).unwrap();
        assert_eq!((snap.wins, snap.losses), (1, 0));
        assert_eq!(snap.last_fight_date, Some(d(2019, 1, 1)));
        assert_eq!(snap.days_since_last_fight, Some(365));
    }

    #[test]
    fn streaks_and_form_follow_chronology_not_input_order() {
        let history = [
            rec(4, d(2019, 4, 1), Outcome::Win, Some(ResultMethod::KoTko)),
            rec(1, d(2019, 1, 1), Outcome::Loss, Some(ResultMethod::Decision)),
            rec(3, d(2019, 3, 1), Outcome::Win, Some(ResultMethod::Submission)),
            rec(2, d(2019, 2, 1), Outcome::Loss, Some(ResultMethod::KoTko)),
        ];
        let snap = build_snapshot(&fighter(), &history, d(2020, 1, 1)).unwrap();
        assert_eq!(snap.recent_form, "LLWW");
        assert_eq!(snap.win_streak, 2);
        assert_eq!(snap.loss_streak, 0);
        assert_eq!(snap.longest_win_streak, 2);
        assert_eq!(snap.finish_rate, Some(1.0));
        assert_eq!(snap.ko_rate, Some(0.5));
        assert_eq!(snap.ko_losses, 1);
        assert_eq!(snap.age_years, Some(29));
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn no_contests_skip_form_and_draws_reset_streak() {
        let history = [
            rec(1, d(2019, 1, 1), Outcome::Win, None),
            rec(2, d(2019, 2, 1), Outcome::Win, None),
            rec(3, d(2019, 3, 1), Outcome::Draw, None),
            rec(4, d(2019, 4, 1), Outcome::NoContest, None),
        ];
        let snap = build_snapshot(&fighter(), &history, d(2020, 1, 1)).unwrap();
        assert_eq!(snap.no_contests, 1);
        assert_eq!(snap.draws, 1);
        assert_eq!(snap.win_streak, 0);
        assert_eq!(snap.longest_win_streak, 2);
        assert_eq!(snap.recent_form, "WWD");
        assert_eq!(snap.fights_counted, 4);
    }

    #[test]
    fn form_window_keeps_most_recent_results() {
        let history: Vec<FightRecord> = (0..8)
            .map(|i| {
                let outcome = if i < 5 { Outcome::Loss } else { Outcome::Win };
                rec(i, d(2010 + i as i32, 1, 1), outcome, None)
            })
            .collect();
        let snap = SnapshotBuilder::new(3).build(&fighter(), &history, d(2030, 1, 1)).unwrap();
        assert_eq!(snap.recent_form, "WWW");
        assert_eq!(snap.recent_wins, 3);
    }

    #[test]
    fn bout_aggregates_are_absent_without_stats() {
        let history = [rec(1, d(2019, 1, 1), Outcome::Win, None)];
        let snap = build_snapshot(&fighter(), &history, d(2020, 1, 1)).unwrap();
        assert!(snap.striking.is_none());
        assert!(snap.grappling.is_none());

        let mut with_stats = rec(2, d(2019, 6, 1), Outcome::Win, None);
        with_stats.own_stats = Some(BoutStats {
            sig_strikes_landed: 45,
            sig_strikes_attempted: 90,
            takedowns_landed: 2,
            takedowns_attempted: 4,
            submission_attempts: 1,
        });
        with_stats.opponent_stats = Some(BoutStats {
            sig_strikes_landed: 30,
            sig_strikes_attempted: 100,
            takedowns_landed: 0,
            takedowns_attempted: 5,
            submission_attempts: 0,
        });
        let snap = build_snapshot(&fighter(), &[with_stats], d(2020, 1, 1)).unwrap();
        let s = snap.striking.unwrap();
        assert_eq!(s.accuracy, Some(0.5));
        assert!((s.defense.unwrap() - 0.7).abs() < 1e-12);
        assert!((s.landed_per_min - 3.0).abs() < 1e-12);
        let g = snap.grappling.unwrap();
        assert_eq!(g.takedown_defense, Some(1.0));
        assert!((g.takedowns_per_15 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn validate_flags_contradictions() {
        let history = [rec(1, d(2019, 1, 1), Outcome::Win, None)];
        let snap = build_snapshot(&fighter(), &history, d(2020, 1, 1)).unwrap();

        let mut bad = snap.clone();
        bad.wins = 5;
        assert!(matches!(bad.validate(), Err(PredictionError::InsufficientData { .. })));

        let mut bad = snap.clone();
        bad.finish_rate = Some(1.5);
        assert!(bad.validate().is_err());

        let mut bad = snap;
        bad.last_fight_date = Some(d(2020, 1, 1));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn validate_rejects_counters_that_would_overflow() {
        let history = [rec(1, d(2019, 1, 1), Outcome::Win, None)];
        let snap = build_snapshot(&fighter(), &history, d(2020, 1, 1)).unwrap();

        let mut bad = snap.clone();
        bad.wins = u32::MAX;
        bad.losses = 5;
        assert!(matches!(bad.validate(), Err(PredictionError::InsufficientData { .. })));

        // Wrapping sums would come out as 0 and slip past the record check.
        let mut bad = snap;
        bad.wins = u32::MAX;
        bad.losses = 1;
        bad.ko_wins = u32::MAX;
        bad.decision_wins = 1;
        assert!(matches!(bad.validate(), Err(PredictionError::InsufficientData { .. })));
    }

    #[test]
    fn backfill_builds_pre_fight_snapshots() {
        let mut fighters = HashMap::new();
        fighters.insert(1, Fighter::new(1, "One"));
        fighters.insert(2, Fighter::new(2, "Two"));

        let mut first = Fight::scheduled(10, d(2020, 1, 1), 1, 2);
        first.status = FightStatus::Completed;
        first.winner = Some(1);
        let mut second = Fight::scheduled(11, d(2020, 6, 1), 2, 1);
        second.status = FightStatus::Completed;
        second.winner = Some(2);

        let (snaps, summary) = SnapshotBuilder::default().calculate_all(&fighters, &[first, second]);
        assert_eq!(summary.fights_processed, 2);
        assert_eq!(summary.debuts, 2);
        assert_eq!(summary.snapshots_built, 2);
        let one = snaps.iter().find(|s| s.fighter_id == 1).unwrap();
        assert_eq!(one.fight_id, Some(11));
        assert_eq!(one.wins, 1);
    }
}
