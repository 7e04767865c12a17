use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub type FighterId = u64;
pub type FightId = u64;

const ROUND_SECONDS: u32 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FightStatus {
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultMethod {
    KoTko,
    Submission,
    Decision,
    Other,
}

impl ResultMethod {
    /// Lenient parse of the free-text method strings found in fight records.
    pub fn parse(raw: &str) -> Self {
        let m = raw.trim().to_ascii_lowercase();
        if m.contains("ko") || m.contains("knockout") {
            ResultMethod::KoTko
        } else if m.contains("sub") {
            ResultMethod::Submission
        } else if m.contains("dec") {
            ResultMethod::Decision
        } else {
            ResultMethod::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResultMethod::KoTko => "KO/TKO",
            ResultMethod::Submission => "Submission",
            ResultMethod::Decision => "Decision",
            ResultMethod::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
    NoContest,
}

impl Outcome {
    pub fn form_char(self) -> Option<char> {
        match self {
            Outcome::Win => Some('W'),
            Outcome::Loss => Some('L'),
            Outcome::Draw => Some('D'),
            Outcome::NoContest => None,
        }
    }
}

/// One side's offensive output in a single bout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoutStats {
    pub sig_strikes_landed: u32,
    pub sig_strikes_attempted: u32,
    pub takedowns_landed: u32,
    pub takedowns_attempted: u32,
    pub submission_attempts: u32,
}

/// Career totals as carried on the fighter record itself. This is the raw record the
/// feature extractor falls back to when no point-in-time snapshot exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerTotals {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub draws: u32,
    // Fractions in [0, 1].
    #[serde(default)]
    pub striking_accuracy: Option<f64>,
    #[serde(default)]
    pub striking_defense: Option<f64>,
    #[serde(default)]
    pub takedown_accuracy: Option<f64>,
    #[serde(default)]
    pub takedown_defense: Option<f64>,
    #[serde(default)]
    pub strikes_landed_per_min: Option<f64>,
    #[serde(default)]
    pub strikes_absorbed_per_min: Option<f64>,
    #[serde(default)]
    pub takedowns_per_15: Option<f64>,
    #[serde(default)]
    pub submissions_per_15: Option<f64>,
    #[serde(default)]
    pub last_fight_date: Option<NaiveDate>,
}

impl CareerTotals {
    pub fn total_fights(&self) -> u32 {
        self.wins.saturating_add(self.losses).saturating_add(self.draws)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fighter {
    pub id: FighterId,
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub reach_cm: Option<f64>,
    #[serde(default)]
    pub weight_class: Option<String>,
    #[serde(default)]
    pub career: CareerTotals,
}

impl Fighter {
    pub fn new(id: FighterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nickname: None,
            date_of_birth: None,
            height_cm: None,
            reach_cm: None,
            weight_class: None,
            career: CareerTotals::default(),
        }
    }

    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        self.date_of_birth.and_then(|dob| full_years_between(dob, date))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fight {
    pub id: FightId,
    pub date: NaiveDate,
    pub fighter_a: FighterId,
    pub fighter_b: FighterId,
    #[serde(default)]
    pub weight_class: Option<String>,
    #[serde(default)]
    pub is_title_fight: bool,
    #[serde(default = "default_rounds")]
    pub scheduled_rounds: u8,
    pub status: FightStatus,
    #[serde(default)]
    pub winner: Option<FighterId>,
    #[serde(default)]
    pub method: Option<ResultMethod>,
    #[serde(default)]
    pub is_draw: bool,
    #[serde(default)]
    pub is_no_contest: bool,
    #[serde(default)]
    pub ending_round: Option<u8>,
    #[serde(default)]
    pub ending_time: Option<String>,
    #[serde(default)]
    pub stats_a: Option<BoutStats>,
    #[serde(default)]
    pub stats_b: Option<BoutStats>,
}

fn default_rounds() -> u8 {
    3
}

impl Fight {
    pub fn scheduled(id: FightId, date: NaiveDate, fighter_a: FighterId, fighter_b: FighterId) -> Self {
        Self {
            id,
            date,
            fighter_a,
            fighter_b,
            weight_class: None,
            is_title_fight: false,
            scheduled_rounds: default_rounds(),
            status: FightStatus::Scheduled,
            winner: None,
            method: None,
            is_draw: false,
            is_no_contest: false,
            ending_round: None,
            ending_time: None,
            stats_a: None,
            stats_b: None,
        }
    }

    pub fn involves(&self, fighter: FighterId) -> bool {
        self.fighter_a == fighter || self.fighter_b == fighter
    }

    pub fn side_of(&self, fighter: FighterId) -> Option<Side> {
        if self.fighter_a == fighter {
            Some(Side::A)
        } else if self.fighter_b == fighter {
            Some(Side::B)
        } else {
            None
        }
    }

    /// A completed fight with a recorded winner (no draw, no no-contest).
    pub fn is_decided(&self) -> bool {
        self.status == FightStatus::Completed
            && !self.is_draw
            && !self.is_no_contest
            && self.winner.is_some_and(|w| self.involves(w))
    }

    pub fn outcome_for(&self, fighter: FighterId) -> Option<Outcome> {
        if self.status != FightStatus::Completed || !self.involves(fighter) {
            return None;
        }
        if self.is_no_contest {
            return Some(Outcome::NoContest);
        }
        if self.is_draw {
            return Some(Outcome::Draw);
        }
        match self.winner {
            Some(w) if w == fighter => Some(Outcome::Win),
            Some(w) if self.involves(w) => Some(Outcome::Loss),
            _ => None,
        }
    }

    pub fn fight_seconds(&self) -> Option<u32> {
        parse_time_to_seconds(self.ending_time.as_deref(), self.ending_round)
    }

    /// This fight from one participant's perspective. `None` for fights that are not
    /// completed, do not involve the fighter, or have no usable result.
    pub fn record_for(&self, fighter: FighterId) -> Option<FightRecord> {
        let side = self.side_of(fighter)?;
        let outcome = self.outcome_for(fighter)?;
        let (own, opp, opponent) = match side {
            Side::A => (self.stats_a, self.stats_b, self.fighter_b),
            Side::B => (self.stats_b, self.stats_a, self.fighter_a),
        };
        Some(FightRecord {
            fight_id: self.id,
            date: self.date,
            opponent,
            outcome,
            method: self.method,
            is_title_fight: self.is_title_fight,
            weight_class: self.weight_class.clone(),
            fight_seconds: self.fight_seconds(),
            own_stats: own,
            opponent_stats: opp,
        })
    }
}

/// One past fight seen from a single fighter's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightRecord {
    pub fight_id: FightId,
    pub date: NaiveDate,
    pub opponent: FighterId,
    pub outcome: Outcome,
    #[serde(default)]
    pub method: Option<ResultMethod>,
    #[serde(default)]
    pub is_title_fight: bool,
    #[serde(default)]
    pub weight_class: Option<String>,
    #[serde(default)]
    pub fight_seconds: Option<u32>,
    #[serde(default)]
    pub own_stats: Option<BoutStats>,
    #[serde(default)]
    pub opponent_stats: Option<BoutStats>,
}

/// Total elapsed seconds for a fight that ended at `time` ("m:ss") in `round`.
pub fn parse_time_to_seconds(time: Option<&str>, round: Option<u8>) -> Option<u32> {
    let round = u32::from(round?);
    if round == 0 {
        return None;
    }
    let (m, s) = time?.trim().split_once(':')?;
    let minutes: u32 = m.trim().parse().ok()?;
    let seconds: u32 = s.trim().parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    Some((round - 1) * ROUND_SECONDS + minutes * 60 + seconds)
}

pub fn full_years_between(from: NaiveDate, to: NaiveDate) -> Option<u32> {
    if to < from {
        return None;
    }
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn method_parse_is_lenient() {
        assert_eq!(ResultMethod::parse("KO/TKO"), ResultMethod::KoTko);
        assert_eq!(ResultMethod::parse("tko (punches)"), ResultMethod::KoTko);
        assert_eq!(ResultMethod::parse("Submission"), ResultMethod::Submission);
        assert_eq!(ResultMethod::parse("Decision - Split"), ResultMethod::Decision);
        assert_eq!(ResultMethod::parse("DQ"), ResultMethod::Other);
    }

    #[test]
    fn fight_time_accounts_for_completed_rounds() {
        assert_eq!(parse_time_to_seconds(Some("4:32"), Some(2)), Some(300 + 272));
        assert_eq!(parse_time_to_seconds(Some("5:00"), Some(3)), Some(900));
        assert_eq!(parse_time_to_seconds(Some("bad"), Some(1)), None);
        assert_eq!(parse_time_to_seconds(Some("1:00"), None), None);
    }

    #[test]
    fn age_respects_birthday_not_yet_reached() {
        assert_eq!(full_years_between(d(1990, 6, 15), d(2020, 6, 14)), Some(29));
        assert_eq!(full_years_between(d(1990, 6, 15), d(2020, 6, 15)), Some(30));
        assert_eq!(full_years_between(d(2020, 1, 1), d(2019, 1, 1)), None);
    }

    #[test]
    fn record_for_flips_perspective() {
        let mut fight = Fight::scheduled(9, d(2021, 3, 1), 1, 2);
        fight.status = FightStatus::Completed;
        fight.winner = Some(2);
        fight.stats_a = Some(BoutStats {
            sig_strikes_landed: 10,
            ..BoutStats::default()
        });
        let rec = fight.record_for(1).unwrap();
        assert_eq!(rec.outcome, Outcome::Loss);
        assert_eq!(rec.opponent, 2);
        assert_eq!(rec.own_stats.unwrap().sig_strikes_landed, 10);
        assert!(rec.opponent_stats.is_none());
        assert_eq!(fight.record_for(2).unwrap().outcome, Outcome::Win);
        assert!(fight.record_for(3).is_none());
    }
}
