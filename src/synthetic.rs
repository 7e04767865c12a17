//! Deterministic synthetic league for demos, backtests and benches.
//!
//! Every fighter gets hidden striking and grappling skill; bouts are resolved from those
//! skills plus noise, and per-bout stats are drawn to match. The same seed always gives
//! the same league.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{BoutStats, Fight, FightStatus, Fighter, ResultMethod};
use crate::store::MemoryStore;

const FIGHTS_PER_CARD: usize = 8;
const DAYS_BETWEEN_CARDS: i64 = 7;
const DRAW_RATE: f64 = 0.01;

const FIRST_NAMES: [&str; 12] = [
    "Alex", "Bruno", "Carlos", "Dmitri", "Eli", "Felipe", "Gabe", "Hiro", "Ivan", "Jon", "Kai",
    "Luis",
];
const LAST_NAMES: [&str; 12] = [
    "Silva", "Khan", "Moreno", "Petrov", "Santos", "Oliveira", "Yamada", "Costa", "Novak",
    "Reyes", "Adams", "Dube",
];

#[derive(Debug, Clone, Copy)]
pub struct LeagueSpec {
    pub fighters: usize,
    pub fights: usize,
    pub upcoming: usize,
    pub start: NaiveDate,
    pub seed: u64,
}

impl Default for LeagueSpec {
    fn default() -> Self {
        Self {
            fighters: 60,
            fights: 400,
            upcoming: 8,
            start: NaiveDate::from_ymd_opt(2015, 1, 3).unwrap_or_default(),
            seed: 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticLeague {
    pub fighters: Vec<Fighter>,
    pub fights: Vec<Fight>,
}

impl SyntheticLeague {
    pub fn into_store(self) -> MemoryStore {
        let mut store = MemoryStore::new();
        for f in self.fighters {
            store.insert_fighter(f);
        }
        for f in self.fights {
            store.insert_fight(f);
        }
        store
    }
}

#[derive(Debug, Clone, Copy)]
struct Skill {
    striking: f64,
    grappling: f64,
}

pub fn generate(spec: &LeagueSpec) -> SyntheticLeague {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let n = spec.fighters.max(2);

    let mut fighters = Vec::with_capacity(n);
    let mut skills = Vec::with_capacity(n);
    for i in 0..n {
        let id = i as u64 + 1;
        let name = format!(
            "{} {} {}",
            FIRST_NAMES[i % FIRST_NAMES.len()],
            LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()],
            id
        );
        let mut fighter = Fighter::new(id, name);
        let height: f64 = rng.gen_range(165.0..195.0);
        fighter.height_cm = Some(height.round());
        fighter.reach_cm = Some((height + rng.gen_range(-5.0..10.0)).round());
        let age_days: i64 = rng.gen_range(22 * 365..34 * 365);
        fighter.date_of_birth = Some(spec.start - Duration::days(age_days));
        fighters.push(fighter);
        skills.push(Skill {
            striking: rng.gen_range(0.0..1.0),
            grappling: rng.gen_range(0.0..1.0),
        });
    }

    let total = spec.fights + spec.upcoming;
    let mut fights = Vec::with_capacity(total);
    for i in 0..total {
        let card = (i / FIGHTS_PER_CARD) as i64;
        let date = spec.start + Duration::days(card * DAYS_BETWEEN_CARDS);
        let a = rng.gen_range(0..n);
        let mut b = rng.gen_range(0..n - 1);
        if b >= a {
            b += 1;
        }
        let mut fight = Fight::scheduled(i as u64 + 1, date, fighters[a].id, fighters[b].id);
        fight.weight_class = Some("Lightweight".to_string());
        fight.is_title_fight = rng.gen_bool(0.03);
        if fight.is_title_fight {
            fight.scheduled_rounds = 5;
        }
        if i < spec.fights {
            resolve(&mut fight, skills[a], skills[b], &mut rng);
        }
        fights.push(fight);
    }

    SyntheticLeague { fighters, fights }
}

fn resolve(fight: &mut Fight, a: Skill, b: Skill, rng: &mut impl Rng) {
    fight.status = FightStatus::Completed;
    let edge = 0.6 * (a.striking - b.striking) + 0.4 * (a.grappling - b.grappling);
    let noise = rng.gen_range(-0.35..0.35);

    let (round, time) = if rng.gen_bool(DRAW_RATE) {
        fight.is_draw = true;
        fight.method = Some(ResultMethod::Decision);
        (fight.scheduled_rounds, "5:00".to_string())
    } else {
        let a_wins = edge + noise >= 0.0;
        let (winner, skill) = if a_wins {
            (fight.fighter_a, a)
        } else {
            (fight.fighter_b, b)
        };
        fight.winner = Some(winner);
        let method = if skill.striking >= skill.grappling && rng.gen_bool(0.45) {
            ResultMethod::KoTko
        } else if skill.grappling > skill.striking && rng.gen_bool(0.4) {
            ResultMethod::Submission
        } else {
            ResultMethod::Decision
        };
        fight.method = Some(method);
        if method == ResultMethod::Decision {
            (fight.scheduled_rounds, "5:00".to_string())
        } else {
            let round = rng.gen_range(1..=fight.scheduled_rounds);
            let secs: u32 = rng.gen_range(10..300);
            (round, format!("{}:{:02}", secs / 60, secs % 60))
        }
    };
    fight.ending_round = Some(round);
    fight.ending_time = Some(time);

    let minutes = f64::from(fight.fight_seconds().unwrap_or(900)) / 60.0;
    fight.stats_a = Some(bout_stats(a, b, minutes, rng));
    fight.stats_b = Some(bout_stats(b, a, minutes, rng));
}

fn bout_stats(own: Skill, opp: Skill, minutes: f64, rng: &mut impl Rng) -> BoutStats {
    let accuracy = (0.30 + 0.30 * own.striking - 0.10 * opp.striking).clamp(0.15, 0.75);
    let landed = (minutes * (2.0 + 4.0 * own.striking) * rng.gen_range(0.8..1.2)).round();
    let attempted = (landed / accuracy).round().max(landed);

    let td_rate = (0.2 + 0.5 * own.grappling - 0.2 * opp.grappling).clamp(0.05, 0.8);
    let td_attempted =
        (minutes / 15.0 * (0.5 + 4.0 * own.grappling) * rng.gen_range(0.7..1.3)).round();
    let td_landed = (td_attempted * td_rate).round().min(td_attempted);
    let subs = (minutes / 15.0 * 2.0 * own.grappling * rng.gen_range(0.5..1.5)).round();

    BoutStats {
        sig_strikes_landed: landed as u32,
        sig_strikes_attempted: attempted as u32,
        takedowns_landed: td_landed as u32,
        takedowns_attempted: td_attempted as u32,
        submission_attempts: subs as u32,
    }
}
