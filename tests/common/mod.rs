#![allow(dead_code)]

use chrono::{Duration, NaiveDate};

use fight_forecast::MemoryStore;
use fight_forecast::model::{BoutStats, Fight, FightId, FightStatus, Fighter, FighterId, ResultMethod};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn fighter(id: FighterId, name: &str, dob: NaiveDate, height: f64, reach: f64) -> Fighter {
    let mut f = Fighter::new(id, name);
    f.date_of_birth = Some(dob);
    f.height_cm = Some(height);
    f.reach_cm = Some(reach);
    f.weight_class = Some("Lightweight".to_string());
    f
}

pub fn stats(landed: u32, attempted: u32, td_landed: u32, td_attempted: u32) -> BoutStats {
    BoutStats {
        sig_strikes_landed: landed,
        sig_strikes_attempted: attempted,
        takedowns_landed: td_landed,
        takedowns_attempted: td_attempted,
        submission_attempts: 0,
    }
}

pub fn decision(
    id: FightId,
    date: NaiveDate,
    a: FighterId,
    b: FighterId,
    winner: FighterId,
    stats_a: BoutStats,
    stats_b: BoutStats,
) -> Fight {
    let mut f = Fight::scheduled(id, date, a, b);
    f.status = FightStatus::Completed;
    f.winner = Some(winner);
    f.method = Some(ResultMethod::Decision);
    f.ending_round = Some(3);
    f.ending_time = Some("5:00".to_string());
    f.stats_a = Some(stats_a);
    f.stats_b = Some(stats_b);
    f
}

/// Adds one fight per character of `results` (`W`/`L`, oldest first) for `fighter`
/// against fresh opponents, ending `gap_days` before `last`. Returns the next free id.
#[allow(clippy::too_many_arguments)]
pub fn add_career(
    store: &mut MemoryStore,
    fighter: FighterId,
    results: &str,
    last: NaiveDate,
    gap_days: i64,
    mut next_id: u64,
    own: BoutStats,
    opp: BoutStats,
) -> u64 {
    let n = results.len() as i64;
    for (i, c) in results.chars().enumerate() {
        let date = last - Duration::days(gap_days * (n - i as i64));
        let opponent = 10_000 + next_id;
        let winner = if c == 'W' { fighter } else { opponent };
        store.insert_fight(decision(next_id, date, fighter, opponent, winner, own, opp));
        next_id += 1;
    }
    next_id
}

/// A 10-2 sharp striker and a 2-10 struggling one, both with full bout stats and
/// physical data, meeting on `fight_date` as fight 1.
pub fn favourite_vs_underdog(fight_date: NaiveDate) -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_fighter(fighter(1, "Sharp Striker", d(1994, 5, 1), 180.0, 185.0));
    store.insert_fighter(fighter(2, "Struggling Journeyman", d(1994, 5, 1), 180.0, 185.0));

    let sharp = stats(75, 136, 1, 3);
    let blunt = stats(37, 106, 1, 3);
    let next = add_career(&mut store, 1, "LLWWWWWWWWWW", fight_date, 30, 100, sharp, blunt);
    add_career(&mut store, 2, "WWLLLLLLLLLL", fight_date, 30, next, blunt, sharp);
    store.insert_fight(Fight::scheduled(1, fight_date, 1, 2));
    store
}
