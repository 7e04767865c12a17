mod common;

use std::collections::HashMap;

use chrono::Duration;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use fight_forecast::model::{Fight, FightRecord, FightStatus, Fighter, Outcome, ResultMethod};
use fight_forecast::snapshot::SnapshotBuilder;
use fight_forecast::synthetic::{self, LeagueSpec};

use common::{d, stats};

fn random_history(rng: &mut StdRng, fighter: &Fighter, fights: usize) -> Vec<FightRecord> {
    let start = d(2018, 1, 1);
    (0..fights)
        .filter_map(|i| {
            let date = start + Duration::days(rng.gen_range(0..2000));
            let mut fight = Fight::scheduled(i as u64 + 1, date, fighter.id, 500 + i as u64);
            fight.status = FightStatus::Completed;
            match rng.gen_range(0..20) {
                0 => fight.is_draw = true,
                1 => fight.is_no_contest = true,
                n if n < 12 => fight.winner = Some(fighter.id),
                _ => fight.winner = Some(fight.fighter_b),
            }
            fight.method = Some(match rng.gen_range(0..3) {
                0 => ResultMethod::KoTko,
                1 => ResultMethod::Submission,
                _ => ResultMethod::Decision,
            });
            fight.ending_round = Some(rng.gen_range(1..=3));
            fight.ending_time = Some(format!("{}:{:02}", rng.gen_range(0..5), rng.gen_range(0..60)));
            fight.stats_a = Some(stats(rng.gen_range(5..60), 80, 1, 4));
            fight.stats_b = Some(stats(rng.gen_range(5..60), 80, 0, 2));
            fight.record_for(fighter.id)
        })
        .collect()
}

#[test]
fn nothing_on_or_after_the_cutoff_is_counted() {
    let mut rng = StdRng::seed_from_u64(2024);
    let fighter = Fighter::new(1, "Cutoff Check");
    let builder = SnapshotBuilder::default();

    for round in 0..40 {
        let history = random_history(&mut rng, &fighter, 5 + round % 20);
        let cutoff = d(2018, 1, 1) + Duration::days(rng.gen_range(0..2200));
        let prior: Vec<&FightRecord> = history.iter().filter(|r| r.date < cutoff).collect();

        let Some(snap) = builder.build(&fighter, &history, cutoff) else {
            assert!(prior.is_empty());
            continue;
        };
        snap.validate().unwrap();
        assert_eq!(snap.fights_counted as usize, prior.len());
        assert!(snap.last_fight_date.is_some_and(|last| last < cutoff));
        assert!(snap.days_since_last_fight.is_some_and(|days| days > 0));

        let count = |o: Outcome| prior.iter().filter(|r| r.outcome == o).count() as u32;
        assert_eq!(snap.wins, count(Outcome::Win));
        assert_eq!(snap.losses, count(Outcome::Loss));
        assert_eq!(snap.draws, count(Outcome::Draw));
        assert_eq!(snap.no_contests, count(Outcome::NoContest));
        assert!(snap.recent_form.len() <= builder.form_window);
    }
}

#[test]
fn input_order_does_not_matter() {
    let mut rng = StdRng::seed_from_u64(77);
    let fighter = Fighter::new(1, "Order Check");
    let builder = SnapshotBuilder::new(3);

    for _ in 0..25 {
        let history = random_history(&mut rng, &fighter, 12);
        let cutoff = d(2021, 6, 1);
        let reference = builder.build(&fighter, &history, cutoff);

        let mut shuffled = history.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(builder.build(&fighter, &shuffled, cutoff), reference);
        shuffled.reverse();
        assert_eq!(builder.build(&fighter, &shuffled, cutoff), reference);
    }
}

#[test]
fn backfill_never_sees_the_fight_it_describes() {
    let league = synthetic::generate(&LeagueSpec {
        fighters: 16,
        fights: 120,
        upcoming: 0,
        seed: 4,
        ..LeagueSpec::default()
    });
    let fighters: HashMap<_, _> = league.fighters.iter().map(|f| (f.id, f.clone())).collect();
    let by_id: HashMap<_, _> = league.fights.iter().map(|f| (f.id, f)).collect();

    let (snapshots, summary) = SnapshotBuilder::default().calculate_all(&fighters, &league.fights);
    assert_eq!(summary.fights_processed, 120);
    assert_eq!(summary.snapshots_built + summary.debuts, 240);
    assert_eq!(summary.missing_fighters, 0);
    assert_eq!(snapshots.len(), summary.snapshots_built);

    for snap in &snapshots {
        let fight = by_id[&snap.fight_id.unwrap()];
        assert_eq!(snap.as_of, fight.date);
        assert!(snap.last_fight_date.unwrap() < fight.date);

        // Fights the same day as this one (same card) must not be counted either.
        let earlier = league
            .fights
            .iter()
            .filter(|f| f.involves(snap.fighter_id) && f.date < fight.date)
            .count();
        assert_eq!(snap.fights_counted as usize, earlier);
    }
}
