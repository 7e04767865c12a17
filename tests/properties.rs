mod common;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use fight_forecast::confidence::ConfidenceScorer;
use fight_forecast::features::{FeatureExtractor, FeatureKind};
use fight_forecast::model::{Fighter, FighterId};
use fight_forecast::predictor::{PROB_EPSILON, win_probabilities};
use fight_forecast::snapshot::{FighterSnapshot, build_snapshot};
use fight_forecast::synthetic::{self, LeagueSpec};
use fight_forecast::weights::{MAX_LOGISTIC_SLOPE, ModelParams, PredictionWeights};
use fight_forecast::{EngineConfig, FightDataSource, MemoryStore, PredictionEngine};

use common::d;

fn league(seed: u64) -> MemoryStore {
    synthetic::generate(&LeagueSpec {
        fighters: 24,
        fights: 160,
        upcoming: 0,
        seed,
        ..LeagueSpec::default()
    })
    .into_store()
}

fn random_weights(rng: &mut StdRng) -> PredictionWeights {
    loop {
        let w: Vec<f64> = (0..5).map(|_| rng.gen_range(0.0..1.0)).collect();
        if let Ok(weights) = PredictionWeights::new(w[0], w[1], w[2], w[3], w[4]) {
            return weights;
        }
    }
}

fn random_pair(rng: &mut StdRng, n: u64) -> (FighterId, FighterId) {
    let a = rng.gen_range(1..=n);
    let mut b = rng.gen_range(1..n);
    if b >= a {
        b += 1;
    }
    (a, b)
}

fn random_date(rng: &mut StdRng) -> NaiveDate {
    d(2015, 1, 1) + Duration::days(rng.gen_range(0..600))
}

#[test]
fn swapping_fighters_mirrors_the_prediction_exactly() {
    let mut rng = StdRng::seed_from_u64(11);
    let store = league(3);

    for _ in 0..20 {
        let params = ModelParams {
            logistic_slope: rng.gen_range(0.5..MAX_LOGISTIC_SLOPE),
            ..ModelParams::default()
        };
        let config = EngineConfig::new(random_weights(&mut rng), params).unwrap();
        let engine = PredictionEngine::new(&store, config).unwrap();

        for _ in 0..10 {
            let (a, b) = random_pair(&mut rng, 24);
            let as_of = random_date(&mut rng);
            let ab = engine.predict_matchup(a, b, as_of).unwrap();
            let ba = engine.predict_matchup(b, a, as_of).unwrap();

            assert_eq!(ab.probability_a, ba.probability_b);
            assert_eq!(ab.probability_b, ba.probability_a);
            assert_eq!(ab.combined_advantage, -ba.combined_advantage);
            assert_eq!(ab.confidence, ba.confidence);
            assert_eq!(ab.breakdown, ba.breakdown.mirrored());
            if ab.probability_a != 0.5 {
                assert_eq!(ab.winner_id, ba.winner_id);
            }
        }
    }
}

#[test]
fn probabilities_are_bounded_and_sum_to_one() {
    let mut rng = StdRng::seed_from_u64(5);
    let store = league(21);
    let engine = PredictionEngine::new(&store, EngineConfig::default()).unwrap();

    for fight in store.completed_fights().unwrap().iter().take(120) {
        let p = engine.predict_fight(fight.id).unwrap();
        assert!(p.probability_a > 0.0 && p.probability_a < 1.0);
        assert!(p.probability_b > 0.0 && p.probability_b < 1.0);
        assert_eq!(p.probability_a + p.probability_b, 1.0);
        assert!(p.win_probability >= 0.5);
        assert!(p.confidence >= engine_floor() && p.confidence <= 1.0);
        assert!(p.key_factors.len() <= 5);
    }

    for _ in 0..500 {
        let combined = rng.gen_range(-1.0..=1.0);
        let slope = rng.gen_range(0.01..=MAX_LOGISTIC_SLOPE);
        let (pa, pb) = win_probabilities(combined, slope);
        assert_eq!(pa + pb, 1.0);
        assert!(pa > 0.0 && pb > 0.0);
        assert!(pa.max(pb) <= 1.0 - PROB_EPSILON);
        assert_eq!(win_probabilities(-combined, slope), (pb, pa));
    }
}

fn engine_floor() -> f64 {
    ModelParams::default().confidence_floor
}

#[test]
fn extreme_physical_gap_never_reaches_certainty() {
    let mut store = MemoryStore::new();
    let mut giant = Fighter::new(1, "Giant");
    giant.height_cm = Some(230.0);
    giant.reach_cm = Some(240.0);
    giant.date_of_birth = Some(d(1994, 1, 1));
    giant.career.wins = 30;
    let mut small = Fighter::new(2, "Small");
    small.height_cm = Some(150.0);
    small.reach_cm = Some(150.0);
    small.date_of_birth = Some(d(1970, 1, 1));
    small.career.losses = 30;
    store.insert_fighter(giant);
    store.insert_fighter(small);

    let weights = PredictionWeights::new(0.0, 0.0, 0.0, 0.0, 1.0).unwrap();
    let params = ModelParams {
        logistic_slope: MAX_LOGISTIC_SLOPE,
        ..ModelParams::default()
    };
    let engine = PredictionEngine::new(store, EngineConfig::new(weights, params).unwrap()).unwrap();
    let p = engine.predict_matchup(1, 2, d(2024, 1, 1)).unwrap();
    assert!(p.probability_a < 1.0);
    assert!(p.probability_b > 0.0);
    assert_eq!(p.probability_a + p.probability_b, 1.0);
}

#[test]
fn same_inputs_same_prediction() {
    let one = PredictionEngine::new(league(8), EngineConfig::default()).unwrap();
    let two = PredictionEngine::new(league(8), EngineConfig::default()).unwrap();
    for id in [40, 80, 120, 160] {
        assert_eq!(one.predict_fight(id).unwrap(), two.predict_fight(id).unwrap());
    }
}

#[test]
fn more_defaulted_features_never_raise_confidence() {
    let store = league(13);
    let extractor = FeatureExtractor;
    let scorer = ConfidenceScorer::default();
    let as_of = d(2016, 3, 1);

    let fa = store.fighter(1).unwrap().unwrap();
    let fb = store.fighter(2).unwrap().unwrap();
    let history = store.fighter_history(1).unwrap();
    let snap = build_snapshot(&fa, &history, as_of);
    let mut a = extractor.extract(&fa, snap.as_ref(), as_of);
    let history = store.fighter_history(2).unwrap();
    let snap = build_snapshot(&fb, &history, as_of);
    let b = extractor.extract(&fb, snap.as_ref(), as_of);

    let mut last = scorer.score(&a, &b);
    for kind in FeatureKind::ALL {
        a.meta.defaulted.insert(kind);
        let next = scorer.score(&a, &b);
        assert!(next <= last, "{kind:?}: {next} > {last}");
        last = next;
    }

    // Confidence is independent of how lopsided the matchup is.
    let before = scorer.score(&a, &b);
    a.win_rate = 1.0;
    a.recent_form_score = 1.0;
    a.strike_differential = 8.0;
    assert_eq!(scorer.score(&a, &b), before);
}

fn fully_described(id: FighterId, name: &str, last_fight: NaiveDate) -> Fighter {
    let mut f = Fighter::new(id, name);
    f.date_of_birth = Some(d(1991, 6, 1));
    f.height_cm = Some(180.0);
    f.reach_cm = Some(185.0);
    f.career.wins = 9;
    f.career.losses = 4;
    f.career.striking_accuracy = Some(0.48);
    f.career.striking_defense = Some(0.55);
    f.career.strikes_landed_per_min = Some(4.1);
    f.career.strikes_absorbed_per_min = Some(3.2);
    f.career.takedown_accuracy = Some(0.4);
    f.career.takedown_defense = Some(0.7);
    f.career.takedowns_per_15 = Some(1.5);
    f.career.submissions_per_15 = Some(0.5);
    f.career.last_fight_date = Some(last_fight);
    f
}

fn fighter_field_removals() -> [fn(&mut Fighter); 13] {
    [
        |f| f.career.last_fight_date = None,
        |f| f.height_cm = None,
        |f| f.reach_cm = None,
        |f| f.date_of_birth = None,
        |f| f.career.striking_accuracy = None,
        |f| f.career.striking_defense = None,
        |f| f.career.strikes_landed_per_min = None,
        |f| f.career.strikes_absorbed_per_min = None,
        |f| f.career.takedown_accuracy = None,
        |f| f.career.takedown_defense = None,
        |f| f.career.takedowns_per_15 = None,
        |f| f.career.submissions_per_15 = None,
        |f| {
            f.career.wins = 0;
            f.career.losses = 0;
        },
    ]
}

#[test]
fn losing_a_layoff_opponents_last_fight_date_lowers_confidence() {
    let scorer = ConfidenceScorer::default();
    let as_of = d(2024, 1, 1);
    let long_layoff = fully_described(1, "Long Layoff", d(2019, 1, 1));
    let active = fully_described(2, "Active", d(2023, 10, 1));

    let score = |a: &Fighter, b: &Fighter| {
        scorer.score(
            &FeatureExtractor.extract(a, None, as_of),
            &FeatureExtractor.extract(b, None, as_of),
        )
    };
    let before = score(&long_layoff, &active);

    let mut undated = active.clone();
    undated.career.last_fight_date = None;
    assert!(score(&long_layoff, &undated) < before);

    let mut undated = long_layoff.clone();
    undated.career.last_fight_date = None;
    assert!(score(&undated, &active) < before);
}

#[test]
fn removing_raw_inputs_never_raises_confidence() {
    let mut rng = StdRng::seed_from_u64(99);
    let scorer = ConfidenceScorer::default();
    let as_of = d(2024, 1, 1);

    for _ in 0..60 {
        let mut a = fully_described(1, "Side A", as_of - Duration::days(rng.gen_range(1..3000)));
        let mut b = fully_described(2, "Side B", as_of - Duration::days(rng.gen_range(1..3000)));
        let mut removals: Vec<(bool, fn(&mut Fighter))> = fighter_field_removals()
            .into_iter()
            .flat_map(|strip| [(true, strip), (false, strip)])
            .collect();
        removals.shuffle(&mut rng);

        let extract = |f: &Fighter| FeatureExtractor.extract(f, None, as_of);
        let mut last = scorer.score(&extract(&a), &extract(&b));
        for (on_a, strip) in removals {
            strip(if on_a { &mut a } else { &mut b });
            let next = scorer.score(&extract(&a), &extract(&b));
            assert!(next <= last, "{next} > {last} after stripping a field");
            last = next;
        }
    }
}

#[test]
fn removing_snapshot_inputs_never_raises_confidence() {
    let store = league(13);
    let scorer = ConfidenceScorer::default();
    let as_of = store
        .completed_fights()
        .unwrap()
        .iter()
        .map(|f| f.date)
        .max()
        .unwrap();

    let removals: [fn(&mut FighterSnapshot); 8] = [
        |s| {
            s.last_fight_date = None;
            s.days_since_last_fight = None;
        },
        |s| s.striking = None,
        |s| s.grappling = None,
        |s| s.height_cm = None,
        |s| s.reach_cm = None,
        |s| s.age_years = None,
        |s| s.finish_rate = None,
        |s| s.recent_form.clear(),
    ];

    let mut checked = 0;
    for (ia, ib) in [(1, 2), (3, 4), (5, 6), (7, 8)] {
        let snap_of = |id: FighterId| {
            let fighter = store.fighter(id).unwrap().unwrap();
            let history = store.fighter_history(id).unwrap();
            let snap = build_snapshot(&fighter, &history, as_of);
            (fighter, snap)
        };
        let (fa, snap_a) = snap_of(ia);
        let (fb, snap_b) = snap_of(ib);
        let (Some(mut snap_a), Some(snap_b)) = (snap_a, snap_b) else {
            continue;
        };
        let fb_features = FeatureExtractor.extract(&fb, Some(&snap_b), as_of);

        let score = |snap: &FighterSnapshot| {
            scorer.score(&FeatureExtractor.extract(&fa, Some(snap), as_of), &fb_features)
        };

        let mut last = score(&snap_a);
        for strip in removals {
            strip(&mut snap_a);
            let next = score(&snap_a);
            assert!(next <= last, "fighter {ia}: {next} > {last}");
            last = next;
        }
        checked += 1;
    }
    assert!(checked > 0);
}
