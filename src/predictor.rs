use serde::{Deserialize, Serialize};

use crate::features::FighterFeatures;
use crate::model::{ResultMethod, Side};
use crate::weights::{Category, PredictionWeights};

/// Keeps the favourite's probability strictly below 1 for any slope.
pub const PROB_EPSILON: f64 = 1e-6;

// Component shares inside each category. Each row sums to 1.
const RECORD_WIN_RATE: f64 = 0.48;
const RECORD_EXPERIENCE: f64 = 0.32;
const RECORD_FINISH: f64 = 0.20;

const STRIKING_EXCHANGE: f64 = 0.60;
const STRIKING_DIFFERENTIAL: f64 = 0.40;

const GRAPPLING_EXCHANGE: f64 = 0.65;
const GRAPPLING_OFFENSE: f64 = 0.35;

const FORM_RECENT: f64 = 0.50;
const FORM_STREAK: f64 = 0.25;
const FORM_ACTIVITY: f64 = 0.25;

const PHYSICAL_REACH: f64 = 0.50;
const PHYSICAL_HEIGHT: f64 = 0.30;
const PHYSICAL_AGE: f64 = 0.20;

// Normalization scales.
const STRIKE_DIFF_SCALE: f64 = 5.0;
const GRAPPLING_OFFENSE_SCALE: f64 = 10.0;
const STREAK_SCALE: f64 = 6.0;
const REACH_SCALE_CM: f64 = 10.0;
const HEIGHT_SCALE_CM: f64 = 15.0;

const LIMITED_HISTORY_FIGHTS: u32 = 3;

/// Signed advantage of fighter A over fighter B per category, each in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvantageBreakdown {
    pub record: f64,
    pub striking: f64,
    pub grappling: f64,
    pub form: f64,
    pub physical: f64,
}

impl AdvantageBreakdown {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Record => self.record,
            Category::Striking => self.striking,
            Category::Grappling => self.grappling,
            Category::Form => self.form,
            Category::Physical => self.physical,
        }
    }

    /// Weighted sum over all categories, in [-1, 1] for normalized weights.
    pub fn combined(&self, weights: &PredictionWeights) -> f64 {
        Category::ALL
            .iter()
            .map(|c| weights.weight(*c) * self.get(*c))
            .sum::<f64>()
            .clamp(-1.0, 1.0)
    }

    pub fn mirrored(&self) -> Self {
        Self {
            record: -self.record,
            striking: -self.striking,
            grappling: -self.grappling,
            form: -self.form,
            physical: -self.physical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: ResultMethod,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub winner: Side,
    pub probability_a: f64,
    pub probability_b: f64,
    pub combined: f64,
    pub breakdown: AdvantageBreakdown,
    pub factors: Vec<String>,
    pub warnings: Vec<String>,
    pub method: MethodCall,
}

impl Verdict {
    pub fn winner_probability(&self) -> f64 {
        match self.winner {
            Side::A => self.probability_a,
            Side::B => self.probability_b,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RuleBasedPredictor {
    weights: PredictionWeights,
    logistic_slope: f64,
}

impl RuleBasedPredictor {
    pub fn new(weights: PredictionWeights, logistic_slope: f64) -> Self {
        Self {
            weights,
            logistic_slope,
        }
    }

    pub fn weights(&self) -> &PredictionWeights {
        &self.weights
    }

    /// Scores A against B. A zero combined advantage is a coin flip and is reported as a
    /// win for fighter A by convention.
    pub fn predict(&self, a: &FighterFeatures, b: &FighterFeatures) -> Verdict {
        let breakdown = advantages(a, b);
        let combined = breakdown.combined(&self.weights);
        let (probability_a, probability_b) = win_probabilities(combined, self.logistic_slope);
        let winner = if combined >= 0.0 { Side::A } else { Side::B };

        Verdict {
            winner,
            probability_a,
            probability_b,
            combined,
            breakdown,
            factors: key_factors(a, b, &breakdown),
            warnings: history_warnings(a, b),
            method: predict_method(a, b),
        }
    }
}

/// Per-category advantages of A over B. Every component is antisymmetric, so swapping
/// the arguments negates each value exactly.
pub fn advantages(a: &FighterFeatures, b: &FighterFeatures) -> AdvantageBreakdown {
    let record = RECORD_WIN_RATE * (a.win_rate - b.win_rate)
        + RECORD_EXPERIENCE * (a.experience_score - b.experience_score)
        + RECORD_FINISH * (a.finish_rate - b.finish_rate);

    let strike_exchange = exchange_edge(
        a.striking_accuracy,
        a.striking_defense,
        b.striking_accuracy,
        b.striking_defense,
    );
    let strike_diff = scaled(a.strike_differential - b.strike_differential, STRIKE_DIFF_SCALE);
    let striking = STRIKING_EXCHANGE * strike_exchange + STRIKING_DIFFERENTIAL * strike_diff;

    let td_exchange = exchange_edge(
        a.takedown_accuracy,
        a.takedown_defense,
        b.takedown_accuracy,
        b.takedown_defense,
    );
    let offense = scaled(
        (a.takedowns_per_15 + a.submissions_per_15) - (b.takedowns_per_15 + b.submissions_per_15),
        GRAPPLING_OFFENSE_SCALE,
    );
    let grappling = GRAPPLING_EXCHANGE * td_exchange + GRAPPLING_OFFENSE * offense;

    let net_streak = |f: &FighterFeatures| f64::from(f.win_streak) - f64::from(f.loss_streak);
    let form = FORM_RECENT * scaled(a.recent_form_score - b.recent_form_score, 2.0)
        + FORM_STREAK * scaled(net_streak(a) - net_streak(b), STREAK_SCALE)
        + FORM_ACTIVITY * (a.activity_score - b.activity_score);

    let physical = PHYSICAL_REACH * paired_diff(a.reach_cm, b.reach_cm, REACH_SCALE_CM)
        + PHYSICAL_HEIGHT * paired_diff(a.height_cm, b.height_cm, HEIGHT_SCALE_CM)
        + PHYSICAL_AGE * age_advantage(a.age_years, b.age_years);

    AdvantageBreakdown {
        record: record.clamp(-1.0, 1.0),
        striking: striking.clamp(-1.0, 1.0),
        grappling: grappling.clamp(-1.0, 1.0),
        form: form.clamp(-1.0, 1.0),
        physical: physical.clamp(-1.0, 1.0),
    }
}

/// Logistic mapping of the combined advantage to (P(A), P(B)).
///
/// The favourite's probability is computed from |combined| and the underdog's as its
/// complement, so the pair always sums to exactly 1.0 and mirrors exactly when the
/// fighters are swapped.
pub fn win_probabilities(combined: f64, slope: f64) -> (f64, f64) {
    if !combined.is_finite() || combined == 0.0 {
        return (0.5, 0.5);
    }
    let x = combined.abs().min(1.0);
    let favourite = (1.0 / (1.0 + (-slope * x).exp())).clamp(0.5, 1.0 - PROB_EPSILON);
    let underdog = 1.0 - favourite;
    if combined > 0.0 {
        (favourite, underdog)
    } else {
        (underdog, favourite)
    }
}

// (own accuracy - opponent defense) for A, minus the same for B.
fn exchange_edge(acc_a: f64, def_a: f64, acc_b: f64, def_b: f64) -> f64 {
    ((acc_a - def_b) - (acc_b - def_a)).clamp(-1.0, 1.0)
}

fn scaled(diff: f64, scale: f64) -> f64 {
    (diff / scale).clamp(-1.0, 1.0)
}

fn paired_diff(a: Option<f64>, b: Option<f64>, scale: f64) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => scaled(a - b, scale),
        _ => 0.0,
    }
}

fn age_advantage(a: Option<f64>, b: Option<f64>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => prime_age_score(a) - prime_age_score(b),
        _ => 0.0,
    }
}

// 1.0 inside the 28-32 prime, tapering on both sides.
fn prime_age_score(age: f64) -> f64 {
    let score = if (28.0..=32.0).contains(&age) {
        1.0
    } else if age < 28.0 {
        0.8 + (age - 22.0) * 0.033
    } else {
        1.0 - (age - 32.0) * 0.05
    };
    score.clamp(0.0, 1.0)
}

fn key_factors(a: &FighterFeatures, b: &FighterFeatures, breakdown: &AdvantageBreakdown) -> Vec<String> {
    let mut factors = Vec::new();
    let better = |edge: f64| {
        if edge > 0.0 {
            a.fighter_name.as_str()
        } else {
            b.fighter_name.as_str()
        }
    };

    let win_rate_edge = a.win_rate - b.win_rate;
    if win_rate_edge.abs() >= 0.15 {
        factors.push(format!("{} has the better win rate", better(win_rate_edge)));
    }
    if breakdown.striking.abs() >= 0.15 {
        factors.push(format!("{} has the striking advantage", better(breakdown.striking)));
    }
    if breakdown.grappling.abs() >= 0.15 {
        factors.push(format!("{} has the grappling advantage", better(breakdown.grappling)));
    }
    if a.win_streak >= 3 {
        factors.push(format!("{} is on a {}-fight win streak", a.fighter_name, a.win_streak));
    } else if b.win_streak >= 3 {
        factors.push(format!("{} is on a {}-fight win streak", b.fighter_name, b.win_streak));
    }
    if let (Some(ra), Some(rb)) = (a.reach_cm, b.reach_cm) {
        let diff = ra - rb;
        if diff.abs() >= 10.0 {
            factors.push(format!("{} has a significant reach advantage", better(diff)));
        }
    }
    factors
}

fn history_warnings(a: &FighterFeatures, b: &FighterFeatures) -> Vec<String> {
    [a, b]
        .into_iter()
        .filter(|f| f.total_fights < LIMITED_HISTORY_FIGHTS)
        .map(|f| format!("{} has limited fight history", f.fighter_name))
        .collect()
}

fn predict_method(a: &FighterFeatures, b: &FighterFeatures) -> MethodCall {
    let avg_ko = (a.ko_rate + b.ko_rate) / 2.0;
    let avg_sub = (a.submission_rate + b.submission_rate) / 2.0;
    let avg_finish = (a.finish_rate + b.finish_rate) / 2.0;

    let (method, probability) = if avg_finish < 0.3 {
        (ResultMethod::Decision, 0.6)
    } else if avg_ko > avg_sub && avg_ko > 0.3 {
        (ResultMethod::KoTko, (avg_ko + 0.2).min(0.7))
    } else if avg_sub > 0.25 {
        (ResultMethod::Submission, (avg_sub + 0.15).min(0.6))
    } else {
        (ResultMethod::Decision, 0.5)
    };
    MethodCall {
        method,
        probability,
    }
}
