//! Rule-based scoring of a [`FeatureVector`] against three archetypes:
//! low-frequency biological calls, broadband biological calls, and
//! mechanical (vessel/engine) noise.
//!
//! Thresholds were tuned by hand against humpback, orca and boat-engine
//! recordings and are reproduced as fixed constants.

use super::{Classifier, ClipInput, Note, ScoreBreakdown, ScoreResult};
use crate::audio::features::FeatureVector;
use crate::error::ClassifyError;
use Metric::*;

const NEUTRAL_SCORE: i32 = 50;
/// Ceiling once mechanical noise is detected.
const NOISE_CEILING: i32 = 30;
/// Ceiling for clips with no mechanical noise.
const BIOLOGICAL_CEILING: i32 = 95;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Rms,
    LowRatio,
    MidRatio,
    HighRatio,
    Centroid,
    Flatness,
    LowPeakiness,
}

impl Metric {
    pub fn of(self, f: &FeatureVector) -> f64 {
        match self {
            Metric::Rms => f.rms,
            Metric::LowRatio => f.low_ratio,
            Metric::MidRatio => f.mid_ratio,
            Metric::HighRatio => f.high_ratio,
            Metric::Centroid => f.centroid,
            Metric::Flatness => f.flatness,
            Metric::LowPeakiness => f.low_peakiness,
        }
    }
}

/// Strict comparison against one or two limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bound {
    Above(f64),
    Below(f64),
    Within(f64, f64),
}

impl Bound {
    pub fn admits(self, value: f64) -> bool {
        match self {
            Bound::Above(limit) => value > limit,
            Bound::Below(limit) => value < limit,
            Bound::Within(lo, hi) => lo < value && value < hi,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Condition {
    pub metric: Metric,
    pub bound: Bound,
}

impl Condition {
    pub fn holds(&self, f: &FeatureVector) -> bool {
        self.bound.admits(self.metric.of(f))
    }
}

/// Points awarded when a condition holds. Penalties are negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tier {
    pub when: Condition,
    pub points: i32,
}

#[derive(Clone, Copy, Debug)]
pub enum Rule {
    /// Awarded whenever its condition holds.
    Each(Tier),
    /// Only the first matching tier is awarded.
    FirstOf(&'static [Tier]),
}

impl Rule {
    pub fn points(&self, f: &FeatureVector) -> i32 {
        match self {
            Rule::Each(tier) => {
                if tier.when.holds(f) {
                    tier.points
                } else {
                    0
                }
            }
            Rule::FirstOf(tiers) => tiers
                .iter()
                .find(|tier| tier.when.holds(f))
                .map_or(0, |tier| tier.points),
        }
    }
}

const fn above(metric: Metric, limit: f64, points: i32) -> Tier {
    Tier {
        when: Condition {
            metric,
            bound: Bound::Above(limit),
        },
        points,
    }
}

const fn below(metric: Metric, limit: f64, points: i32) -> Tier {
    Tier {
        when: Condition {
            metric,
            bound: Bound::Below(limit),
        },
        points,
    }
}

const fn within(metric: Metric, lo: f64, hi: f64, points: i32) -> Tier {
    Tier {
        when: Condition {
            metric,
            bound: Bound::Within(lo, hi),
        },
        points,
    }
}

const fn when(metric: Metric, bound: Bound) -> Condition {
    Condition { metric, bound }
}

/// Narrowband, tonal, low-frequency calls (humpback-like).
pub const LOW_FREQUENCY_RULES: &[Rule] = &[
    Rule::Each(above(LowRatio, 0.6, 10)),
    Rule::Each(above(LowRatio, 0.5, 6)),
    Rule::FirstOf(&[below(Flatness, 0.2, 12), below(Flatness, 0.3, 8)]),
    Rule::FirstOf(&[above(LowPeakiness, 3.5, 10), above(LowPeakiness, 2.5, 6)]),
    Rule::FirstOf(&[below(Centroid, 1000.0, 8), below(Centroid, 1500.0, 5)]),
    Rule::Each(below(MidRatio, 0.3, 5)),
];

/// Whistles and clicks spread over mid and high bands (orca-like).
pub const BROADBAND_RULES: &[Rule] = &[
    Rule::Each(within(HighRatio, 0.15, 0.4, 10)),
    Rule::Each(within(Flatness, 0.25, 0.55, 8)),
    Rule::Each(within(MidRatio, 0.25, 0.5, 8)),
    Rule::Each(within(LowRatio, 0.2, 0.6, 7)),
    Rule::Each(within(Centroid, 1000.0, 3000.0, 8)),
    Rule::Each(within(LowPeakiness, 1.5, 4.0, 5)),
    Rule::Each(within(Rms, 0.01, 0.08, 5)),
];

/// Mechanical noise is flagged when every condition of any group holds.
pub const NOISE_TRIGGERS: &[&[Condition]] = &[
    &[when(Flatness, Bound::Above(0.5))],
    &[when(Centroid, Bound::Above(2000.0)), when(LowPeakiness, Bound::Below(2.5))],
    &[when(MidRatio, Bound::Above(0.4)), when(Flatness, Bound::Above(0.45))],
    &[when(Rms, Bound::Above(0.08))],
];

/// Penalties applied once mechanical noise is flagged.
pub const NOISE_PENALTY_RULES: &[Rule] = &[
    Rule::FirstOf(&[
        above(Flatness, 0.7, -60),
        above(Flatness, 0.6, -50),
        above(Flatness, 0.5, -40),
        above(Flatness, 0.4, -30),
    ]),
    Rule::FirstOf(&[
        above(Centroid, 4000.0, -40),
        above(Centroid, 3000.0, -35),
        above(Centroid, 2500.0, -30),
        above(Centroid, 2000.0, -20),
    ]),
    Rule::FirstOf(&[
        below(LowPeakiness, 1.5, -30),
        below(LowPeakiness, 2.0, -25),
        below(LowPeakiness, 2.5, -15),
    ]),
    Rule::FirstOf(&[above(MidRatio, 0.5, -30), above(MidRatio, 0.4, -20)]),
    Rule::Each(above(HighRatio, 0.35, -25)),
    Rule::FirstOf(&[above(Rms, 0.15, -30), above(Rms, 0.1, -20), above(Rms, 0.08, -10)]),
];

pub fn sum_rules(rules: &[Rule], f: &FeatureVector) -> i32 {
    rules.iter().map(|rule| rule.points(f)).sum()
}

pub fn is_noise(f: &FeatureVector) -> bool {
    NOISE_TRIGGERS
        .iter()
        .any(|group| group.iter().all(|condition| condition.holds(f)))
}

/// Score a feature vector. Total over every finite input.
pub fn score_features(f: &FeatureVector) -> ScoreResult {
    let low_frequency_bonus = sum_rules(LOW_FREQUENCY_RULES, f);
    let broadband_bonus = sum_rules(BROADBAND_RULES, f);
    let is_noise = is_noise(f);
    let noise_penalty = if is_noise {
        sum_rules(NOISE_PENALTY_RULES, f)
    } else {
        0
    };

    let mut score = NEUTRAL_SCORE + low_frequency_bonus.max(broadband_bonus) + noise_penalty;
    if is_noise {
        score = score.min(NOISE_CEILING);
    } else {
        score = score.min(BIOLOGICAL_CEILING);
    }
    let score = score.clamp(0, 100) as u8;

    log::debug!(
        "Heuristic: low_freq={} broadband={} noise={} penalty={} -> {}",
        low_frequency_bonus,
        broadband_bonus,
        is_noise,
        noise_penalty,
        score
    );

    ScoreResult {
        score,
        note: Note::for_score(score).message().to_string(),
        breakdown: Some(ScoreBreakdown {
            low_frequency_bonus,
            broadband_bonus,
            noise_penalty,
            is_noise,
        }),
    }
}

/// Local rule-based classifier; never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    /// Infallible form of [`Classifier::classify`].
    pub fn score(&self, input: &ClipInput<'_>) -> ScoreResult {
        score_features(input.features)
    }
}

impl Classifier for HeuristicClassifier {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn classify(&self, input: &ClipInput<'_>) -> Result<ScoreResult, ClassifyError> {
        Ok(self.score(input))
    }
}
