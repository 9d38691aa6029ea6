pub mod heuristic;
pub mod remote;

use serde::{Deserialize, Serialize};

use crate::audio::decode::EncodedClip;
use crate::audio::features::FeatureVector;
use crate::error::ClassifyError;

pub use heuristic::HeuristicClassifier;
pub use remote::RemoteClassifier;

/// Everything a classifier may look at for one clip.
pub struct ClipInput<'a> {
    pub features: &'a FeatureVector,
    /// Original encoded bytes, when the clip came from a file.
    pub encoded: Option<&'a EncodedClip>,
}

/// Scoring strategy. Implementations must be safe to share across
/// batch worker threads.
pub trait Classifier: Send + Sync {
    /// Short identifier reported alongside the result.
    fn name(&self) -> &'static str;

    fn classify(&self, input: &ClipInput<'_>) -> Result<ScoreResult, ClassifyError>;
}

/// Environmental health score (0-100) and its explanation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: u8,
    pub note: String,
    #[serde(flatten)]
    pub breakdown: Option<ScoreBreakdown>,
}

/// Sub-scores behind a result.
///
/// Remote servers report the same quantities under archetype-specific
/// names, which are accepted as aliases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    #[serde(alias = "humpbackScore")]
    pub low_frequency_bonus: i32,
    #[serde(alias = "orcaScore")]
    pub broadband_bonus: i32,
    #[serde(alias = "boatPenalty")]
    pub noise_penalty: i32,
    #[serde(alias = "isBoat")]
    pub is_noise: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Note {
    High,
    Medium,
    Low,
}

impl Note {
    pub fn for_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => Note::High,
            40..=79 => Note::Medium,
            _ => Note::Low,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Note::High => "High: Strong marine mammal vocalizations detected (healthy environment).",
            Note::Medium => "Medium: Moderate marine activity or mixed signals with some noise.",
            Note::Low => {
                "Low: Significant pollution (boat/engine noise) or minimal biological activity."
            }
        }
    }
}
