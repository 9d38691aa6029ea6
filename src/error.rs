use thiserror::Error;

/// Failures while obtaining or validating decoded audio.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("sample rate must be positive")]
    ZeroSampleRate,

    #[error("audio buffer has no channels")]
    NoChannels,

    #[error("channel {channel} has {found} samples, expected {expected}")]
    RaggedChannels {
        channel: usize,
        expected: usize,
        found: usize,
    },

    #[error("empty audio")]
    Empty,

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode audio: {0}")]
    Decode(String),

    #[error("no audio tracks found")]
    NoTrack,
}

impl AudioError {
    /// True for every failure the user should see as "no audio available".
    pub fn is_no_audio(&self) -> bool {
        matches!(
            self,
            AudioError::Empty | AudioError::Io { .. } | AudioError::Decode(_) | AudioError::NoTrack
        )
    }
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        AudioError::Decode(err.to_string())
    }
}

/// Failures of a classifier strategy. All of them are recoverable by
/// falling back to the local heuristic.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("remote classifier unreachable: {0}")]
    Transport(String),

    #[error("remote classifier returned HTTP {status}")]
    Status { status: u16 },

    #[error("remote classifier reported an error: {0}")]
    Reported(String),

    #[error("malformed classifier response: {0}")]
    Malformed(String),

    #[error("classifier needs the encoded clip, none was supplied")]
    MissingClip,
}

impl From<reqwest::Error> for ClassifyError {
    fn from(err: reqwest::Error) -> Self {
        ClassifyError::Transport(err.to_string())
    }
}
