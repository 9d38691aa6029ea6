use crate::error::AudioError;

/// Decoded multi-channel PCM audio, one sample vector per channel.
///
/// All channels have the same length. Samples are expected in [-1, 1];
/// the pipeline only reads from the buffer and never mutates it.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::ZeroSampleRate);
        }
        let expected = channels.first().ok_or(AudioError::NoChannels)?.len();
        if let Some((channel, found)) = channels
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != expected)
        {
            return Err(AudioError::RaggedChannels {
                channel,
                expected,
                found,
            });
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Single-channel convenience constructor.
    #[cfg(test)]
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self, AudioError> {
        Self::new(sample_rate, vec![samples])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }
}
