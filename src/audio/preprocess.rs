use super::buffer::AudioBuffer;

/// Maximum number of samples per channel examined by the analysis.
pub const WINDOW_SIZE: usize = 16384;

/// Mono analysis window taken from the head of a clip.
///
/// Length is `min(frames, WINDOW_SIZE)`. Samples are stored unwindowed;
/// [`AnalysisWindow::windowed`] yields the tapered copy fed to the FFT.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisWindow {
    samples: Vec<f64>,
}

impl AnalysisWindow {
    #[cfg(test)]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Hann-tapered copy of the window.
    pub fn windowed(&self) -> Vec<f64> {
        apply_hann(&self.samples)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Preprocessed {
    pub mono: AnalysisWindow,
    pub rms: f64,
}

pub fn preprocess(buffer: &AudioBuffer) -> Preprocessed {
    Preprocessed {
        mono: mix_to_mono(buffer),
        rms: compute_rms(buffer),
    }
}

/// RMS over every channel's first `WINDOW_SIZE` samples.
pub fn compute_rms(buffer: &AudioBuffer) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for channel in buffer.channels() {
        for &s in channel.iter().take(WINDOW_SIZE) {
            let s = s as f64;
            sum += s * s;
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).sqrt()
}

/// Average of the first two channels; extra channels are ignored.
pub fn mix_to_mono(buffer: &AudioBuffer) -> AnalysisWindow {
    let len = buffer.frames().min(WINDOW_SIZE);
    let left = &buffer.channel(0)[..len];
    let samples = if buffer.channel_count() > 1 {
        let right = &buffer.channel(1)[..len];
        left.iter()
            .zip(right)
            .map(|(&l, &r)| (l as f64 + r as f64) * 0.5)
            .collect()
    } else {
        left.iter().map(|&s| s as f64).collect()
    };
    AnalysisWindow { samples }
}

pub fn hann_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

pub fn apply_hann(samples: &[f64]) -> Vec<f64> {
    samples
        .iter()
        .zip(hann_window(samples.len()))
        .map(|(s, w)| s * w)
        .collect()
}
