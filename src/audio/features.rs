use serde::{Deserialize, Serialize};

use super::fft::MagnitudeSpectrum;

/// Floor applied to every denominator and to magnitudes before `ln`.
pub const EPSILON: f64 = 1e-12;

/// Upper edge of the low band (Hz, exclusive).
pub const LOW_BAND_HZ: f64 = 300.0;
/// Upper edge of the mid band (Hz, exclusive); everything above is high.
pub const MID_BAND_HZ: f64 = 3000.0;

/// Unrounded spectral statistics, straight from the magnitude spectrum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralStats {
    pub rms: f64,
    pub low_ratio: f64,
    pub mid_ratio: f64,
    pub high_ratio: f64,
    pub centroid: f64,
    pub flatness: f64,
    pub low_peakiness: f64,
}

/// Compact per-clip feature vector, rounded for presentation stability.
///
/// This is the classifier's input and part of the output contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub rms: f64,
    pub low_ratio: f64,
    pub mid_ratio: f64,
    pub high_ratio: f64,
    /// Hz
    pub centroid: f64,
    pub flatness: f64,
    pub low_peakiness: f64,
}

impl SpectralStats {
    pub fn rounded(&self) -> FeatureVector {
        FeatureVector {
            rms: round_to(self.rms, 4),
            low_ratio: round_to(self.low_ratio, 3),
            mid_ratio: round_to(self.mid_ratio, 3),
            high_ratio: round_to(self.high_ratio, 3),
            centroid: self.centroid.round(),
            flatness: round_to(self.flatness, 3),
            low_peakiness: round_to(self.low_peakiness, 2),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Compute every statistic over `spectrum`; `rms` is passed through.
pub fn spectral_stats(spectrum: &MagnitudeSpectrum, rms: f64) -> SpectralStats {
    let (low_ratio, mid_ratio, high_ratio) = band_ratios(spectrum);
    SpectralStats {
        rms,
        low_ratio,
        mid_ratio,
        high_ratio,
        centroid: spectral_centroid(spectrum),
        flatness: spectral_flatness(spectrum.magnitudes()),
        low_peakiness: low_peakiness(spectrum),
    }
}

pub fn extract(spectrum: &MagnitudeSpectrum, rms: f64) -> FeatureVector {
    spectral_stats(spectrum, rms).rounded()
}

/// Share of squared-magnitude energy in the low, mid and high bands.
pub fn band_ratios(spectrum: &MagnitudeSpectrum) -> (f64, f64, f64) {
    let (mut low, mut mid, mut high) = (0.0f64, 0.0f64, 0.0f64);
    for (freq, mag) in spectrum.bins() {
        let energy = mag * mag;
        if freq < LOW_BAND_HZ {
            low += energy;
        } else if freq < MID_BAND_HZ {
            mid += energy;
        } else {
            high += energy;
        }
    }
    let total = (low + mid + high).max(EPSILON);
    (low / total, mid / total, high / total)
}

/// Magnitude-weighted mean frequency in Hz.
pub fn spectral_centroid(spectrum: &MagnitudeSpectrum) -> f64 {
    let (weighted, sum) = spectrum
        .bins()
        .fold((0.0f64, 0.0f64), |(w, s), (freq, mag)| (w + freq * mag, s + mag));
    weighted / sum.max(EPSILON)
}

/// Geometric over arithmetic mean, in [0, 1].
///
/// Magnitudes are floored at [`EPSILON`], so an all-zero spectrum counts
/// as constant and yields 1. An empty spectrum yields 0.
pub fn spectral_flatness(magnitudes: &[f64]) -> f64 {
    if magnitudes.is_empty() {
        return 0.0;
    }
    let n = magnitudes.len() as f64;
    let (log_sum, sum) = magnitudes.iter().fold((0.0f64, 0.0f64), |(l, s), &mag| {
        let mag = mag.max(EPSILON);
        (l + mag.ln(), s + mag)
    });
    let geometric = (log_sum / n).exp();
    // Floor, not `+ EPSILON`: adding would rate an all-zero spectrum 0.5.
    let arithmetic = (sum / n).max(EPSILON);
    (geometric / arithmetic).clamp(0.0, 1.0)
}

/// Peak over mean magnitude among the sub-300 Hz bins; 0 without any.
pub fn low_peakiness(spectrum: &MagnitudeSpectrum) -> f64 {
    let (count, sum, max) = spectrum
        .bins()
        .take_while(|&(freq, _)| freq < LOW_BAND_HZ)
        .fold((0usize, 0.0f64, 0.0f64), |(c, s, m), (_, mag)| {
            (c + 1, s + mag, m.max(mag))
        });
    if count == 0 {
        return 0.0;
    }
    max / (sum / count as f64).max(EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fft::magnitude_spectrum;
    use crate::audio::preprocess::apply_hann;
    use std::f64::consts::PI;

    fn sine_spectrum(freq: f64, sample_rate: u32, len: usize) -> MagnitudeSpectrum {
        let samples: Vec<f64> = (0..len)
            .map(|i| 0.1 * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin())
            .collect();
        magnitude_spectrum(&apply_hann(&samples), sample_rate)
    }

    #[test]
    fn energy_ratios_partition_unity() {
        for &freq in &[60.0, 280.0, 1_200.0, 2_999.0, 8_000.0] {
            let stats = spectral_stats(&sine_spectrum(freq, 44_100, 8_192), 0.07);
            let total = stats.low_ratio + stats.mid_ratio + stats.high_ratio;
            assert!((total - 1.0).abs() < 1e-6, "{freq} Hz: ratios sum to {total}");
        }
    }

    #[test]
    fn tone_lands_in_its_band() {
        let low = spectral_stats(&sine_spectrum(120.0, 44_100, 16_384), 0.0);
        assert!(low.low_ratio > 0.99);
        let mid = spectral_stats(&sine_spectrum(1_000.0, 44_100, 16_384), 0.0);
        assert!(mid.mid_ratio > 0.99);
        let high = spectral_stats(&sine_spectrum(6_000.0, 44_100, 16_384), 0.0);
        assert!(high.high_ratio > 0.99);
    }

    #[test]
    fn centroid_tracks_tone_frequency() {
        let stats = spectral_stats(&sine_spectrum(1_000.0, 44_100, 16_384), 0.0);
        assert!((stats.centroid - 1_000.0).abs() < 50.0, "centroid {}", stats.centroid);
    }

    #[test]
    fn flatness_bounds() {
        assert_eq!(spectral_flatness(&[]), 0.0);
        assert!((spectral_flatness(&[0.0; 32]) - 1.0).abs() < 1e-9);
        assert!((spectral_flatness(&[0.3; 32]) - 1.0).abs() < 1e-9);

        let mut peaky = vec![0.0; 512];
        peaky[10] = 5.0;
        let tonal = spectral_flatness(&peaky);
        assert!((0.0..0.01).contains(&tonal), "tonal flatness {tonal}");
    }

    #[test]
    fn silence_degrades_to_defined_values() {
        let spectrum = magnitude_spectrum(&vec![0.0; 4_096], 44_100);
        let stats = spectral_stats(&spectrum, 0.0);
        assert_eq!(stats.low_ratio, 0.0);
        assert_eq!(stats.mid_ratio, 0.0);
        assert_eq!(stats.high_ratio, 0.0);
        assert_eq!(stats.centroid, 0.0);
        assert!(stats.flatness.is_finite());
        assert!(stats.low_peakiness.is_finite());
    }

    #[test]
    fn peakiness_of_lone_low_bin_is_one() {
        // 2 kHz bins: only the DC bin is low, so peak equals mean.
        let spectrum = magnitude_spectrum(&[1.0, 1.0, 1.0, 1.0], 8_000);
        assert_eq!(spectrum.len(), 2);
        assert!((low_peakiness(&spectrum) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn peakiness_is_zero_for_empty_spectrum() {
        // The DC bin is always low, so only an empty spectrum has no low bins.
        for input in [&[][..], &[0.5][..]] {
            let spectrum = magnitude_spectrum(input, 8_000);
            assert!(spectrum.is_empty());
            assert_eq!(low_peakiness(&spectrum), 0.0);
        }
    }

    #[test]
    fn narrow_low_tone_is_peaky() {
        let stats = spectral_stats(&sine_spectrum(150.0, 44_100, 16_384), 0.0);
        assert!(stats.low_peakiness > 3.5, "peakiness {}", stats.low_peakiness);
    }

    #[test]
    fn rounding_precision() {
        let stats = SpectralStats {
            rms: 0.123456,
            low_ratio: 0.33349,
            mid_ratio: 0.33351,
            high_ratio: 0.333,
            centroid: 1234.5678,
            flatness: 0.0004,
            low_peakiness: 3.14159,
        };
        let v = stats.rounded();
        assert_eq!(v.rms, 0.1235);
        assert_eq!(v.low_ratio, 0.333);
        assert_eq!(v.mid_ratio, 0.334);
        assert_eq!(v.centroid, 1235.0);
        assert_eq!(v.flatness, 0.0);
        assert_eq!(v.low_peakiness, 3.14);
    }
}
