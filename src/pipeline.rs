use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;

use crate::audio::buffer::AudioBuffer;
use crate::audio::decode::{decode_file, EncodedClip};
use crate::audio::features::{self, FeatureVector};
use crate::audio::fft::magnitude_spectrum;
use crate::audio::preprocess::{preprocess, WINDOW_SIZE};
use crate::classify::{Classifier, ClipInput, HeuristicClassifier, ScoreResult};
use crate::error::AudioError;

/// Feature vector plus score for one clip.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub features: FeatureVector,
    #[serde(flatten)]
    pub result: ScoreResult,
    /// Name of the classifier that produced `result`.
    pub classifier: &'static str,
    /// Why the remote classifier was bypassed, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Outcome of analysing one file in a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub report: Result<AnalysisReport, AudioError>,
}

/// Preprocess, transform and extract features from a decoded buffer.
pub fn extract_features(buffer: &AudioBuffer) -> FeatureVector {
    let pre = preprocess(buffer);
    let spectrum = magnitude_spectrum(&pre.mono.windowed(), buffer.sample_rate());
    let features = features::extract(&spectrum, pre.rms);
    log::debug!(
        "Features: window={} fft={} {:?}",
        pre.mono.len(),
        spectrum.fft_size(),
        features
    );
    features
}

/// Runs the pipeline, scoring with an optional primary classifier and
/// falling back to the local heuristic whenever the primary fails.
pub struct Analyzer {
    primary: Option<Box<dyn Classifier>>,
    local: HeuristicClassifier,
}

impl Analyzer {
    pub fn local() -> Self {
        Self {
            primary: None,
            local: HeuristicClassifier,
        }
    }

    pub fn with_primary(primary: Box<dyn Classifier>) -> Self {
        Self {
            primary: Some(primary),
            local: HeuristicClassifier,
        }
    }

    pub fn primary_name(&self) -> Option<&'static str> {
        self.primary.as_ref().map(|c| c.name())
    }

    pub fn analyze(&self, buffer: &AudioBuffer, encoded: Option<&EncodedClip>) -> AnalysisReport {
        let features = extract_features(buffer);
        let input = ClipInput {
            features: &features,
            encoded,
        };

        let mut fallback_reason = None;
        if let Some(primary) = &self.primary {
            match primary.classify(&input) {
                Ok(result) => {
                    return AnalysisReport {
                        features,
                        result,
                        classifier: primary.name(),
                        fallback_reason: None,
                    };
                }
                Err(err) => {
                    log::warn!("{} classifier failed, using local heuristic: {}", primary.name(), err);
                    fallback_reason = Some(err.to_string());
                }
            }
        }

        let result = self.local.score(&input);
        AnalysisReport {
            features,
            result,
            classifier: self.local.name(),
            fallback_reason,
        }
    }

    /// Decode and analyse a file. Empty or undecodable audio is an error.
    ///
    /// Only the first `WINDOW_SIZE` frames are decoded.
    pub fn analyze_file(&self, path: &Path) -> Result<AnalysisReport, AudioError> {
        let (buffer, clip) = decode_file(path, Some(WINDOW_SIZE))?;
        if buffer.is_empty() {
            return Err(AudioError::Empty);
        }
        Ok(self.analyze(&buffer, Some(&clip)))
    }

    /// Analyse files in parallel; per-file failures never abort the batch.
    pub fn analyze_batch(&self, paths: &[PathBuf], progress: Option<&ProgressBar>) -> Vec<FileOutcome> {
        paths
            .par_iter()
            .map(|path| {
                let report = self.analyze_file(path);
                if let Err(ref err) = report {
                    log::error!("{}: {}", path.display(), err);
                }
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                FileOutcome {
                    path: path.clone(),
                    report,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::wav_bytes;
    use crate::classify::Note;
    use crate::error::ClassifyError;
    use std::f64::consts::PI;

    const SR: u32 = 44_100;

    fn sine(freq: f64, amplitude: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / SR as f64).sin()) as f32)
            .collect()
    }

    /// Deterministic uniform noise in [-amplitude, amplitude].
    fn noise(amplitude: f64, len: usize, mut state: u64) -> Vec<f32> {
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
                (amplitude * (2.0 * unit - 1.0)) as f32
            })
            .collect()
    }

    struct Fixed(Result<u8, ()>);

    impl Classifier for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn classify(&self, _input: &ClipInput<'_>) -> Result<ScoreResult, ClassifyError> {
            match self.0 {
                Ok(score) => Ok(ScoreResult {
                    score,
                    note: Note::for_score(score).message().to_string(),
                    breakdown: None,
                }),
                Err(()) => Err(ClassifyError::Status { status: 500 }),
            }
        }
    }

    #[test]
    fn pure_low_tone_scores_as_biological() {
        let amplitude = 0.05 * std::f64::consts::SQRT_2;
        let buffer = AudioBuffer::mono(SR, sine(150.0, amplitude, SR as usize)).unwrap();
        let report = Analyzer::local().analyze(&buffer, None);

        let f = report.features;
        assert!((f.rms - 0.05).abs() < 0.002, "rms {}", f.rms);
        assert!(f.low_ratio > 0.9, "low ratio {}", f.low_ratio);
        assert!(f.flatness < 0.2, "flatness {}", f.flatness);

        let breakdown = report.result.breakdown.unwrap();
        assert!(!breakdown.is_noise);
        assert_eq!(breakdown.low_frequency_bonus, 51);
        assert!((80..=95).contains(&report.result.score), "score {}", report.result.score);
        assert_eq!(report.classifier, "heuristic");
    }

    #[test]
    fn broadband_noise_is_capped() {
        let amplitude = 0.12 * 3f64.sqrt();
        let buffer = AudioBuffer::mono(SR, noise(amplitude, SR as usize, 0x9E37_79B9_7F4A_7C15)).unwrap();
        let report = Analyzer::local().analyze(&buffer, None);

        assert!(report.features.flatness > 0.7, "flatness {}", report.features.flatness);
        assert!((report.features.rms - 0.12).abs() < 0.01, "rms {}", report.features.rms);
        assert!(report.result.breakdown.unwrap().is_noise);
        assert!(report.result.score <= 30);
        assert_eq!(report.result.note, Note::Low.message());
    }

    #[test]
    fn silence_is_scored_without_error() {
        let buffer = AudioBuffer::new(SR, vec![vec![0.0; 20_000], vec![0.0; 20_000]]).unwrap();
        let report = Analyzer::local().analyze(&buffer, None);
        assert_eq!(report.features.rms, 0.0);
        assert!(report.result.score <= 100);
        assert!(report.features.flatness >= 0.0 && report.features.flatness <= 1.0);
    }

    #[test]
    fn zero_length_buffer_is_scored_without_error() {
        let buffer = AudioBuffer::mono(SR, Vec::new()).unwrap();
        let report = Analyzer::local().analyze(&buffer, None);
        assert_eq!(report.features, FeatureVector::default());
        assert!(report.result.score <= 100);
    }

    #[test]
    fn analysis_is_deterministic() {
        let mut samples = sine(440.0, 0.1, 30_000);
        for (s, n) in samples.iter_mut().zip(noise(0.02, 30_000, 7)) {
            *s += n;
        }
        let buffer = AudioBuffer::new(SR, vec![samples.clone(), samples]).unwrap();
        let analyzer = Analyzer::local();
        assert_eq!(analyzer.analyze(&buffer, None), analyzer.analyze(&buffer, None));
    }

    #[test]
    fn rounded_ratios_stay_near_unity() {
        let buffer = AudioBuffer::mono(SR, noise(0.1, 16_384, 42)).unwrap();
        let f = extract_features(&buffer);
        let total = f.low_ratio + f.mid_ratio + f.high_ratio;
        assert!((total - 1.0).abs() <= 0.002, "ratios sum to {total}");
    }

    #[test]
    fn primary_result_is_used_when_it_succeeds() {
        let buffer = AudioBuffer::mono(SR, sine(150.0, 0.07, 4_096)).unwrap();
        let report = Analyzer::with_primary(Box::new(Fixed(Ok(12)))).analyze(&buffer, None);
        assert_eq!(report.result.score, 12);
        assert_eq!(report.classifier, "fixed");
        assert!(report.fallback_reason.is_none());
    }

    #[test]
    fn falls_back_to_heuristic_when_primary_fails() {
        let buffer = AudioBuffer::mono(SR, sine(150.0, 0.07, 4_096)).unwrap();
        let report = Analyzer::with_primary(Box::new(Fixed(Err(())))).analyze(&buffer, None);
        let local = Analyzer::local().analyze(&buffer, None);
        assert_eq!(report.classifier, "heuristic");
        assert_eq!(report.result, local.result);

        let direct = HeuristicClassifier
            .classify(&ClipInput {
                features: &report.features,
                encoded: None,
            })
            .unwrap();
        assert_eq!(report.result, direct);
        assert!(report.fallback_reason.unwrap().contains("500"));
    }

    #[test]
    fn falls_back_when_remote_is_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let remote = crate::classify::RemoteClassifier::new(
            format!("http://127.0.0.1:{port}/analyze"),
            std::time::Duration::from_secs(2),
        )
        .unwrap();

        let dir = std::env::temp_dir().join(format!("marinescore-remote-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tone.wav");
        std::fs::write(&path, wav_bytes(SR, &[sine(150.0, 0.07, 8_192)])).unwrap();

        let report = Analyzer::with_primary(Box::new(remote)).analyze_file(&path).unwrap();
        assert_eq!(report.classifier, "heuristic");
        assert!(report.fallback_reason.is_some());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn batch_reports_each_file_and_survives_failures() {
        let dir = std::env::temp_dir().join(format!("marinescore-batch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("tone.wav");
        let bad = dir.join("broken.wav");
        let empty = dir.join("empty.wav");
        std::fs::write(&good, wav_bytes(SR, &[sine(150.0, 0.07, 8_192)])).unwrap();
        std::fs::write(&bad, b"RIFF????WAVEjunk").unwrap();
        std::fs::write(&empty, wav_bytes(SR, &[Vec::new()])).unwrap();

        let paths = vec![good.clone(), bad.clone(), empty.clone()];
        let outcomes = Analyzer::local().analyze_batch(&paths, None);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].path, good);
        assert!(outcomes[0].report.is_ok());
        assert!(outcomes[1].report.as_ref().unwrap_err().is_no_audio());
        assert!(outcomes[2].report.as_ref().unwrap_err().is_no_audio());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn file_analysis_only_needs_the_head_of_the_clip() {
        let dir = std::env::temp_dir().join(format!("marinescore-head-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("long.wav");
        let samples = sine(150.0, 0.07, 3 * WINDOW_SIZE);
        let bytes = wav_bytes(SR, &[samples]);
        std::fs::write(&path, &bytes).unwrap();

        let analyzer = Analyzer::local();
        let from_file = analyzer.analyze_file(&path).unwrap();

        let clip = EncodedClip {
            file_name: "long.wav".into(),
            bytes: bytes.into(),
        };
        let full = crate::audio::decode::decode_clip(&clip, None).unwrap();
        assert_eq!(full.frames(), 3 * WINDOW_SIZE);
        assert_eq!(from_file.features, extract_features(&full));

        std::fs::remove_dir_all(&dir).ok();
    }
}
