use serde::{Deserialize, Serialize};

use crate::pipeline::{AnalysisReport, FileOutcome};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Entry<'a> {
    file: String,
    #[serde(flatten)]
    report: Option<&'a AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a FileOutcome> for Entry<'a> {
    fn from(outcome: &'a FileOutcome) -> Self {
        let (report, error) = match &outcome.report {
            Ok(report) => (Some(report), None),
            Err(err) if err.is_no_audio() => (None, Some(format!("no audio available: {err}"))),
            Err(err) => (None, Some(err.to_string())),
        };
        Entry {
            file: outcome.path.display().to_string(),
            report,
            error,
        }
    }
}

/// A single JSON object for one file, an array for several.
pub fn to_json(outcomes: &[FileOutcome]) -> serde_json::Result<String> {
    let entries: Vec<Entry<'_>> = outcomes.iter().map(Entry::from).collect();
    match entries.as_slice() {
        [single] => serde_json::to_string_pretty(single),
        _ => serde_json::to_string_pretty(&entries),
    }
}

pub fn to_text(outcomes: &[FileOutcome]) -> String {
    outcomes
        .iter()
        .map(render_outcome)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_outcome(outcome: &FileOutcome) -> String {
    let name = outcome.path.display();
    match &outcome.report {
        Ok(report) => format!("{name}\n{}", render_report(report)),
        Err(err) if err.is_no_audio() => format!("{name}\n  no audio available: {err}\n"),
        Err(err) => format!("{name}\n  error: {err}\n"),
    }
}

pub fn render_report(report: &AnalysisReport) -> String {
    let f = &report.features;
    let mut out = format!(
        "  score {:>3}/100  ({})\n  {}\n",
        report.result.score, report.classifier, report.result.note
    );
    if let Some(reason) = &report.fallback_reason {
        out.push_str(&format!("  fallback: {reason}\n"));
    }
    out.push_str(&format!(
        "  rms {:.4}  low {:.3}  mid {:.3}  high {:.3}\n",
        f.rms, f.low_ratio, f.mid_ratio, f.high_ratio
    ));
    out.push_str(&format!(
        "  centroid {:.0} Hz  flatness {:.3}  low peakiness {:.2}\n",
        f.centroid, f.flatness, f.low_peakiness
    ));
    if let Some(b) = &report.result.breakdown {
        out.push_str(&format!(
            "  low-frequency {:+}  broadband {:+}  noise {}{:+}\n",
            b.low_frequency_bonus,
            b.broadband_bonus,
            if b.is_noise { "detected " } else { "" },
            b.noise_penalty
        ));
    }
    out
}
