use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde_json::Value;

use super::{Classifier, ClipInput, Note, ScoreBreakdown, ScoreResult};
use crate::error::ClassifyError;

/// Delegates scoring to an analysis server.
///
/// The encoded clip is uploaded as multipart field `file`; the server
/// answers with JSON `{score, note, ...}` or `{error, detail}`.
pub struct RemoteClassifier {
    client: Client,
    url: String,
}

impl RemoteClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClassifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("marinescore/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Classifier for RemoteClassifier {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn classify(&self, input: &ClipInput<'_>) -> Result<ScoreResult, ClassifyError> {
        let clip = input.encoded.ok_or(ClassifyError::MissingClip)?;

        let part = Part::bytes(clip.bytes.to_vec()).file_name(clip.file_name.clone());
        let form = Form::new().part("file", part);

        log::debug!("Uploading {} ({} bytes) to {}", clip.file_name, clip.bytes.len(), self.url);
        let response = self.client.post(&self.url).multipart(form).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        parse_response(status, &body)
    }
}

/// Turn a server reply into a result, rejecting anything unusable.
pub fn parse_response(status: u16, body: &str) -> Result<ScoreResult, ClassifyError> {
    if !(200..300).contains(&status) {
        return Err(ClassifyError::Status { status });
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| ClassifyError::Malformed(e.to_string()))?;

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let mut message = error.as_str().map_or_else(|| error.to_string(), str::to_string);
        if let Some(detail) = value.get("detail").and_then(Value::as_str) {
            message = format!("{message} ({detail})");
        }
        return Err(ClassifyError::Reported(message));
    }

    let raw = value
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| ClassifyError::Malformed("missing numeric score".into()))?;
    if !raw.is_finite() || !(0.0..=100.0).contains(&raw) {
        return Err(ClassifyError::Malformed(format!("score {raw} outside 0-100")));
    }
    let score = raw.round() as u8;

    let note = value
        .get("note")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Note::for_score(score).message().to_string());

    let breakdown = serde_json::from_value::<ScoreBreakdown>(value).ok();

    Ok(ScoreResult {
        score,
        note,
        breakdown,
    })
}
