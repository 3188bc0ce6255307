//! Analysis engine client. The only place that talks to the skill-matching service.
//!
//! The engine receives the resume binary plus the job text as multipart and answers
//! with `{"success": true, "data": AnalysisResult}`. Failures come back as a non-2xx
//! status with a `{"detail": "..."}` body.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Body, Client};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::upload::StagedFile;
use crate::models::analysis::AnalysisResult;

/// Upper bound for a single engine round-trip. Timeouts surface as upstream failures.
pub const ENGINE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to open staged resume: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine returned status {status}: {detail}")]
    Status {
        status: u16,
        detail: String,
        body: Option<Value>,
    },

    #[error("{0}")]
    Malformed(String),
}

/// Anything that can turn a staged resume plus job text into an `AnalysisResult`.
///
/// `AppState` carries an `Arc<dyn AnalysisEngine>` so tests can substitute a stub.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn analyze(
        &self,
        resume: &StagedFile,
        job_description: &str,
    ) -> Result<AnalysisResult, EngineError>;
}

#[derive(Debug, Deserialize)]
struct EngineEnvelope {
    data: Option<AnalysisResult>,
}

/// HTTP client for the engine's `POST /analyze` endpoint.
#[derive(Clone)]
pub struct HttpAnalysisEngine {
    client: Client,
    base_url: String,
}

impl HttpAnalysisEngine {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, ENGINE_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
        })
    }

    fn analyze_url(&self) -> String {
        format!("{}/analyze", self.base_url)
    }
}

#[async_trait]
impl AnalysisEngine for HttpAnalysisEngine {
    async fn analyze(
        &self,
        resume: &StagedFile,
        job_description: &str,
    ) -> Result<AnalysisResult, EngineError> {
        // Stream the staged file straight from disk rather than buffering it.
        let file = tokio::fs::File::open(resume.path()).await?;
        let length = file.metadata().await?.len();
        let part = multipart::Part::stream_with_length(Body::from(file), length)
            .file_name(resume.original_name().to_string())
            .mime_str(resume.content_type())?;

        let form = multipart::Form::new()
            .part("resume", part)
            .text("job_description", job_description.to_string());

        debug!(url = %self.analyze_url(), bytes = length, "Calling analysis engine");

        let response = self
            .client
            .post(self.analyze_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str::<Value>(&text).ok();
            let detail = body
                .as_ref()
                .and_then(|b| b.get("detail"))
                .map(|d| match d {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| {
                    if text.is_empty() {
                        format!("Request failed with status code {}", status.as_u16())
                    } else {
                        text.clone()
                    }
                });
            warn!(status = status.as_u16(), "Analysis engine rejected request: {detail}");
            return Err(EngineError::Status {
                status: status.as_u16(),
                detail,
                body,
            });
        }

        parse_envelope(&text)
    }
}

/// Extracts the result from a 2xx body. A missing or malformed `data` object is
/// an upstream failure, not a partial success.
fn parse_envelope(text: &str) -> Result<AnalysisResult, EngineError> {
    let envelope: EngineEnvelope = serde_json::from_str(text).map_err(|e| {
        warn!("Analysis engine returned unparseable body: {e}");
        EngineError::Malformed("Invalid response from AI service".to_string())
    })?;
    envelope
        .data
        .ok_or_else(|| EngineError::Malformed("Invalid response from AI service".to_string()))
}
