//! Analysis backend client
//!
//! HTTP client for the voice analysis backend, which runs Praat feature
//! extraction, SNR/VAD quality checks and Whisper transcription. Implements
//! both collaborator traits so one backend can serve a [`super::TriageService`].
//!
//! Endpoints:
//! - `GET /health`
//! - `POST /analyze` (multipart `file`): acoustic features and quality
//! - `POST /analyze/whisper?language=xx` (multipart `file`): transcript

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::{
    AcousticAnalysis, AcousticAnalyzer, ProviderError, Recording, SpeechRecognizer,
    SpeechTranscript,
};
use crate::features::{AcousticFeatures, QualityMetrics};
use crate::thresholds::Language;

/// Default timeout for analysis requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of attempts for transient failures
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 500;

/// Maximum backoff delay
const MAX_BACKOFF_MS: u64 = 5000;

/// Log-probability reported when the recognizer found no segments
const NO_SEGMENTS_LOGPROB: f64 = -2.0;

/// Health check response
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: Option<String>,
}

/// Feature names as the backend reports them
#[derive(Debug, Clone, Deserialize)]
struct BackendFeatures {
    jitter_local: f64,
    shimmer_dda: f64,
    hnr: f64,
    speech_rate: f64,
    pause_ratio: f64,
    #[serde(default)]
    brief_pause_ratio: Option<f64>,
    #[serde(default)]
    respiratory_pause_ratio: Option<f64>,
    #[serde(default)]
    voice_breaks: u32,
    #[serde(default)]
    mean_intensity: f64,
}

impl From<BackendFeatures> for AcousticFeatures {
    fn from(f: BackendFeatures) -> Self {
        Self {
            jitter: f.jitter_local,
            shimmer: f.shimmer_dda,
            hnr: f.hnr,
            speech_rate: f.speech_rate,
            pause_ratio: f.pause_ratio,
            brief_pause_ratio: f.brief_pause_ratio,
            respiratory_pause_ratio: f.respiratory_pause_ratio,
            voice_breaks: f.voice_breaks,
            mean_intensity: f.mean_intensity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct BackendQuality {
    #[serde(default)]
    snr_db: Option<f64>,
    #[serde(default)]
    speech_percentage: Option<f64>,
}

/// Response from /analyze
#[derive(Debug, Clone, Deserialize)]
struct AnalyzeResponse {
    status: String,
    features: BackendFeatures,
    #[serde(default)]
    quality: Option<BackendQuality>,
}

/// Response from /analyze/whisper
#[derive(Debug, Clone, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    transcription: String,
    #[serde(default)]
    avg_logprob: Option<f64>,
    #[serde(default)]
    no_speech_prob: Option<f64>,
}

/// Check if a reqwest error is retryable (transient network issues)
fn is_retryable_error(err: &reqwest::Error) -> bool {
    if err.is_connect() || err.is_timeout() {
        return true;
    }
    if let Some(status) = err.status() {
        return is_retryable_status(status);
    }
    false
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

/// Exponential backoff, capped
fn calculate_backoff(attempt: u32) -> Duration {
    let delay = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(MAX_BACKOFF_MS))
}

/// Client for the analysis backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client with URL validation
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let cleaned_url = base_url.trim_end_matches('/');

        let parsed = reqwest::Url::parse(cleaned_url)
            .map_err(|e| ProviderError::UrlError(format!("'{}': {}", cleaned_url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProviderError::UrlError(format!(
                "backend URL must use http or https scheme, got: {}",
                parsed.scheme()
            )));
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(ProviderError::UrlError(
                "backend URL must not contain credentials".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        info!("BackendClient created for {}", cleaned_url);

        Ok(Self {
            client,
            base_url: cleaned_url.to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check backend health via /health endpoint
    pub async fn check_health(&self) -> Result<HealthResponse, ProviderError> {
        let url = format!("{}/health", self.base_url);
        debug!("Checking backend health at {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
                body: "health check failed".to_string(),
            });
        }

        Ok(response.json::<HealthResponse>().await?)
    }

    /// Upload a recording, retrying transient failures
    async fn post_recording<T: DeserializeOwned>(
        &self,
        url: &str,
        recording: &Recording,
    ) -> Result<T, ProviderError> {
        let mut last_error = None;

        for attempt in 0..DEFAULT_MAX_RETRIES {
            if attempt > 0 {
                let backoff = calculate_backoff(attempt - 1);
                warn!("Backend request attempt {} failed, retrying in {:?}", attempt, backoff);
                tokio::time::sleep(backoff).await;
            }

            let file_part = reqwest::multipart::Part::bytes(recording.bytes().to_vec())
                .file_name(recording.file_name().to_string())
                .mime_str("audio/wav")?;
            let form = reqwest::multipart::Form::new().part("file", file_part);

            match self.client.post(url).multipart(form).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .map_err(|e| ProviderError::InvalidResponse(e.to_string()));
                    }
                    let body = response.text().await.unwrap_or_default();
                    let err = ProviderError::Status {
                        status: status.as_u16(),
                        body,
                    };
                    if !is_retryable_status(status) {
                        return Err(err);
                    }
                    last_error = Some(err);
                }
                Err(e) if is_retryable_error(&e) => last_error = Some(e.into()),
                Err(e) => return Err(e.into()),
            }
        }

        let err = last_error
            .unwrap_or_else(|| ProviderError::InvalidResponse("no attempt made".to_string()));
        error!("Backend request to {} failed after {} attempts: {}", url, DEFAULT_MAX_RETRIES, err);
        Err(err)
    }
}

#[async_trait]
impl AcousticAnalyzer for BackendClient {
    async fn analyze(&self, recording: &Recording) -> Result<AcousticAnalysis, ProviderError> {
        let url = format!("{}/analyze", self.base_url);
        debug!("Analyzing {} via {}", recording.file_name(), url);

        let parsed: AnalyzeResponse = self.post_recording(&url, recording).await?;
        if parsed.status != "success" {
            return Err(ProviderError::InvalidResponse(format!(
                "analysis status '{}'",
                parsed.status
            )));
        }

        let quality = parsed
            .quality
            .map(|q| QualityMetrics::new(q.snr_db, q.speech_percentage))
            .unwrap_or_else(|| QualityMetrics::new(None, None));
        debug!(
            "Backend quality: SNR {:?} dB, speech {:?}%",
            quality.snr_db, quality.speech_percentage
        );

        Ok(AcousticAnalysis {
            features: parsed.features.into(),
            quality,
        })
    }
}

#[async_trait]
impl SpeechRecognizer for BackendClient {
    async fn transcribe(
        &self,
        recording: &Recording,
        language: Language,
    ) -> Result<SpeechTranscript, ProviderError> {
        let url = format!("{}/analyze/whisper?language={}", self.base_url, language.code());
        debug!("Transcribing {} via {}", recording.file_name(), url);

        let parsed: WhisperResponse = self.post_recording(&url, recording).await?;
        debug!("Transcription result: {} chars", parsed.transcription.len());

        Ok(SpeechTranscript {
            text: parsed.transcription.trim().to_string(),
            avg_logprob: parsed.avg_logprob.unwrap_or(NO_SEGMENTS_LOGPROB),
            no_speech_prob: parsed.no_speech_prob.unwrap_or(1.0),
        })
    }
}
