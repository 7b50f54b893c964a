//! Caller orchestration around the engine
//!
//! The engine itself does no I/O. This module runs the two collaborators of a
//! triage request, the acoustic analyzer and the speech recognizer, against
//! one recording, gates on recording quality and hands a validated request to
//! [`TriageEngine::assess`].
//!
//! The analyzer is mandatory: its failure or timeout aborts the request. The
//! speech path is best effort and a failure only removes the speech signals.

pub mod backend;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agreement::confidence_from_logprob;
use crate::engine::TriageEngine;
use crate::features::{AcousticFeatures, QualityMetrics};
use crate::questionnaire::QuestionnaireSummary;
use crate::request::TriageRequest;
use crate::result::TriageResult;
use crate::thresholds::Language;
use crate::validation::ValidationError;
use crate::wer::WerResult;

/// Smallest possible WAV file (RIFF header + fmt + data chunk headers)
const MIN_WAV_BYTES: usize = 44;

/// Orchestration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub analyzer_timeout_secs: u64,
    pub recognizer_timeout_secs: u64,
    /// Recordings with less voiced speech than this are rejected (%)
    pub min_speech_percentage: f64,
    /// Apply the SNR bias correction to features before scoring
    pub apply_snr_correction: bool,
    pub backend_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            analyzer_timeout_secs: 30,
            recognizer_timeout_secs: 30,
            min_speech_percentage: QualityMetrics::SUFFICIENT_SPEECH_PERCENT,
            apply_snr_correction: false,
            backend_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

/// Collaborator failures
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    UrlError(String),
}

/// Errors of one orchestrated triage request
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Acoustic analyzer unavailable: {0}")]
    AnalyzerUnavailable(#[source] ProviderError),

    #[error("Acoustic analyzer timed out after {0}s")]
    AnalyzerTimeout(u64),

    #[error("Recording quality check failed: {0}")]
    QualityCheckFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),
}

/// One recorded WAV file
#[derive(Debug, Clone)]
pub struct Recording {
    bytes: Vec<u8>,
    file_name: String,
}

impl Recording {
    /// Wrap WAV bytes, checking the RIFF/WAVE header
    pub fn from_wav(bytes: Vec<u8>, file_name: impl Into<String>) -> Result<Self, TriageError> {
        if bytes.len() < MIN_WAV_BYTES {
            return Err(TriageError::InvalidAudio(format!(
                "{} bytes is too short for a WAV file",
                bytes.len()
            )));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(TriageError::InvalidAudio("missing RIFF/WAVE header".to_string()));
        }
        Ok(Self {
            bytes,
            file_name: file_name.into(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Analyzer output for one recording
#[derive(Debug, Clone, PartialEq)]
pub struct AcousticAnalysis {
    pub features: AcousticFeatures,
    pub quality: QualityMetrics,
}

/// Recognizer output for one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechTranscript {
    pub text: String,
    pub avg_logprob: f64,
    pub no_speech_prob: f64,
}

/// Extracts acoustic features and quality metrics from a recording
#[async_trait]
pub trait AcousticAnalyzer: Send + Sync {
    async fn analyze(&self, recording: &Recording) -> Result<AcousticAnalysis, ProviderError>;
}

/// Transcribes a recording of the screening phrase
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(
        &self,
        recording: &Recording,
        language: Language,
    ) -> Result<SpeechTranscript, ProviderError>;
}

/// Outcome of one orchestrated request
#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub request_id: Uuid,
    pub result: TriageResult,
    pub transcript: Option<SpeechTranscript>,
    pub word_error: Option<WerResult>,
    pub elapsed_ms: u64,
}

/// Runs collaborators and the engine for one recording at a time
pub struct TriageService {
    engine: TriageEngine,
    analyzer: Arc<dyn AcousticAnalyzer>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    config: ServiceConfig,
}

impl TriageService {
    pub fn new(
        engine: TriageEngine,
        analyzer: Arc<dyn AcousticAnalyzer>,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
    ) -> Self {
        let config = engine.config().service.clone();
        Self {
            engine,
            analyzer,
            recognizer,
            config,
        }
    }

    pub fn engine(&self) -> &TriageEngine {
        &self.engine
    }

    async fn run_analyzer(&self, recording: &Recording) -> Result<AcousticAnalysis, TriageError> {
        let limit = self.config.analyzer_timeout_secs;
        let analysis = self.analyzer.analyze(recording);
        match tokio::time::timeout(Duration::from_secs(limit), analysis).await {
            Ok(Ok(analysis)) => Ok(analysis),
            Ok(Err(e)) => Err(TriageError::AnalyzerUnavailable(e)),
            Err(_) => Err(TriageError::AnalyzerTimeout(limit)),
        }
    }

    async fn run_recognizer(
        &self,
        recording: &Recording,
        language: Language,
    ) -> Option<SpeechTranscript> {
        let recognizer = self.recognizer.as_ref()?;
        let limit = self.config.recognizer_timeout_secs;
        let transcription = recognizer.transcribe(recording, language);
        match tokio::time::timeout(Duration::from_secs(limit), transcription).await {
            Ok(Ok(transcript)) => Some(transcript),
            Ok(Err(e)) => {
                warn!("Speech recognition failed, continuing without speech signals: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    "Speech recognition timed out after {}s, continuing without speech signals",
                    limit
                );
                None
            }
        }
    }

    /// Triage one recording
    pub async fn triage(
        &self,
        recording: &Recording,
        language: Language,
        questionnaire: Option<QuestionnaireSummary>,
    ) -> Result<TriageReport, TriageError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            "Triage request {} ({} bytes, language {})",
            request_id,
            recording.bytes().len(),
            language
        );

        let (analysis, transcript) = tokio::join!(
            self.run_analyzer(recording),
            self.run_recognizer(recording, language)
        );
        let analysis = analysis?;

        if !analysis.quality.has_sufficient_speech(self.config.min_speech_percentage) {
            return Err(TriageError::QualityCheckFailed(format!(
                "only {:.0}% speech detected, at least {:.0}% required",
                analysis.quality.speech_percentage.unwrap_or(0.0),
                self.config.min_speech_percentage
            )));
        }

        let features = match analysis.quality.snr_db {
            Some(snr) if self.config.apply_snr_correction => {
                debug!("Applying SNR bias correction at {:.1} dB", snr);
                analysis.features.corrected_for_snr(snr)
            }
            _ => analysis.features,
        };

        let word_error = transcript
            .as_ref()
            .map(|t| self.engine.config().word_error.evaluate(&t.text, language));

        let mut request = TriageRequest::new(language, features);
        request.snr_db = analysis.quality.snr_db;
        request.speech_percentage = analysis.quality.speech_percentage;
        if let Some(transcript) = &transcript {
            request.avg_logprob = Some(transcript.avg_logprob);
            request.intelligibility_confidence =
                Some(confidence_from_logprob(transcript.avg_logprob));
        }
        request.word_error_accuracy = word_error.as_ref().map(|w| w.accuracy);
        request.questionnaire = questionnaire;

        let validated = request.validate()?;
        let result = self.engine.assess(&validated);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            "Triage request {} -> {} (confidence {}) in {}ms",
            request_id, result.level, result.confidence, elapsed_ms
        );

        Ok(TriageReport {
            request_id,
            result,
            transcript,
            word_error,
            elapsed_ms,
        })
    }
}
