//! Input contract of the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::{AcousticFeatures, QualityMetrics};
use crate::questionnaire::QuestionnaireSummary;
use crate::thresholds::Language;

/// One triage request: measurements from a single recording plus optional
/// speech signals and questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRequest {
    #[serde(default)]
    pub language: Language,
    pub features: AcousticFeatures,
    #[serde(default)]
    pub snr_db: Option<f64>,
    #[serde(default)]
    pub speech_percentage: Option<f64>,
    /// Speech-to-text confidence (0-100)
    #[serde(default)]
    pub intelligibility_confidence: Option<f64>,
    /// Average log-probability of the transcript segments
    #[serde(default)]
    pub avg_logprob: Option<f64>,
    /// Word accuracy against the expected phrase (0-100)
    #[serde(default)]
    pub word_error_accuracy: Option<f64>,
    #[serde(default)]
    pub questionnaire: Option<QuestionnaireSummary>,
    /// Echoed as the result timestamp
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl TriageRequest {
    pub fn new(language: Language, features: AcousticFeatures) -> Self {
        Self {
            language,
            features,
            snr_db: None,
            speech_percentage: None,
            intelligibility_confidence: None,
            avg_logprob: None,
            word_error_accuracy: None,
            questionnaire: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_quality(mut self, snr_db: f64, speech_percentage: Option<f64>) -> Self {
        self.snr_db = Some(snr_db);
        self.speech_percentage = speech_percentage;
        self
    }

    pub fn with_speech(
        mut self,
        intelligibility_confidence: f64,
        word_error_accuracy: Option<f64>,
    ) -> Self {
        self.intelligibility_confidence = Some(intelligibility_confidence);
        self.word_error_accuracy = word_error_accuracy;
        self
    }

    pub fn with_questionnaire(mut self, summary: QuestionnaireSummary) -> Self {
        self.questionnaire = Some(summary);
        self
    }

    pub fn quality_metrics(&self) -> QualityMetrics {
        QualityMetrics::new(self.snr_db, self.speech_percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request_parses() {
        let request: TriageRequest = serde_json::from_str(
            r#"{
                "features": {
                    "jitter": 1.0, "shimmer": 3.0, "hnr": 12.0, "speech_rate": 3.0,
                    "pause_ratio": 15.0, "voice_breaks": 0
                }
            }"#,
        )
        .unwrap();
        assert_eq!(request.language, Language::En);
        assert_eq!(request.snr_db, None);
        assert_eq!(request.features.respiratory_pause_ratio, None);
        assert!(request.quality_metrics().is_reliable);
    }

    #[test]
    fn test_recorded_at_round_trips() {
        let json = r#"{
            "language": "ar",
            "features": {
                "jitter": 1.0, "shimmer": 3.0, "hnr": 12.0, "speech_rate": 2.2,
                "pause_ratio": 15.0, "voice_breaks": 0, "mean_intensity": 62.0
            },
            "snr_db": 18.5,
            "recorded_at": "2026-03-01T10:15:00Z"
        }"#;
        let request: TriageRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.language, Language::Ar);
        assert_eq!(request.recorded_at.to_rfc3339(), "2026-03-01T10:15:00+00:00");

        let reparsed: TriageRequest =
            serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(reparsed, request);
    }
}
