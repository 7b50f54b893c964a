//! Input validation
//!
//! Every numeric input is checked before it can reach a score. NaN or infinite
//! values from upstream parsing are rejected here, never clamped downstream.
//! The engine only accepts a [`ValidatedRequest`], so an unchecked request
//! cannot be scored.

use thiserror::Error;

use crate::questionnaire::QuestionnaireSummary;
use crate::request::TriageRequest;

/// Validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// A request whose numeric inputs are all finite and in range
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest(TriageRequest);

impl ValidatedRequest {
    pub fn request(&self) -> &TriageRequest {
        &self.0
    }
}

impl std::ops::Deref for ValidatedRequest {
    type Target = TriageRequest;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<TriageRequest> for ValidatedRequest {
    type Error = ValidationError;

    fn try_from(request: TriageRequest) -> Result<Self, Self::Error> {
        request.validate()
    }
}

fn check(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { field });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_optional(
    field: &'static str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => check(field, value, min, max),
        None => Ok(()),
    }
}

fn check_questionnaire(summary: &QuestionnaireSummary) -> Result<(), ValidationError> {
    check("questionnaire.score", summary.score, -10.0, 100.0)?;
    check("questionnaire.confidence_modifier", summary.confidence_modifier, 0.0, 2.0)
}

impl TriageRequest {
    /// Check every numeric input
    pub fn validate(self) -> Result<ValidatedRequest, ValidationError> {
        let features = &self.features;
        check("features.jitter", features.jitter, 0.0, 100.0)?;
        check("features.shimmer", features.shimmer, 0.0, 100.0)?;
        check("features.hnr", features.hnr, -50.0, 100.0)?;
        check("features.speech_rate", features.speech_rate, 0.0, 20.0)?;
        check("features.pause_ratio", features.pause_ratio, 0.0, 100.0)?;
        check_optional("features.brief_pause_ratio", features.brief_pause_ratio, 0.0, 100.0)?;
        check_optional(
            "features.respiratory_pause_ratio",
            features.respiratory_pause_ratio,
            0.0,
            100.0,
        )?;
        check("features.mean_intensity", features.mean_intensity, -200.0, 200.0)?;

        check_optional("snr_db", self.snr_db, -50.0, 120.0)?;
        check_optional("speech_percentage", self.speech_percentage, 0.0, 100.0)?;
        check_optional("intelligibility_confidence", self.intelligibility_confidence, 0.0, 100.0)?;
        check_optional("avg_logprob", self.avg_logprob, f64::MIN, 0.0)?;
        check_optional("word_error_accuracy", self.word_error_accuracy, 0.0, 100.0)?;

        if let Some(summary) = &self.questionnaire {
            check_questionnaire(summary)?;
        }

        Ok(ValidatedRequest(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::healthy_features;
    use crate::features::AcousticFeatures;
    use crate::thresholds::Language;

    fn request() -> TriageRequest {
        TriageRequest::new(Language::En, healthy_features())
    }

    #[test]
    fn test_valid_request_passes() {
        let validated = request()
            .with_quality(22.0, Some(70.0))
            .validate()
            .unwrap();
        assert_eq!(validated.snr_db, Some(22.0));
    }

    #[test]
    fn test_nan_feature_rejected() {
        let request = TriageRequest {
            features: AcousticFeatures {
                shimmer: f64::NAN,
                ..healthy_features()
            },
            ..request()
        };
        assert_eq!(
            request.validate().unwrap_err(),
            ValidationError::NonFinite {
                field: "features.shimmer"
            }
        );
    }

    #[test]
    fn test_infinite_optional_rejected() {
        let request = TriageRequest {
            snr_db: Some(f64::INFINITY),
            ..request()
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::NonFinite { field: "snr_db" })
        ));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let request = request().with_speech(140.0, None);
        let err = request.validate().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange {
                field: "intelligibility_confidence",
                ..
            }
        ));
        assert!(err.to_string().contains("outside [0, 100]"));
    }

    #[test]
    fn test_positive_logprob_rejected() {
        let request = TriageRequest {
            avg_logprob: Some(0.5),
            ..request()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_try_from() {
        assert!(ValidatedRequest::try_from(request()).is_ok());
    }
}
