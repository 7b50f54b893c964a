//! Multi-signal adaptive triage decision engine for emergency voice screening.
//!
//! Turns acoustic features, recording quality, speech-to-text confidence, word
//! error rate and an optional health questionnaire into a RED / YELLOW / GREEN
//! triage level with a confidence, explanatory flags and an action message.
//!
//! The decision core ([`engine`]) is synchronous and pure. [`service`] wraps it
//! with the I/O of a full request: the analysis backend, timeouts and the
//! recording quality gate.

pub mod agreement;
pub mod classify;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod features;
pub mod quality;
pub mod questionnaire;
pub mod request;
pub mod result;
pub mod scoring;
pub mod service;
pub mod thresholds;
pub mod validation;
pub mod wer;

#[cfg(test)]
mod scenario_tests;

pub use classify::TriageLevel;
pub use config::EngineConfig;
pub use engine::TriageEngine;
pub use features::{AcousticFeatures, QualityMetrics};
pub use questionnaire::{QuestionnaireAnswers, QuestionnaireSummary};
pub use request::TriageRequest;
pub use result::TriageResult;
pub use thresholds::Language;
pub use validation::{ValidatedRequest, ValidationError};
