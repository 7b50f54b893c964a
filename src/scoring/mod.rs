//! Scoring stages
//!
//! Each stage reads an immutable [`ScoringContext`] and returns what it found.
//! The running score is carried between stages as a [`Tally`] value that is
//! consumed and returned, never shared.
//!
//! ## Stages
//!
//! 1. [`acoustic`] - tiered per-feature thresholds
//! 2. [`intelligibility`] - speech confidence tiers and word-error points
//! 3. [`rules`] - extreme-value override and quality-consistency tables

pub mod acoustic;
pub mod intelligibility;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::features::AcousticFeatures;
use crate::quality::QualityAdaptation;
use crate::thresholds::Language;

/// Flag severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// Which stage raised a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSource {
    #[default]
    Acoustic,
    Intelligibility,
    WordError,
    Override,
    Quality,
    Agreement,
    Questionnaire,
}

impl FlagSource {
    /// Scoring flags are counted by the classifier and consistency rules;
    /// the rest only explain the result.
    pub fn is_scoring(&self) -> bool {
        matches!(self, Self::Acoustic | Self::Intelligibility | Self::WordError)
    }
}

/// One finding with the points it contributed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub severity: Severity,
    pub message: String,
    pub points: u32,
    #[serde(default)]
    pub source: FlagSource,
}

impl Flag {
    pub fn new(
        source: FlagSource,
        severity: Severity,
        points: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            points,
            source,
        }
    }

    /// Explanatory flag carrying no points
    pub fn note(source: FlagSource, severity: Severity, message: impl Into<String>) -> Self {
        Self::new(source, severity, 0, message)
    }
}

/// A visible change to the running score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAdjustment {
    pub rule: String,
    pub before: u32,
    pub after: u32,
    pub explanation: String,
}

impl ScoreAdjustment {
    /// Signed change (negative for discounts)
    pub fn delta(&self) -> i64 {
        i64::from(self.after) - i64::from(self.before)
    }
}

/// Base points per tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsConfig {
    /// Base points of a high-severity tier
    pub high: u32,
    /// Base points of a medium-severity tier
    pub medium: u32,
    /// Speech confidence below this is a high-severity finding
    pub intelligibility_high_below: f64,
    /// Speech confidence below this is a medium-severity finding
    pub intelligibility_medium_below: f64,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            high: 5,
            medium: 2,
            intelligibility_high_below: 50.0,
            intelligibility_medium_below: 65.0,
        }
    }
}

impl PointsConfig {
    pub fn for_severity(&self, severity: Severity) -> u32 {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => 0,
        }
    }

    /// Highest score the acoustic stage can produce at full weight.
    ///
    /// Shimmer, pause, HNR and speech rate top out at a high tier; jitter and
    /// voice breaks only have a medium tier.
    pub fn max_acoustic_score(&self) -> u32 {
        4 * self.high + 2 * self.medium
    }
}

/// Base points scaled by a reliability weight, rounded half away from zero
pub fn weighted_points(base: u32, weight: f64) -> u32 {
    (f64::from(base) * weight).round().max(0.0) as u32
}

/// Read-only inputs shared by every scoring stage
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub language: Language,
    pub features: &'a AcousticFeatures,
    pub adaptation: &'a QualityAdaptation,
    /// Speech-to-text confidence (0-100)
    pub intelligibility_confidence: Option<f64>,
    /// Word accuracy against the expected phrase (0-100)
    pub word_error_accuracy: Option<f64>,
}

impl ScoringContext<'_> {
    pub fn snr_db(&self) -> Option<f64> {
        self.adaptation.snr_db
    }

    /// Both independent speech signals are present
    pub fn has_speech_signals(&self) -> bool {
        self.intelligibility_confidence.is_some() && self.word_error_accuracy.is_some()
    }
}

/// Points and flags produced by one stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageScore {
    pub points: u32,
    pub flags: Vec<Flag>,
}

impl StageScore {
    pub fn push(&mut self, flag: Flag) {
        self.points += flag.points;
        self.flags.push(flag);
    }
}

/// Running score threaded through the adjustment stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub score: u32,
    pub flags: Vec<Flag>,
    pub adjustments: Vec<ScoreAdjustment>,
}

impl Tally {
    pub fn from_stages<I>(stages: I) -> Self
    where
        I: IntoIterator<Item = StageScore>,
    {
        stages.into_iter().fold(Self::default(), |mut tally, stage| {
            tally.score += stage.points;
            tally.flags.extend(stage.flags);
            tally
        })
    }

    pub fn scoring_flags(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter().filter(|flag| flag.source.is_scoring())
    }

    pub fn scoring_flag_count(&self) -> usize {
        self.scoring_flags().count()
    }

    /// Replace the score, recording the change
    pub fn adjusted(mut self, rule: &str, after: u32, explanation: String) -> Self {
        self.adjustments.push(ScoreAdjustment {
            rule: rule.to_string(),
            before: self.score,
            after,
            explanation,
        });
        self.score = after;
        self
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.push(flag);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_points_rounding() {
        assert_eq!(weighted_points(5, 1.0), 5);
        assert_eq!(weighted_points(5, 0.85), 4);
        assert_eq!(weighted_points(5, 0.7), 4, "3.5 rounds away from zero");
        assert_eq!(weighted_points(5, 0.5), 3);
        assert_eq!(weighted_points(2, 0.85), 2);
        assert_eq!(weighted_points(2, 0.7), 1);
        assert_eq!(weighted_points(2, 0.5), 1);
    }

    #[test]
    fn test_max_acoustic_score() {
        assert_eq!(PointsConfig::default().max_acoustic_score(), 24);
    }

    #[test]
    fn test_tally_accumulates_stages_and_adjustments() {
        let mut acoustic = StageScore::default();
        acoustic.push(Flag::new(FlagSource::Acoustic, Severity::High, 5, "hnr"));
        let mut speech = StageScore::default();
        speech.push(Flag::new(FlagSource::Intelligibility, Severity::Medium, 2, "conf"));

        let tally = Tally::from_stages([acoustic, speech]);
        assert_eq!(tally.score, 7);
        assert_eq!(tally.scoring_flag_count(), 2);

        let tally = tally
            .adjusted("test_rule", 3, "discount".to_string())
            .with_flag(Flag::note(FlagSource::Quality, Severity::Low, "note"));
        assert_eq!(tally.score, 3);
        assert_eq!(tally.adjustments[0].delta(), -4);
        assert_eq!(tally.scoring_flag_count(), 2, "notes are not scoring flags");
        assert_eq!(tally.flags.len(), 3);
    }
}
