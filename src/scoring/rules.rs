//! Ordered decision tables
//!
//! The extreme-value override and the quality-consistency adjustment are both
//! small rule tables: a list of named predicate/action pairs evaluated in order
//! by [`first_match`]. The first rule whose condition holds wins; rule ids end
//! up in the result so every decision can be traced back to one table row.
//!
//! ## Extreme-value override
//!
//! Unambiguous severe pathology forces RED regardless of the aggregate score,
//! provided the running score still reaches a minimum.
//!
//! ## Quality-consistency adjustment
//!
//! When independent speech signals and a clean recording agree the voice is
//! healthy, isolated acoustic flags are discounted (never removed, a minimum
//! residual is always kept). Poor audio or poor intelligibility adds an
//! uncertainty penalty instead.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Flag, FlagSource, ScoringContext, Severity, Tally};

/// One named row of a decision table
#[derive(Debug, Clone, PartialEq)]
pub struct Rule<C, A> {
    /// Stable identifier, reported in results
    pub id: &'static str,
    pub condition: C,
    pub action: A,
}

/// A rule predicate over some input
pub trait Condition<I: ?Sized> {
    fn matches(&self, input: &I) -> bool;
}

/// Evaluate `rules` in order and return the first whose condition holds
pub fn first_match<'r, C, A, I>(rules: &'r [Rule<C, A>], input: &I) -> Option<&'r Rule<C, A>>
where
    C: Condition<I>,
    I: ?Sized,
{
    rules.iter().find(|rule| rule.condition.matches(input))
}

/// Absent values never satisfy a comparison
fn below(value: Option<f64>, cutoff: f64) -> bool {
    value.map_or(false, |v| v < cutoff)
}

fn at_least(value: Option<f64>, floor: f64) -> bool {
    value.map_or(false, |v| v >= floor)
}

// ── Extreme-value override ───────────────────────────────────

/// Predicate of an extreme-value rule
#[derive(Debug, Clone, PartialEq)]
pub enum ExtremeCondition {
    PauseAbove(f64),
    HnrBelow(f64),
    SpeechRateBelow(f64),
    IntelligibilityBelow(f64),
    /// Both speech signals are poor
    IntelligibilityAndAccuracyBelow { confidence: f64, accuracy: f64 },
    /// Heavy pausing with either speech signal poor
    PauseWithPoorSpeech {
        pause: f64,
        confidence: f64,
        accuracy: f64,
    },
    /// Low HNR with either speech signal poor
    HnrWithPoorSpeech {
        hnr: f64,
        confidence: f64,
        accuracy: f64,
    },
}

impl Condition<ScoringContext<'_>> for ExtremeCondition {
    fn matches(&self, ctx: &ScoringContext<'_>) -> bool {
        let features = ctx.features;
        let confidence = ctx.intelligibility_confidence;
        let accuracy = ctx.word_error_accuracy;
        let poor_speech = |conf_cutoff: f64, acc_cutoff: f64| {
            below(confidence, conf_cutoff) || below(accuracy, acc_cutoff)
        };

        match *self {
            Self::PauseAbove(cutoff) => features.effective_pause_ratio() > cutoff,
            Self::HnrBelow(cutoff) => features.hnr < cutoff,
            Self::SpeechRateBelow(cutoff) => features.speech_rate < cutoff,
            Self::IntelligibilityBelow(cutoff) => below(confidence, cutoff),
            Self::IntelligibilityAndAccuracyBelow {
                confidence: conf_cutoff,
                accuracy: acc_cutoff,
            } => below(confidence, conf_cutoff) && below(accuracy, acc_cutoff),
            Self::PauseWithPoorSpeech {
                pause,
                confidence: conf_cutoff,
                accuracy: acc_cutoff,
            } => features.effective_pause_ratio() > pause && poor_speech(conf_cutoff, acc_cutoff),
            Self::HnrWithPoorSpeech {
                hnr,
                confidence: conf_cutoff,
                accuracy: acc_cutoff,
            } => features.hnr < hnr && poor_speech(conf_cutoff, acc_cutoff),
        }
    }
}

impl ExtremeCondition {
    /// Describe the measured values behind a match
    pub fn describe(&self, ctx: &ScoringContext<'_>) -> String {
        let features = ctx.features;
        let speech = || {
            format!(
                "intelligibility {}, word accuracy {}",
                fmt_signal(ctx.intelligibility_confidence),
                fmt_signal(ctx.word_error_accuracy)
            )
        };
        match self {
            Self::PauseAbove(cutoff) => {
                format!("pause ratio {:.1}% > {:.0}%", features.effective_pause_ratio(), cutoff)
            }
            Self::HnrBelow(cutoff) => format!("HNR {:.1} dB < {:.1} dB", features.hnr, cutoff),
            Self::SpeechRateBelow(cutoff) => {
                format!("speech rate {:.2} syl/s < {:.1} syl/s", features.speech_rate, cutoff)
            }
            Self::IntelligibilityBelow(cutoff) => format!(
                "intelligibility {} < {:.0}%",
                fmt_signal(ctx.intelligibility_confidence),
                cutoff
            ),
            Self::IntelligibilityAndAccuracyBelow { .. } => speech(),
            Self::PauseWithPoorSpeech { .. } => {
                format!("pause ratio {:.1}% with {}", features.effective_pause_ratio(), speech())
            }
            Self::HnrWithPoorSpeech { .. } => {
                format!("HNR {:.1} dB with {}", features.hnr, speech())
            }
        }
    }
}

fn fmt_signal(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.0}%", v))
}

/// Action of an extreme-value rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceRed {
    /// Running score the override needs before it may fire
    pub min_score: u32,
}

/// Cutoffs of the extreme-value table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeConfig {
    pub pause_ratio_above: f64,
    pub hnr_below: f64,
    pub speech_rate_below: f64,
    pub intelligibility_below: f64,
    /// Confidence cutoff of the paired intelligibility/word-error rule
    pub paired_confidence_below: f64,
    /// Accuracy cutoff of the paired intelligibility/word-error rule
    pub paired_accuracy_below: f64,
    pub combined_pause_above: f64,
    pub combined_hnr_below: f64,
    /// Speech counts as poor below either of these in the combined rules
    pub poor_speech_confidence_below: f64,
    pub poor_speech_accuracy_below: f64,
    /// Running score required before the override may force RED
    pub min_score: u32,
}

impl Default for ExtremeConfig {
    fn default() -> Self {
        Self {
            pause_ratio_above: 55.0,
            hnr_below: 2.0,
            speech_rate_below: 0.5,
            intelligibility_below: 20.0,
            paired_confidence_below: 70.0,
            paired_accuracy_below: 60.0,
            combined_pause_above: 40.0,
            combined_hnr_below: 4.0,
            poor_speech_confidence_below: 70.0,
            poor_speech_accuracy_below: 70.0,
            min_score: 5,
        }
    }
}

pub type ExtremeRule = Rule<ExtremeCondition, ForceRed>;

impl ExtremeConfig {
    /// The override table in evaluation order
    pub fn rules(&self) -> Vec<ExtremeRule> {
        let action = ForceRed {
            min_score: self.min_score,
        };
        let rule = |id: &'static str, condition: ExtremeCondition| Rule {
            id,
            condition,
            action,
        };
        vec![
            rule("extreme_pause", ExtremeCondition::PauseAbove(self.pause_ratio_above)),
            rule("extreme_hnr", ExtremeCondition::HnrBelow(self.hnr_below)),
            rule("extreme_speech_rate", ExtremeCondition::SpeechRateBelow(self.speech_rate_below)),
            rule(
                "extreme_intelligibility",
                ExtremeCondition::IntelligibilityBelow(self.intelligibility_below),
            ),
            rule(
                "intelligibility_with_word_errors",
                ExtremeCondition::IntelligibilityAndAccuracyBelow {
                    confidence: self.paired_confidence_below,
                    accuracy: self.paired_accuracy_below,
                },
            ),
            rule(
                "pauses_with_poor_intelligibility",
                ExtremeCondition::PauseWithPoorSpeech {
                    pause: self.combined_pause_above,
                    confidence: self.poor_speech_confidence_below,
                    accuracy: self.poor_speech_accuracy_below,
                },
            ),
            rule(
                "low_hnr_with_poor_intelligibility",
                ExtremeCondition::HnrWithPoorSpeech {
                    hnr: self.combined_hnr_below,
                    confidence: self.poor_speech_confidence_below,
                    accuracy: self.poor_speech_accuracy_below,
                },
            ),
        ]
    }
}

/// A matched extreme-value rule
#[derive(Debug, Clone, PartialEq)]
pub struct ExtremeMatch {
    pub rule_id: &'static str,
    pub details: String,
    pub action: ForceRed,
}

impl ExtremeMatch {
    /// Whether the override may force RED at this score
    pub fn fires(&self, score: u32) -> bool {
        score >= self.action.min_score
    }

    pub fn flag(&self) -> Flag {
        Flag::note(
            FlagSource::Override,
            Severity::High,
            format!("Extreme-value override ({}): {}", self.rule_id, self.details),
        )
    }
}

/// Evaluate the override table
pub fn evaluate_extreme(ctx: &ScoringContext<'_>, config: &ExtremeConfig) -> Option<ExtremeMatch> {
    let rules = config.rules();
    let rule = first_match(&rules, ctx)?;
    let details = rule.condition.describe(ctx);
    debug!("Extreme-value rule {} matched: {}", rule.id, details);
    Some(ExtremeMatch {
        rule_id: rule.id,
        details,
        action: rule.action,
    })
}

// ── Quality-consistency adjustment ───────────────────────────

/// What the consistency rules look at
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyInput<'a> {
    pub ctx: &'a ScoringContext<'a>,
    pub score: u32,
    pub scoring_flags: usize,
    pub high_flags: usize,
    pub extreme_matched: bool,
}

impl<'a> ConsistencyInput<'a> {
    pub fn new(ctx: &'a ScoringContext<'a>, tally: &Tally, extreme_matched: bool) -> Self {
        Self {
            ctx,
            score: tally.score,
            scoring_flags: tally.scoring_flag_count(),
            high_flags: tally
                .scoring_flags()
                .filter(|f| f.severity == Severity::High)
                .count(),
            extreme_matched,
        }
    }

    /// Preconditions shared by every discount
    fn discount_allowed(&self) -> bool {
        self.score > 0
            && self.ctx.has_speech_signals()
            && self.ctx.snr_db().is_some()
            && !self.extreme_matched
    }
}

/// Minimum independent evidence of healthy speech
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthyEvidence {
    pub min_confidence: f64,
    pub min_accuracy: f64,
    pub min_snr_db: f64,
}

impl HealthyEvidence {
    fn holds(&self, ctx: &ScoringContext<'_>) -> bool {
        at_least(ctx.intelligibility_confidence, self.min_confidence)
            && at_least(ctx.word_error_accuracy, self.min_accuracy)
            && at_least(ctx.snr_db(), self.min_snr_db)
    }
}

/// Predicate of a consistency rule
#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyCondition {
    /// Exactly `flags` scoring flags, at most `max_high` of them high severity
    FewFlags {
        flags: usize,
        max_high: usize,
        evidence: HealthyEvidence,
    },
    /// Any number of flags contradicted by healthy evidence
    HealthyEvidence(HealthyEvidence),
    /// Poor recording or poor intelligibility
    LowQuality {
        snr_below: f64,
        confidence_below: f64,
    },
}

impl Condition<ConsistencyInput<'_>> for ConsistencyCondition {
    fn matches(&self, input: &ConsistencyInput<'_>) -> bool {
        match self {
            Self::FewFlags {
                flags,
                max_high,
                evidence,
            } => {
                input.discount_allowed()
                    && input.scoring_flags == *flags
                    && input.high_flags <= *max_high
                    && evidence.holds(input.ctx)
            }
            Self::HealthyEvidence(evidence) => {
                input.discount_allowed() && evidence.holds(input.ctx)
            }
            Self::LowQuality {
                snr_below,
                confidence_below,
            } => {
                below(input.ctx.snr_db(), *snr_below)
                    || below(input.ctx.intelligibility_confidence, *confidence_below)
            }
        }
    }
}

/// How a discounted score is rounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    Floor,
    Nearest,
}

/// Action of a consistency rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsistencyAction {
    /// Multiply the score, keeping at least `min_points`
    Discount {
        factor: f64,
        rounding: Rounding,
        min_points: u32,
    },
    /// Add uncertainty points and a low-severity note
    Penalty { points: u32 },
}

impl ConsistencyAction {
    fn apply(&self, rule_id: &str, tally: Tally) -> Tally {
        match *self {
            Self::Discount {
                factor,
                rounding,
                min_points,
            } => {
                let before = tally.score;
                let scaled = f64::from(before) * factor;
                let rounded = (match rounding {
                    Rounding::Floor => scaled.floor(),
                    Rounding::Nearest => scaled.round(),
                }) as u32;
                // Discounts never raise the score
                let after = rounded.max(min_points).min(before);
                let explanation = format!(
                    "Quality bonus: {} -> {} points, independent signals indicate healthy speech",
                    before, after
                );
                debug!("Consistency rule {}: {}", rule_id, explanation);
                tally.adjusted(rule_id, after, explanation)
            }
            Self::Penalty { points } => {
                let before = tally.score;
                let explanation = format!(
                    "Uncertainty penalty: +{} points for low audio quality or intelligibility",
                    points
                );
                debug!("Consistency rule {}: {}", rule_id, explanation);
                tally
                    .adjusted(rule_id, before + points, explanation)
                    .with_flag(Flag::new(
                        FlagSource::Quality,
                        Severity::Low,
                        points,
                        "Low audio quality or intelligibility adds uncertainty",
                    ))
            }
        }
    }
}

/// Settings of one discount rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountSettings {
    #[serde(flatten)]
    pub evidence: HealthyEvidence,
    pub factor: f64,
    pub min_points: u32,
}

/// Settings of the uncertainty penalty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltySettings {
    pub snr_below: f64,
    pub confidence_below: f64,
    pub points: u32,
}

/// Settings of the consistency table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    pub isolated_flag: DiscountSettings,
    pub paired_borderline_flags: DiscountSettings,
    pub consistent_healthy_signals: DiscountSettings,
    pub low_quality_uncertainty: PenaltySettings,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            isolated_flag: DiscountSettings {
                evidence: HealthyEvidence {
                    min_confidence: 75.0,
                    min_accuracy: 85.0,
                    min_snr_db: 20.0,
                },
                factor: 0.2,
                min_points: 1,
            },
            paired_borderline_flags: DiscountSettings {
                evidence: HealthyEvidence {
                    min_confidence: 70.0,
                    min_accuracy: 95.0,
                    min_snr_db: 20.0,
                },
                factor: 0.3,
                min_points: 2,
            },
            consistent_healthy_signals: DiscountSettings {
                evidence: HealthyEvidence {
                    min_confidence: 65.0,
                    min_accuracy: 85.0,
                    min_snr_db: 15.0,
                },
                factor: 0.4,
                min_points: 1,
            },
            low_quality_uncertainty: PenaltySettings {
                snr_below: 10.0,
                confidence_below: 50.0,
                points: 2,
            },
        }
    }
}

pub type ConsistencyRule = Rule<ConsistencyCondition, ConsistencyAction>;

impl ConsistencyConfig {
    /// The consistency table in evaluation order
    pub fn rules(&self) -> Vec<ConsistencyRule> {
        let discount = |settings: &DiscountSettings, rounding| ConsistencyAction::Discount {
            factor: settings.factor,
            rounding,
            min_points: settings.min_points,
        };
        let penalty = &self.low_quality_uncertainty;

        vec![
            Rule {
                id: "isolated_flag",
                condition: ConsistencyCondition::FewFlags {
                    flags: 1,
                    max_high: 1,
                    evidence: self.isolated_flag.evidence,
                },
                action: discount(&self.isolated_flag, Rounding::Floor),
            },
            Rule {
                id: "paired_borderline_flags",
                condition: ConsistencyCondition::FewFlags {
                    flags: 2,
                    max_high: 1,
                    evidence: self.paired_borderline_flags.evidence,
                },
                action: discount(&self.paired_borderline_flags, Rounding::Floor),
            },
            Rule {
                id: "consistent_healthy_signals",
                condition: ConsistencyCondition::HealthyEvidence(
                    self.consistent_healthy_signals.evidence,
                ),
                action: discount(&self.consistent_healthy_signals, Rounding::Nearest),
            },
            Rule {
                id: "low_quality_uncertainty",
                condition: ConsistencyCondition::LowQuality {
                    snr_below: penalty.snr_below,
                    confidence_below: penalty.confidence_below,
                },
                action: ConsistencyAction::Penalty {
                    points: penalty.points,
                },
            },
        ]
    }
}

/// Apply the first matching consistency rule to the running score
pub fn apply_consistency(
    ctx: &ScoringContext<'_>,
    tally: Tally,
    extreme_matched: bool,
    config: &ConsistencyConfig,
) -> Tally {
    let rules = config.rules();
    let input = ConsistencyInput::new(ctx, &tally, extreme_matched);
    match first_match(&rules, &input) {
        Some(rule) => rule.action.apply(rule.id, tally),
        None => tally,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::healthy_features;
    use crate::features::AcousticFeatures;
    use crate::quality::{QualityAdaptation, QualityConfig};
    use crate::scoring::StageScore;
    use crate::thresholds::{Language, ThresholdSet};

    struct Fixture {
        features: AcousticFeatures,
        adaptation: QualityAdaptation,
        confidence: Option<f64>,
        accuracy: Option<f64>,
    }

    impl Fixture {
        fn new(
            features: AcousticFeatures,
            snr: Option<f64>,
            confidence: Option<f64>,
            accuracy: Option<f64>,
        ) -> Self {
            Self {
                features,
                adaptation: QualityConfig::default().adapt(&ThresholdSet::english(), snr),
                confidence,
                accuracy,
            }
        }

        fn ctx(&self) -> ScoringContext<'_> {
            ScoringContext {
                language: Language::En,
                features: &self.features,
                adaptation: &self.adaptation,
                intelligibility_confidence: self.confidence,
                word_error_accuracy: self.accuracy,
            }
        }
    }

    fn tally_of(flags: &[(Severity, u32)]) -> Tally {
        let mut stage = StageScore::default();
        for &(severity, points) in flags {
            stage.push(Flag::new(FlagSource::Acoustic, severity, points, "test"));
        }
        Tally::from_stages([stage])
    }

    #[test]
    fn test_first_match_respects_order() {
        // Both extreme_pause and extreme_hnr hold; the earlier row wins
        let fixture = Fixture::new(
            AcousticFeatures {
                pause_ratio: 60.0,
                hnr: 1.0,
                ..healthy_features()
            },
            Some(22.0),
            None,
            None,
        );
        let matched = evaluate_extreme(&fixture.ctx(), &ExtremeConfig::default())
            .unwrap();
        assert_eq!(matched.rule_id, "extreme_pause");
    }

    #[test]
    fn test_extreme_rules_ignore_absent_signals() {
        let fixture = Fixture::new(
            AcousticFeatures {
                hnr: 3.0,
                pause_ratio: 45.0,
                ..healthy_features()
            },
            Some(22.0),
            None,
            None,
        );
        let matched = evaluate_extreme(&fixture.ctx(), &ExtremeConfig::default());
        assert!(matched.is_none());
    }

    #[test]
    fn test_combination_rules() {
        let config = ExtremeConfig::default();

        let paired = Fixture::new(healthy_features(), Some(22.0), Some(65.0), Some(55.0));
        assert_eq!(
            evaluate_extreme(&paired.ctx(), &config).unwrap().rule_id,
            "intelligibility_with_word_errors"
        );

        let pauses = Fixture::new(
            AcousticFeatures {
                pause_ratio: 45.0,
                ..healthy_features()
            },
            Some(22.0),
            None,
            Some(65.0),
        );
        assert_eq!(
            evaluate_extreme(&pauses.ctx(), &config).unwrap().rule_id,
            "pauses_with_poor_intelligibility"
        );

        let hnr = Fixture::new(
            AcousticFeatures {
                hnr: 3.5,
                ..healthy_features()
            },
            Some(22.0),
            Some(68.0),
            None,
        );
        let matched = evaluate_extreme(&hnr.ctx(), &config).unwrap();
        assert_eq!(matched.rule_id, "low_hnr_with_poor_intelligibility");
        assert!(matched.details.contains("HNR 3.5 dB"));
    }

    #[test]
    fn test_override_needs_min_score() {
        let fixture = Fixture::new(
            AcousticFeatures {
                hnr: 1.5,
                ..healthy_features()
            },
            Some(22.0),
            None,
            None,
        );
        let matched = evaluate_extreme(&fixture.ctx(), &ExtremeConfig::default())
            .unwrap();
        assert!(!matched.fires(4));
        assert!(matched.fires(5));
        assert_eq!(matched.flag().severity, Severity::High);
        assert!(matched.flag().message.contains("extreme_hnr"));
    }

    #[test]
    fn test_isolated_flag_discount() {
        let fixture = Fixture::new(healthy_features(), Some(21.0), Some(80.0), Some(95.0));
        let tally = apply_consistency(
            &fixture.ctx(),
            tally_of(&[(Severity::Medium, 2)]),
            false,
            &ConsistencyConfig::default(),
        );
        // floor(2 x 0.2) = 0, kept at the 1 point minimum
        assert_eq!(tally.score, 1);
        assert_eq!(tally.adjustments[0].rule, "isolated_flag");
        assert_eq!(tally.flags.len(), 1, "discounts never remove flags");
    }

    #[test]
    fn test_paired_flags_discount() {
        let fixture = Fixture::new(healthy_features(), Some(21.0), Some(72.0), Some(96.0));
        let tally = apply_consistency(
            &fixture.ctx(),
            tally_of(&[(Severity::High, 5), (Severity::Medium, 2)]),
            false,
            &ConsistencyConfig::default(),
        );
        // floor(7 x 0.3) = 2
        assert_eq!(tally.score, 2);
        assert_eq!(tally.adjustments[0].rule, "paired_borderline_flags");
    }

    #[test]
    fn test_two_high_flags_fall_through_to_general_discount() {
        let fixture = Fixture::new(healthy_features(), Some(21.0), Some(80.0), Some(96.0));
        let tally = apply_consistency(
            &fixture.ctx(),
            tally_of(&[(Severity::High, 5), (Severity::High, 5)]),
            false,
            &ConsistencyConfig::default(),
        );
        // round(10 x 0.4) = 4
        assert_eq!(tally.score, 4);
        assert_eq!(tally.adjustments[0].rule, "consistent_healthy_signals");
    }

    #[test]
    fn test_no_discount_after_extreme_match() {
        let fixture = Fixture::new(healthy_features(), Some(21.0), Some(80.0), Some(96.0));
        let tally = apply_consistency(
            &fixture.ctx(),
            tally_of(&[(Severity::High, 5)]),
            true,
            &ConsistencyConfig::default(),
        );
        assert_eq!(tally.score, 5);
        assert!(tally.adjustments.is_empty());
    }

    #[test]
    fn test_no_discount_without_snr() {
        let fixture = Fixture::new(healthy_features(), None, Some(80.0), Some(96.0));
        let tally = apply_consistency(
            &fixture.ctx(),
            tally_of(&[(Severity::Medium, 2)]),
            false,
            &ConsistencyConfig::default(),
        );
        assert_eq!(tally.score, 2);
    }

    #[test]
    fn test_low_quality_penalty() {
        let fixture = Fixture::new(healthy_features(), Some(8.0), None, None);
        let tally = apply_consistency(
            &fixture.ctx(),
            tally_of(&[(Severity::Medium, 1)]),
            false,
            &ConsistencyConfig::default(),
        );
        assert_eq!(tally.score, 3);
        let note = tally.flags.last().unwrap();
        assert_eq!(note.severity, Severity::Low);
        assert_eq!(note.source, FlagSource::Quality);
        assert_eq!(tally.adjustments[0].rule, "low_quality_uncertainty");
    }
}
