//! Speech intelligibility scoring
//!
//! Two independent speech signals, both optional:
//!
//! - speech-to-text confidence (0-100), scored against its own tiers and
//!   weighted by the intelligibility reliability weight
//! - word accuracy against the expected phrase, converted to WER and scored by
//!   severity tier
//!
//! An absent signal contributes nothing and raises no flag.

use tracing::debug;

use super::{weighted_points, Flag, FlagSource, PointsConfig, ScoringContext, Severity, StageScore};
use crate::wer::{accuracy_to_wer, WerSeverity, WordErrorConfig};

/// Score the speech-to-text confidence
pub fn score(ctx: &ScoringContext<'_>, points: &PointsConfig) -> StageScore {
    let mut stage = StageScore::default();
    let Some(confidence) = ctx.intelligibility_confidence else {
        return stage;
    };

    let tier = if confidence < points.intelligibility_high_below {
        Some((Severity::High, points.intelligibility_high_below))
    } else if confidence < points.intelligibility_medium_below {
        Some((Severity::Medium, points.intelligibility_medium_below))
    } else {
        None
    };

    if let Some((severity, cutoff)) = tier {
        let awarded = weighted_points(
            points.for_severity(severity),
            ctx.adaptation.weights.intelligibility,
        );
        stage.push(Flag::new(
            FlagSource::Intelligibility,
            severity,
            awarded,
            format!(
                "Speech intelligibility {:.0}% is below {:.0}%",
                confidence, cutoff
            ),
        ));
    }

    debug!("Intelligibility score: {} (confidence {:.1})", stage.points, confidence);
    stage
}

/// Score the word accuracy against the expected phrase.
///
/// Returns the stage score and the severity tier, if accuracy was supplied.
pub fn score_word_error(
    ctx: &ScoringContext<'_>,
    config: &WordErrorConfig,
) -> (StageScore, Option<WerSeverity>) {
    let mut stage = StageScore::default();
    let Some(accuracy) = ctx.word_error_accuracy else {
        return (stage, None);
    };

    let wer = accuracy_to_wer(accuracy);
    let severity = config.severity(wer, ctx.language);
    let awarded = config.points.for_severity(severity);

    let flag_severity = match severity {
        WerSeverity::Normal => None,
        WerSeverity::Mild => Some(Severity::Low),
        WerSeverity::Moderate => Some(Severity::Medium),
        WerSeverity::Severe => Some(Severity::High),
    };

    if let Some(flag_severity) = flag_severity {
        stage.push(Flag::new(
            FlagSource::WordError,
            flag_severity,
            awarded,
            format!(
                "Word error rate {:.0}% ({}) reading the screening phrase",
                wer * 100.0,
                severity.label()
            ),
        ));
    }

    debug!("Word-error score: {} (WER {:.2}, {:?})", stage.points, wer, severity);
    (stage, Some(severity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::healthy_features;
    use crate::quality::{QualityAdaptation, QualityConfig};
    use crate::thresholds::{Language, ThresholdSet};

    fn adaptation(snr: Option<f64>) -> QualityAdaptation {
        QualityConfig::default().adapt(&ThresholdSet::english(), snr)
    }

    fn with_signals<R>(
        snr: Option<f64>,
        confidence: Option<f64>,
        accuracy: Option<f64>,
        f: impl FnOnce(&ScoringContext<'_>) -> R,
    ) -> R {
        let features = healthy_features();
        let adaptation = adaptation(snr);
        let ctx = ScoringContext {
            language: Language::En,
            features: &features,
            adaptation: &adaptation,
            intelligibility_confidence: confidence,
            word_error_accuracy: accuracy,
        };
        f(&ctx)
    }

    #[test]
    fn test_absent_confidence_scores_nothing() {
        let stage = with_signals(Some(22.0), None, None, |ctx| {
            score(ctx, &PointsConfig::default())
        });
        assert_eq!(stage, StageScore::default());
    }

    #[test]
    fn test_confidence_tiers() {
        let points = PointsConfig::default();
        let low = with_signals(Some(22.0), Some(45.0), None, |ctx| score(ctx, &points));
        assert_eq!(low.points, 5);
        assert_eq!(low.flags[0].severity, Severity::High);

        let borderline = with_signals(Some(22.0), Some(50.0), None, |ctx| score(ctx, &points));
        assert_eq!(borderline.points, 2);
        assert_eq!(borderline.flags[0].severity, Severity::Medium);

        let clear = with_signals(Some(22.0), Some(65.0), None, |ctx| score(ctx, &points));
        assert_eq!(clear.points, 0);
    }

    #[test]
    fn test_confidence_weighted_in_critical_bin() {
        // 5 x 0.7 = 3.5 -> 4
        let stage = with_signals(Some(8.0), Some(45.0), None, |ctx| {
            score(ctx, &PointsConfig::default())
        });
        assert_eq!(stage.points, 4);
    }

    #[test]
    fn test_word_error_points_by_severity() {
        let config = WordErrorConfig::default();
        let cases = [
            (95.0, 0, WerSeverity::Normal),
            (75.0, 2, WerSeverity::Mild),
            (55.0, 3, WerSeverity::Moderate),
            (30.0, 5, WerSeverity::Severe),
        ];
        for (accuracy, expected_points, expected_severity) in cases {
            let (stage, severity) = with_signals(Some(22.0), None, Some(accuracy), |ctx| {
                score_word_error(ctx, &config)
            });
            assert_eq!(stage.points, expected_points, "accuracy {}", accuracy);
            assert_eq!(severity, Some(expected_severity));
        }
    }

    #[test]
    fn test_word_error_edges_score_lower_tier() {
        let config = WordErrorConfig::default();
        let (normal, severity) =
            with_signals(Some(22.0), None, Some(85.0), |ctx| score_word_error(ctx, &config));
        assert_eq!(severity, Some(WerSeverity::Normal));
        assert_eq!(normal.points, 0);
        assert!(normal.flags.is_empty());

        let (mild, severity) =
            with_signals(Some(22.0), None, Some(70.0), |ctx| score_word_error(ctx, &config));
        assert_eq!(severity, Some(WerSeverity::Mild));
        assert_eq!(mild.points, 2);
        assert_eq!(mild.flags[0].severity, Severity::Low);
    }

    #[test]
    fn test_word_error_flag_message() {
        let (stage, _) = with_signals(Some(22.0), None, Some(55.0), |ctx| {
            score_word_error(ctx, &WordErrorConfig::default())
        });
        assert_eq!(stage.flags[0].source, FlagSource::WordError);
        assert!(stage.flags[0].message.starts_with("Word error rate 45%"));
        assert!(stage.flags[0].message.contains("moderate"));
    }
}
