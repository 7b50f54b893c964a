//! End-to-end scenarios through the full engine pipeline

use crate::classify::TriageLevel;
use crate::config::EngineConfig;
use crate::engine::TriageEngine;
use crate::enrich::STROKE_WARNING_MESSAGE;
use crate::features::tests::healthy_features;
use crate::features::AcousticFeatures;
use crate::quality::QualityConfig;
use crate::questionnaire::{QuestionnaireSummary, RiskLevel, SuddenEvent};
use crate::request::TriageRequest;
use crate::result::TriageResult;
use crate::scoring::{weighted_points, FlagSource, Severity};
use crate::thresholds::{Language, ThresholdSet};
use crate::wer::{WerSeverity, WordErrorConfig};

fn assess(request: TriageRequest) -> TriageResult {
    TriageEngine::default().assess(&request.validate().unwrap())
}

fn pathological_features() -> AcousticFeatures {
    AcousticFeatures {
        shimmer: 8.0,
        hnr: 4.0,
        pause_ratio: 35.0,
        ..healthy_features()
    }
}

#[test]
fn test_clean_healthy_recording() {
    let request = TriageRequest::new(Language::En, healthy_features());
    let result = assess(request.with_quality(22.0, None));

    assert_eq!(result.level, TriageLevel::Green);
    assert_eq!(result.score, 0);
    assert!(result.confidence >= 70);
    assert!(result.detailed_flags.is_empty());
    assert!(result.message.starts_with("NORMAL"));
    assert_eq!(result.override_rule, None);
}

#[test]
fn test_pathological_noisy_recording() {
    let request = TriageRequest::new(Language::En, pathological_features())
        .with_quality(8.0, Some(55.0))
        .with_speech(45.0, Some(55.0));
    let result = assess(request);

    assert_eq!(result.level, TriageLevel::Red);
    assert!(result.confidence <= 60);
    assert_eq!(result.override_rule.as_deref(), Some("intelligibility_with_word_errors"));
    assert_eq!(result.score_breakdown.acoustic, 7);
    assert_eq!(result.score_breakdown.intelligibility, 4);
    assert_eq!(result.score_breakdown.word_error, 3);
    assert_eq!(result.score, 16);
    assert!(result.message.ends_with("(QUALITY-LIMITED RESULT)"));
    assert!(result.action.contains("Re-record"));
    assert!(result.quality.re_record_advised);
}

#[test]
fn test_noisy_but_healthy_signals_discount() {
    let features = AcousticFeatures {
        shimmer: 6.5,
        ..healthy_features()
    };
    let request = TriageRequest::new(Language::En, features)
        .with_quality(21.0, None)
        .with_speech(80.0, Some(95.0));
    let result = assess(request);

    assert_eq!(result.level, TriageLevel::Green);
    assert!(result.score <= 1);
    assert_eq!(result.adjustments.len(), 1);
    assert_eq!(result.adjustments[0].rule, "isolated_flag");
    assert_eq!(result.adjustments[0].before, 2);
}

#[test]
fn test_isolated_flag_discount_at_accuracy_edge() {
    let features = AcousticFeatures {
        shimmer: 6.5,
        ..healthy_features()
    };
    let request = TriageRequest::new(Language::En, features)
        .with_quality(22.0, None)
        .with_speech(80.0, Some(85.0));
    let result = assess(request);

    assert!(result
        .detailed_flags
        .iter()
        .all(|f| f.source != FlagSource::WordError));
    assert_eq!(result.score_breakdown.word_error, 0);
    assert_eq!(result.adjustments.len(), 1);
    assert_eq!(result.adjustments[0].rule, "isolated_flag");
    assert_eq!(result.adjustments[0].before, 2);
    assert_eq!(result.score, 1);
}

#[test]
fn test_stroke_warning_escalates_green() {
    let features = AcousticFeatures {
        jitter: 2.5,
        voice_breaks: 3,
        ..healthy_features()
    };
    let questionnaire = QuestionnaireSummary {
        score: 3.0,
        risk_level: RiskLevel::Low,
        has_confounding: false,
        confidence_modifier: 1.0,
        sudden_events: vec![SuddenEvent::SuddenWeakness],
    };
    let request = TriageRequest::new(Language::En, features)
        .with_quality(13.0, Some(60.0));

    let base = assess(request.clone());
    assert_eq!(base.level, TriageLevel::Green);
    assert_eq!(base.score, 3);

    let result = assess(request.with_questionnaire(questionnaire));
    assert_eq!(result.level, TriageLevel::Yellow);
    assert_eq!(result.message, STROKE_WARNING_MESSAGE);
    assert_eq!(result.escalations.len(), 1);
    assert_eq!(result.escalations[0].from, TriageLevel::Green);
    assert!(result
        .detailed_flags
        .iter()
        .any(|f| f.source == FlagSource::Questionnaire));
}

#[test]
fn test_severe_shimmer_always_raises_high_flag() {
    let engine = TriageEngine::default();
    let quality = QualityConfig::default();
    for snr in [Some(25.0), Some(17.0), Some(13.0), Some(11.0), Some(8.0), Some(5.0), None] {
        let weight = quality.profile(quality.classify(snr)).weights.shimmer;
        let with_snr = |features: AcousticFeatures| {
            let request = TriageRequest::new(Language::En, features);
            let request = match snr {
                Some(snr) => request.with_quality(snr, None),
                None => request,
            };
            request.validate().unwrap()
        };

        let baseline = engine.evaluate(&with_snr(healthy_features()));
        for shimmer in [10.05, 10.3, 12.0] {
            let severe = engine.evaluate(&with_snr(AcousticFeatures {
                shimmer,
                ..healthy_features()
            }));

            assert!(
                severe
                    .detailed_flags
                    .iter()
                    .any(|f| f.source == FlagSource::Acoustic && f.severity == Severity::High),
                "no high flag for shimmer {} at SNR {:?}",
                shimmer,
                snr
            );
            let increase = severe.score - baseline.score;
            assert!(
                increase >= weighted_points(5, weight),
                "increase {} for shimmer {} at SNR {:?}",
                increase,
                shimmer,
                snr
            );
        }
    }
}

#[test]
fn test_very_noisy_recordings_cap_confidence() {
    let severe = AcousticFeatures {
        shimmer: 14.0,
        hnr: 1.0,
        pause_ratio: 60.0,
        speech_rate: 0.4,
        ..healthy_features()
    };
    let questionnaire = QuestionnaireSummary {
        score: 20.0,
        risk_level: RiskLevel::High,
        has_confounding: false,
        confidence_modifier: 1.3,
        sudden_events: vec![SuddenEvent::SuddenConfusion],
    };

    for snr in [0.0, 5.0, 7.9] {
        for features in [healthy_features(), pathological_features(), severe.clone()] {
            let request = TriageRequest::new(Language::En, features)
                .with_quality(snr, Some(50.0));
            assert!(assess(request.clone()).confidence <= 60);
            let clear_speech = request.clone().with_speech(95.0, Some(100.0));
            assert!(assess(clear_speech).confidence <= 60);
            assert!(assess(request.with_questionnaire(questionnaire.clone())).confidence <= 60);
        }
    }
}

#[test]
fn test_clean_recordings_keep_base_thresholds() {
    let quality = QualityConfig::default();
    for base in [ThresholdSet::english(), ThresholdSet::arabic()] {
        for snr in [20.0, 24.5, 40.0] {
            assert_eq!(quality.adapt(&base, Some(snr)).thresholds, base);
        }
    }
}

#[test]
fn test_expected_phrase_has_no_word_errors() {
    let config = WordErrorConfig::default();
    let english = config.evaluate("The sky is blue, in Cincinnati!", Language::En);
    assert_eq!(english.wer, 0.0);
    assert_eq!(english.severity, WerSeverity::Normal);
    assert_eq!(english.points, 0);

    let arabic = config.evaluate(&config.arabic_phrase, Language::Ar);
    assert_eq!(arabic.wer, 0.0);
    assert_eq!(arabic.points, 0);
}

#[test]
fn test_engine_is_idempotent() {
    let engine = TriageEngine::new(EngineConfig::default());
    let request = TriageRequest::new(Language::En, pathological_features())
        .with_quality(14.0, Some(70.0))
        .with_speech(68.0, Some(80.0))
        .validate()
        .unwrap();

    let first = engine.assess(&request);
    let second = engine.assess(&request);
    assert_eq!(first, second);
}

#[test]
fn test_arabic_speech_rate_profile() {
    let features = AcousticFeatures {
        speech_rate: 1.7,
        ..healthy_features()
    };
    let english = TriageRequest::new(Language::En, features.clone());
    let arabic = TriageRequest::new(Language::Ar, features);
    let english = assess(english.with_quality(22.0, None));
    let arabic = assess(arabic.with_quality(22.0, None));

    assert_eq!(english.score, 2);
    assert_eq!(arabic.score, 0);
}

#[test]
fn test_result_wire_format() {
    let result = assess(
        TriageRequest::new(Language::En, pathological_features())
            .with_quality(16.0, Some(60.0))
            .with_speech(72.0, Some(80.0)),
    );
    let json = serde_json::to_value(&result).unwrap();

    assert!(matches!(json["level"].as_str(), Some("RED" | "YELLOW" | "GREEN")));
    assert!(json["flags"].is_array());
    assert!(json["detailed_flags"][0]["severity"].is_string());
    assert!(json["detailed_flags"][0]["points"].is_number());
    assert!(json["agreement"]["consensus_level"].is_string());
    assert!(json["agreement"]["method_details"].is_array());
    assert!(json["score_breakdown"]["acoustic"].is_number());
    assert!(json["level_rule"].is_string());
    assert_eq!(
        json["queue_priority"].as_u64(),
        Some(u64::from(result.level.queue_priority(result.confidence)))
    );
}
