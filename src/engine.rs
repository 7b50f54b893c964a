//! Triage decision engine
//!
//! Runs the scoring pipeline over one validated request:
//!
//! ```text
//! thresholds + quality adaptation
//!   -> acoustic, intelligibility and word-error stages
//!   -> extreme-value rules (evaluated), consistency rules (adjust score)
//!   -> level classifier -> confidence calculator
//! ```
//!
//! The engine holds only an immutable [`EngineConfig`]. Every invocation
//! builds its own scoring context and result, so one engine can serve any
//! number of concurrent requests.

use tracing::{debug, info};

use crate::agreement::{self, confidence_from_logprob, AgreementResult};
use crate::classify::{calculate_confidence, classify, QUALITY_LIMITED_SUFFIX, RE_RECORD_ADVICE};
use crate::config::EngineConfig;
use crate::enrich;
use crate::result::{QualitySummary, ScoreBreakdown, TriageResult};
use crate::scoring::rules::{apply_consistency, evaluate_extreme};
use crate::scoring::{acoustic, intelligibility, ScoringContext, Tally};
use crate::thresholds::ThresholdProvider;
use crate::validation::ValidatedRequest;

/// Stateless triage engine
#[derive(Debug, Clone, Default)]
pub struct TriageEngine {
    config: EngineConfig,
}

impl TriageEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Primary decision for one request
    pub fn evaluate(&self, request: &ValidatedRequest) -> TriageResult {
        let config = &self.config;

        let provider = ThresholdProvider::new(&config.thresholds);
        let base = provider.for_language(request.language);
        let adaptation = config.quality.adapt(base, request.snr_db);

        // A raw log-probability stands in for a missing confidence
        let intelligibility_confidence = request
            .intelligibility_confidence
            .or_else(|| request.avg_logprob.map(confidence_from_logprob));

        let ctx = ScoringContext {
            language: request.language,
            features: &request.features,
            adaptation: &adaptation,
            intelligibility_confidence,
            word_error_accuracy: request.word_error_accuracy,
        };

        let voice = acoustic::score(&ctx, &config.points);
        let speech = intelligibility::score(&ctx, &config.points);
        let (word_error, _) = intelligibility::score_word_error(&ctx, &config.word_error);

        let mut breakdown = ScoreBreakdown {
            acoustic: voice.points,
            intelligibility: speech.points,
            word_error: word_error.points,
            adjustment: 0,
            questionnaire: None,
        };

        let tally = Tally::from_stages([voice, speech, word_error]);
        let extreme = evaluate_extreme(&ctx, &config.extreme);
        let mut tally = apply_consistency(&ctx, tally, extreme.is_some(), &config.consistency);
        breakdown.adjustment = tally.adjustments.iter().map(|a| a.delta()).sum();

        let fired = extreme.filter(|matched| matched.fires(tally.score));
        if let Some(matched) = &fired {
            tally = tally.with_flag(matched.flag());
        }

        let classification = classify(tally.score, &tally.flags, fired.is_some(), &config.levels);
        let outcome =
            calculate_confidence(&classification, tally.score, &adaptation, &config.levels);
        tally.flags.extend(outcome.flags);

        let (message, action) = classification.level.template();
        let mut message = message.to_string();
        let mut action = action.to_string();
        if outcome.quality_limited_message {
            message.push_str(QUALITY_LIMITED_SUFFIX);
            action.push_str(RE_RECORD_ADVICE);
        }

        let limits = adaptation.limits;
        let quality = QualitySummary {
            bin: adaptation.bin,
            snr_db: adaptation.snr_db,
            confidence_modifier: adaptation.confidence_modifier,
            quality_limited: limits.is_some(),
            max_confidence: limits.map(|l| l.max_confidence),
            show_warning: limits.map_or(false, |l| l.show_warning),
            re_record_advised: outcome.quality_limited_message,
        };

        info!(
            "Triage {} (score {}, confidence {}, bin {})",
            classification.level,
            tally.score,
            outcome.confidence,
            adaptation.bin.label()
        );

        TriageResult {
            level: classification.level,
            score: tally.score,
            confidence: outcome.confidence,
            level_rule: classification.rule,
            queue_priority: classification.level.queue_priority(outcome.confidence),
            message,
            action,
            flags: tally.flags.iter().map(|f| f.message.clone()).collect(),
            detailed_flags: tally.flags,
            adjustments: tally.adjustments,
            override_rule: fired.map(|matched| matched.rule_id.to_string()),
            quality,
            inputs: request.request().clone(),
            score_breakdown: breakdown,
            agreement: None,
            questionnaire: None,
            escalations: Vec::new(),
            timestamp: request.recorded_at,
        }
    }

    /// Independent per-method verdicts for the same request
    pub fn agreement(&self, request: &ValidatedRequest, primary: &TriageResult) -> AgreementResult {
        agreement::assess(
            request,
            primary.score_breakdown.acoustic,
            self.config.points.max_acoustic_score(),
            &self.config.agreement,
            &self.config.word_error,
        )
    }

    /// Primary decision merged with agreement and, when the request carries
    /// one, the questionnaire
    pub fn assess(&self, request: &ValidatedRequest) -> TriageResult {
        let primary = self.evaluate(request);
        let consensus = self.agreement(request, &primary);
        let merged = enrich::apply_agreement(&primary, consensus, &self.config);

        match &request.questionnaire {
            Some(summary) => {
                debug!("Applying questionnaire (score {})", summary.score);
                enrich::apply_questionnaire(&merged, summary, &self.config)
            }
            None => merged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TriageLevel;
    use crate::features::tests::healthy_features;
    use crate::features::AcousticFeatures;
    use crate::request::TriageRequest;
    use crate::thresholds::Language;

    fn validated(request: TriageRequest) -> ValidatedRequest {
        request.validate().unwrap()
    }

    #[test]
    fn test_logprob_stands_in_for_confidence() {
        let mut request = TriageRequest::new(Language::En, healthy_features())
            .with_quality(22.0, None);
        request.avg_logprob = Some(-1.5);

        let result = TriageEngine::default().evaluate(&validated(request));
        assert_eq!(result.score_breakdown.intelligibility, 5);
        assert_eq!(result.level, TriageLevel::Yellow);
        assert_eq!(result.inputs.intelligibility_confidence, None);
    }

    #[test]
    fn test_override_needs_minimum_score() {
        let features = AcousticFeatures {
            pause_ratio: 60.0,
            ..healthy_features()
        };
        let request = TriageRequest::new(Language::En, features).with_quality(22.0, None);
        let request = validated(request);

        let result = TriageEngine::default().evaluate(&request);
        assert_eq!(result.override_rule.as_deref(), Some("extreme_pause"));
        assert_eq!(result.level, TriageLevel::Red);

        let mut config = EngineConfig::default();
        config.extreme.min_score = 8;
        let result = TriageEngine::new(config).evaluate(&request);
        assert_eq!(result.override_rule, None);
        assert_eq!(result.level, TriageLevel::Yellow);
        assert!(!result
            .detailed_flags
            .iter()
            .any(|f| f.message.contains("Extreme-value")));
    }

    #[test]
    fn test_breakdown_records_adjustment() {
        let features = AcousticFeatures {
            shimmer: 6.5,
            ..healthy_features()
        };
        let request = TriageRequest::new(Language::En, features)
            .with_quality(21.0, None)
            .with_speech(80.0, Some(95.0));

        let result = TriageEngine::default().evaluate(&validated(request));
        assert_eq!(result.score_breakdown.acoustic, 2);
        assert_eq!(result.score_breakdown.adjustment, -1);
        assert_eq!(result.score, 1);
        assert_eq!(result.confidence, 79);
        assert_eq!(result.flags.len(), result.detailed_flags.len());
    }

    #[test]
    fn test_timestamp_echoes_request() {
        let request = validated(TriageRequest::new(Language::En, healthy_features()));
        let result = TriageEngine::default().evaluate(&request);
        assert_eq!(result.timestamp, request.recorded_at);
        assert!(result.agreement.is_none());
    }

    #[test]
    fn test_assess_merges_agreement() {
        let request = validated(
            TriageRequest::new(Language::En, healthy_features())
                .with_quality(22.0, Some(60.0))
                .with_speech(90.0, Some(100.0)),
        );
        let engine = TriageEngine::default();
        let primary = engine.evaluate(&request);
        let merged = engine.assess(&request);

        assert_eq!(primary.confidence, 85);
        assert_eq!(merged.confidence, 95);
        assert_eq!(merged.level, primary.level);
        assert!(merged.agreement.is_some());
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TriageEngine>();
        assert_send_sync::<ValidatedRequest>();
        assert_send_sync::<TriageResult>();
    }

    #[test]
    fn test_concurrent_assessments_match_sequential() {
        let requests: Vec<ValidatedRequest> = [
            (healthy_features(), 22.0, 90.0, 100.0),
            (
                AcousticFeatures {
                    shimmer: 8.0,
                    hnr: 4.0,
                    pause_ratio: 35.0,
                    ..healthy_features()
                },
                8.0,
                45.0,
                55.0,
            ),
            (
                AcousticFeatures {
                    jitter: 2.5,
                    voice_breaks: 3,
                    ..healthy_features()
                },
                13.0,
                70.0,
                85.0,
            ),
            (
                AcousticFeatures {
                    shimmer: 12.0,
                    pause_ratio: 60.0,
                    ..healthy_features()
                },
                17.0,
                60.0,
                70.0,
            ),
        ]
        .into_iter()
        .map(|(features, snr, confidence, accuracy)| {
            validated(
                TriageRequest::new(Language::En, features)
                    .with_quality(snr, Some(60.0))
                    .with_speech(confidence, Some(accuracy)),
            )
        })
        .collect();

        let engine = TriageEngine::default();
        let sequential: Vec<TriageResult> =
            requests.iter().map(|request| engine.assess(request)).collect();

        let shared = &engine;
        let concurrent: Vec<TriageResult> = std::thread::scope(|scope| {
            let handles: Vec<_> = requests
                .iter()
                .map(|request| scope.spawn(move || shared.assess(request)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(concurrent, sequential);
    }
}
