//! Caller-side enrichment
//!
//! Merges the agreement consensus and the questionnaire into a primary
//! result. Both functions take the result by reference and return an updated
//! copy; a returned result is never modified.
//!
//! ## Questionnaire escalation
//!
//! Applied last, first match wins for GREEN results:
//!
//! 1. combined voice + questionnaire score >= 18 forces RED (any level)
//! 2. stroke warning signs with voice findings -> YELLOW, FAST template
//! 3. combined score >= 10 -> YELLOW
//! 4. high questionnaire risk with voice score >= 5 -> YELLOW
//!
//! Escalation never lowers a level.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agreement::{AgreementResult, Consensus, Verdict};
use crate::classify::TriageLevel;
use crate::config::EngineConfig;
use crate::questionnaire::{QuestionnaireSummary, RiskLevel};
use crate::result::TriageResult;
use crate::scoring::{Flag, FlagSource, Severity};

/// Message of the stroke-warning escalation
pub const STROKE_WARNING_MESSAGE: &str = "URGENT - STROKE WARNING SIGNS: Sudden weakness or \
confusion was reported together with voice changes.";

/// Action of the stroke-warning escalation (FAST protocol)
pub const STROKE_WARNING_ACTION: &str = "Check F.A.S.T. now: Face drooping, Arm weakness, \
Speech difficulty, Time to call emergency services. If any sign is present call emergency \
services immediately, otherwise seek a medical evaluation today.";

/// Questionnaire escalation cutoffs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationConfig {
    pub red_combined_score: f64,
    pub red_min_confidence: u32,
    pub stroke_min_voice_score: u32,
    pub stroke_min_confidence: u32,
    pub yellow_combined_score: f64,
    pub high_risk_min_voice_score: u32,
    pub yellow_min_confidence: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            red_combined_score: 18.0,
            red_min_confidence: 75,
            stroke_min_voice_score: 2,
            stroke_min_confidence: 70,
            yellow_combined_score: 10.0,
            high_risk_min_voice_score: 5,
            yellow_min_confidence: 65,
        }
    }
}

/// Merge the agreement consensus into a result
pub fn apply_agreement(
    result: &TriageResult,
    agreement: AgreementResult,
    config: &EngineConfig,
) -> TriageResult {
    let settings = &config.agreement;
    let mut enriched = result.clone();

    let before = enriched.confidence;
    let adjusted = match agreement.consensus {
        Consensus::Unanimous => {
            (before + settings.unanimous_bonus).min(settings.unanimous_cap.max(before))
        }
        Consensus::Conflicting if before > settings.conflicting_floor => {
            before
                .saturating_sub(settings.conflicting_penalty)
                .max(settings.conflicting_floor)
        }
        _ => before,
    };
    enriched.confidence = enriched.capped(adjusted);

    if settings.escalate_on_critical
        && agreement.voice_verdict() == Verdict::Critical
        && enriched.level == TriageLevel::Green
    {
        let floor = config.levels.yellow_confidence.base.max(0) as u32;
        enriched.escalate(
            TriageLevel::Yellow,
            "critical_consensus",
            "Independent methods reached a critical consensus on a GREEN result".to_string(),
        );
        enriched.confidence = enriched.capped(enriched.confidence.max(floor));
        enriched.push_flag(Flag::note(
            FlagSource::Agreement,
            Severity::Medium,
            format!(
                "Critical consensus across {} of {} methods; escalated from GREEN",
                agreement.methods_agreeing, agreement.total_methods
            ),
        ));
        info!("Agreement escalated GREEN -> YELLOW");
    }

    if enriched.confidence != before {
        info!(
            "Agreement {:?}: confidence {} -> {}",
            agreement.consensus, before, enriched.confidence
        );
    }

    enriched.agreement = Some(agreement);
    enriched.refresh_queue_priority();
    enriched
}

/// Replace non-finite questionnaire values before they can reach a score
fn guarded(summary: &QuestionnaireSummary) -> QuestionnaireSummary {
    let mut summary = summary.clone();
    if !summary.score.is_finite() {
        warn!("Non-finite questionnaire score {}, treating as 0", summary.score);
        summary.score = 0.0;
    }
    if !summary.confidence_modifier.is_finite() {
        warn!(
            "Non-finite questionnaire confidence modifier {}, treating as 1.0",
            summary.confidence_modifier
        );
        summary.confidence_modifier = 1.0;
    }
    summary
}

/// Merge the questionnaire into a result and apply level escalation
pub fn apply_questionnaire(
    result: &TriageResult,
    summary: &QuestionnaireSummary,
    config: &EngineConfig,
) -> TriageResult {
    let settings = &config.questionnaire_escalation;
    let levels = &config.levels;
    let summary = guarded(summary);
    let mut enriched = result.clone();

    // The modifier expresses trust in a voice abnormality; GREEN has none
    if enriched.level != TriageLevel::Green && summary.confidence_modifier != 1.0 {
        let scaled = (f64::from(enriched.confidence) * summary.confidence_modifier)
            .round()
            .clamp(levels.min_confidence as f64, levels.max_confidence as f64);
        enriched.confidence = enriched.capped(scaled as u32);
    }

    let voice = enriched.score;
    let combined = f64::from(voice) + summary.score;
    enriched.score_breakdown.questionnaire = Some(summary.score);

    if combined >= settings.red_combined_score && enriched.level != TriageLevel::Red {
        enriched.escalate(
            TriageLevel::Red,
            "combined_score_red",
            format!(
                "Voice score {} plus questionnaire score {} reaches {}",
                voice, summary.score, combined
            ),
        );
        enriched.confidence = enriched.capped(enriched.confidence.max(settings.red_min_confidence));
    } else if enriched.level == TriageLevel::Green {
        if summary.has_stroke_warning() && voice >= settings.stroke_min_voice_score {
            enriched.escalate(
                TriageLevel::Yellow,
                "stroke_warning_signs",
                format!("Sudden weakness or confusion reported with voice score {}", voice),
            );
            enriched.set_text(STROKE_WARNING_MESSAGE, STROKE_WARNING_ACTION);
            let floor = settings.stroke_min_confidence;
            enriched.confidence = enriched.capped(enriched.confidence.max(floor));
        } else if combined >= settings.yellow_combined_score {
            enriched.escalate(
                TriageLevel::Yellow,
                "combined_score_yellow",
                format!(
                    "Voice score {} plus questionnaire score {} reaches {}",
                    voice, summary.score, combined
                ),
            );
            let floor = settings.yellow_min_confidence;
            enriched.confidence = enriched.capped(enriched.confidence.max(floor));
        } else if summary.risk_level == RiskLevel::High
            && voice >= settings.high_risk_min_voice_score
        {
            enriched.escalate(
                TriageLevel::Yellow,
                "high_risk_with_voice_findings",
                format!("High questionnaire risk with voice score {}", voice),
            );
            let floor = settings.yellow_min_confidence;
            enriched.confidence = enriched.capped(enriched.confidence.max(floor));
        }
    }

    let escalated = enriched.escalations.len() > result.escalations.len();
    let latest = enriched.escalations.last().filter(|_| escalated).cloned();
    if let Some(escalation) = latest {
        info!("Questionnaire escalation {}: {}", escalation.rule, escalation.explanation);
        enriched.push_flag(Flag::note(
            FlagSource::Questionnaire,
            Severity::High,
            format!("Questionnaire escalation ({}): {}", escalation.rule, escalation.explanation),
        ));
    }

    enriched.questionnaire = Some(summary);
    enriched.refresh_queue_priority();
    enriched
}
