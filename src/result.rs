//! Output contract of the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agreement::AgreementResult;
use crate::classify::{LevelRule, TriageLevel, QUALITY_LIMITED_SUFFIX, RE_RECORD_ADVICE};
use crate::quality::QualityBin;
use crate::questionnaire::QuestionnaireSummary;
use crate::request::TriageRequest;
use crate::scoring::{Flag, ScoreAdjustment};

/// Where the final score came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub acoustic: u32,
    pub intelligibility: u32,
    pub word_error: u32,
    /// Net change from the consistency rules
    pub adjustment: i64,
    #[serde(default)]
    pub questionnaire: Option<f64>,
}

/// Quality context the result was produced under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub bin: QualityBin,
    pub snr_db: Option<f64>,
    pub confidence_modifier: i32,
    pub quality_limited: bool,
    pub max_confidence: Option<u32>,
    pub show_warning: bool,
    /// SNR low enough that the result text advises re-recording
    pub re_record_advised: bool,
}

/// A level change applied after the primary decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    pub rule: String,
    pub from: TriageLevel,
    pub to: TriageLevel,
    pub explanation: String,
}

/// One triage decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub level: TriageLevel,
    pub score: u32,
    /// 0-100
    pub confidence: u32,
    /// Decision-tree branch behind the primary level
    pub level_rule: LevelRule,
    /// Review queue position in [1, 9], kept in step with level and confidence
    pub queue_priority: u8,
    pub message: String,
    pub action: String,
    /// Flag messages, in the order raised
    pub flags: Vec<String>,
    pub detailed_flags: Vec<Flag>,
    pub adjustments: Vec<ScoreAdjustment>,
    pub override_rule: Option<String>,
    pub quality: QualitySummary,
    pub inputs: TriageRequest,
    pub score_breakdown: ScoreBreakdown,
    #[serde(default)]
    pub agreement: Option<AgreementResult>,
    #[serde(default)]
    pub questionnaire: Option<QuestionnaireSummary>,
    /// Escalations applied after the primary decision, in order
    #[serde(default)]
    pub escalations: Vec<Escalation>,
    pub timestamp: DateTime<Utc>,
}

impl TriageResult {
    pub fn refresh_queue_priority(&mut self) {
        self.queue_priority = self.level.queue_priority(self.confidence);
    }

    /// Append a flag, keeping the plain message list in step
    pub fn push_flag(&mut self, flag: Flag) {
        self.flags.push(flag.message.clone());
        self.detailed_flags.push(flag);
    }

    /// Clamp a confidence to the quality cap this result was produced under
    pub fn capped(&self, confidence: u32) -> u32 {
        match self.quality.max_confidence {
            Some(cap) => confidence.min(cap),
            None => confidence,
        }
    }

    /// Replace message and action, keeping the quality-limited markers
    pub fn set_text(&mut self, message: &str, action: &str) {
        self.message = message.to_string();
        self.action = action.to_string();
        if self.quality.re_record_advised {
            self.message.push_str(QUALITY_LIMITED_SUFFIX);
            self.action.push_str(RE_RECORD_ADVICE);
        }
    }

    /// Change the level, switching to the level's template
    pub fn escalate(&mut self, to: TriageLevel, rule: &str, explanation: String) {
        let from = self.level;
        let (message, action) = to.template();
        self.level = to;
        self.set_text(message, action);
        self.escalations.push(Escalation {
            rule: rule.to_string(),
            from,
            to,
            explanation,
        });
    }
}
