//! Level classification and confidence
//!
//! The level is picked by an ordered decision tree over the final score and
//! the flag composition, not by a single score cutoff. Each branch carries its
//! own base-confidence formula, which the confidence calculator then shifts by
//! the quality-bin modifier and caps in quality-limited mode.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::quality::QualityAdaptation;
use crate::scoring::{Flag, FlagSource, Severity};

/// Triage urgency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriageLevel {
    /// Emergency
    Red,
    /// Urgent, evaluation within 24-48 hours
    Yellow,
    /// Routine monitoring
    Green,
}

impl TriageLevel {
    /// Base position in a review queue (1 = first)
    pub fn base_priority(&self) -> u8 {
        match self {
            Self::Red => 1,
            Self::Yellow => 4,
            Self::Green => 7,
        }
    }

    /// Queue priority in [1, 9]. Less confident results of the same level
    /// sort behind more confident ones.
    pub fn queue_priority(&self, confidence: u32) -> u8 {
        let offset = 2 - i64::from(confidence.min(100) / 50);
        (i64::from(self.base_priority()) + offset).clamp(1, 9) as u8
    }

    /// Fixed message/action template
    pub fn template(&self) -> (&'static str, &'static str) {
        match self {
            Self::Red => (
                "EMERGENCY: Voice analysis shows signs consistent with a serious acute condition.",
                "Call emergency services immediately. Do not wait to see if symptoms improve.",
            ),
            Self::Yellow => (
                "URGENT: Voice analysis shows abnormalities that need medical attention.",
                "Schedule a medical evaluation within 24-48 hours. Seek emergency care if symptoms worsen.",
            ),
            Self::Green => (
                "NORMAL: No significant voice abnormalities detected.",
                "Continue to monitor. Repeat the check if new symptoms appear.",
            ),
        }
    }
}

impl std::fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Red => "RED",
            Self::Yellow => "YELLOW",
            Self::Green => "GREEN",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for TriageLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RED" => Ok(Self::Red),
            "YELLOW" => Ok(Self::Yellow),
            "GREEN" => Ok(Self::Green),
            _ => Err(format!("Unknown triage level: {}", s)),
        }
    }
}

/// Linear base-confidence formula: `base + step * (score - pivot)`, capped
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFormula {
    pub base: i64,
    pub step: i64,
    pub pivot: i64,
    pub cap: i64,
}

impl ConfidenceFormula {
    pub fn evaluate(&self, score: u32) -> i64 {
        (self.base + self.step * (i64::from(score) - self.pivot)).min(self.cap)
    }
}

/// Decision-tree cutoffs and per-branch confidence formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub red_min_score: u32,
    pub red_min_high_flags: usize,
    pub red_combo_min_score: u32,
    pub red_combo_min_high_flags: usize,
    pub red_combo_min_medium_flags: usize,
    /// Score that is RED on its own
    pub red_score: u32,
    pub yellow_score: u32,
    pub override_confidence: ConfidenceFormula,
    pub red_confidence: ConfidenceFormula,
    pub yellow_confidence: ConfidenceFormula,
    /// Negative step: GREEN confidence rises as the score falls
    pub green_confidence: ConfidenceFormula,
    pub min_confidence: i64,
    pub max_confidence: i64,
    /// Cap on a clean GREEN result when multiple flags are required
    pub clean_green_cap: u32,
    /// Below this SNR the message is marked quality-limited
    pub re_record_below_snr_db: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            red_min_score: 10,
            red_min_high_flags: 2,
            red_combo_min_score: 12,
            red_combo_min_high_flags: 1,
            red_combo_min_medium_flags: 2,
            red_score: 15,
            yellow_score: 5,
            override_confidence: ConfidenceFormula {
                base: 80,
                step: 2,
                pivot: 5,
                cap: 95,
            },
            red_confidence: ConfidenceFormula {
                base: 70,
                step: 3,
                pivot: 10,
                cap: 95,
            },
            yellow_confidence: ConfidenceFormula {
                base: 60,
                step: 4,
                pivot: 5,
                cap: 85,
            },
            green_confidence: ConfidenceFormula {
                base: 50,
                step: -6,
                pivot: 5,
                cap: 80,
            },
            min_confidence: 30,
            max_confidence: 95,
            clean_green_cap: 50,
            re_record_below_snr_db: 10.0,
        }
    }
}

/// Which branch of the decision tree fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelRule {
    ExtremeOverride,
    MultipleHighFlags,
    MixedSeverityFlags,
    HighScore,
    ModerateScore,
    LowScore,
}

/// Output of the decision tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub level: TriageLevel,
    pub rule: LevelRule,
    /// Confidence before quality adjustment
    pub base_confidence: i64,
}

/// Pick a level from the final score and flags.
///
/// `override_fired` means an extreme-value rule matched and the score reached
/// the rule's minimum.
pub fn classify(
    score: u32,
    flags: &[Flag],
    override_fired: bool,
    config: &LevelConfig,
) -> Classification {
    let count = |severity: Severity| flags.iter().filter(|f| f.severity == severity).count();
    let high = count(Severity::High);
    let medium = count(Severity::Medium);

    let (level, rule, formula) = if override_fired {
        (TriageLevel::Red, LevelRule::ExtremeOverride, &config.override_confidence)
    } else if score >= config.red_min_score && high >= config.red_min_high_flags {
        (TriageLevel::Red, LevelRule::MultipleHighFlags, &config.red_confidence)
    } else if score >= config.red_combo_min_score
        && high >= config.red_combo_min_high_flags
        && medium >= config.red_combo_min_medium_flags
    {
        (TriageLevel::Red, LevelRule::MixedSeverityFlags, &config.red_confidence)
    } else if score >= config.red_score {
        (TriageLevel::Red, LevelRule::HighScore, &config.red_confidence)
    } else if score >= config.yellow_score {
        (TriageLevel::Yellow, LevelRule::ModerateScore, &config.yellow_confidence)
    } else {
        (TriageLevel::Green, LevelRule::LowScore, &config.green_confidence)
    };

    let base_confidence = formula.evaluate(score);
    debug!(
        "Classified {} via {:?} (score {}, {} high, {} medium), base confidence {}",
        level, rule, score, high, medium, base_confidence
    );

    Classification {
        level,
        rule,
        base_confidence,
    }
}

/// Final confidence with the quality-driven side effects on the result text
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceOutcome {
    pub confidence: u32,
    /// Caution flags to append
    pub flags: Vec<Flag>,
    pub quality_limited_message: bool,
}

/// Apply the quality modifier, clamp, quality cap and clean-result caution
pub fn calculate_confidence(
    classification: &Classification,
    score: u32,
    adaptation: &QualityAdaptation,
    config: &LevelConfig,
) -> ConfidenceOutcome {
    let adjusted = (classification.base_confidence + i64::from(adaptation.confidence_modifier))
        .clamp(config.min_confidence, config.max_confidence);
    let mut confidence = adjusted as u32;
    let mut flags = Vec::new();

    if let Some(limits) = adaptation.limits {
        confidence = confidence.min(limits.max_confidence);

        if classification.level == TriageLevel::Green
            && score == 0
            && limits.require_multiple_flags
        {
            confidence = confidence.min(config.clean_green_cap);
            flags.push(Flag::note(
                FlagSource::Quality,
                Severity::Low,
                format!(
                    "Quality-limited result: a clean reading on a {} recording is not conclusive",
                    adaptation.bin.label()
                ),
            ));
        }
    }

    let quality_limited_message = adaptation
        .snr_db
        .map_or(false, |snr| snr < config.re_record_below_snr_db);

    debug!(
        "Confidence {} (base {}, modifier {:+}, bin {})",
        confidence,
        classification.base_confidence,
        adaptation.confidence_modifier,
        adaptation.bin.label()
    );

    ConfidenceOutcome {
        confidence,
        flags,
        quality_limited_message,
    }
}

/// Suffix appended to the message of a very noisy result
pub const QUALITY_LIMITED_SUFFIX: &str = " (QUALITY-LIMITED RESULT)";

/// Appended to the action of a very noisy result
pub const RE_RECORD_ADVICE: &str =
    " Re-record in a quiet environment, holding the device close to the mouth, to confirm this result.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::QualityConfig;
    use crate::thresholds::ThresholdSet;

    fn flags(high: usize, medium: usize) -> Vec<Flag> {
        let high_flag = Flag::new(FlagSource::Acoustic, Severity::High, 5, "h");
        let medium_flag = Flag::new(FlagSource::Acoustic, Severity::Medium, 2, "m");
        let mut flags = vec![high_flag; high];
        flags.extend(vec![medium_flag; medium]);
        flags
    }

    #[test]
    fn test_decision_tree_order() {
        let config = LevelConfig::default();

        let c = classify(5, &flags(1, 0), true, &config);
        assert_eq!((c.level, c.rule), (TriageLevel::Red, LevelRule::ExtremeOverride));
        assert_eq!(c.base_confidence, 80);

        let c = classify(10, &flags(2, 0), false, &config);
        assert_eq!((c.level, c.rule), (TriageLevel::Red, LevelRule::MultipleHighFlags));
        assert_eq!(c.base_confidence, 70);

        let c = classify(12, &flags(1, 2), false, &config);
        assert_eq!((c.level, c.rule), (TriageLevel::Red, LevelRule::MixedSeverityFlags));
        assert_eq!(c.base_confidence, 76);

        let c = classify(15, &flags(0, 7), false, &config);
        assert_eq!((c.level, c.rule), (TriageLevel::Red, LevelRule::HighScore));

        let c = classify(11, &flags(1, 3), false, &config);
        assert_eq!((c.level, c.rule), (TriageLevel::Yellow, LevelRule::ModerateScore));
        assert_eq!(c.base_confidence, 84);

        let c = classify(0, &[], false, &config);
        assert_eq!((c.level, c.rule), (TriageLevel::Green, LevelRule::LowScore));
        assert_eq!(c.base_confidence, 80);

        let c = classify(4, &flags(0, 2), false, &config);
        assert_eq!(c.base_confidence, 56);
    }

    #[test]
    fn test_confidence_formulas_capped() {
        let config = LevelConfig::default();
        assert_eq!(classify(30, &flags(1, 0), true, &config).base_confidence, 95);
        assert_eq!(classify(25, &flags(2, 0), false, &config).base_confidence, 95);
        assert_eq!(classify(14, &[], false, &config).base_confidence, 85);
    }

    #[test]
    fn test_confidence_modifier_and_clamp() {
        let config = LevelConfig::default();
        let quality = QualityConfig::default();
        let base = ThresholdSet::english();

        let green = classify(0, &[], false, &config);
        let excellent = calculate_confidence(&green, 0, &quality.adapt(&base, Some(22.0)), &config);
        assert_eq!(excellent.confidence, 85);
        assert!(excellent.flags.is_empty());
        assert!(!excellent.quality_limited_message);

        let acceptable =
            calculate_confidence(&green, 0, &quality.adapt(&base, Some(13.0)), &config);
        assert_eq!(acceptable.confidence, 70);
    }

    #[test]
    fn test_quality_limited_caps() {
        let config = LevelConfig::default();
        let quality = QualityConfig::default();
        let base = ThresholdSet::english();

        let red = classify(25, &flags(3, 0), true, &config);
        let poor = calculate_confidence(&red, 25, &quality.adapt(&base, Some(11.0)), &config);
        assert_eq!(poor.confidence, 75);
        assert!(!poor.quality_limited_message);

        let critical = calculate_confidence(&red, 25, &quality.adapt(&base, Some(5.0)), &config);
        assert_eq!(critical.confidence, 60);
        assert!(critical.quality_limited_message);
    }

    #[test]
    fn test_clean_green_in_quality_limited_mode() {
        let config = LevelConfig::default();
        let quality = QualityConfig::default();
        let green = classify(0, &[], false, &config);

        let outcome = calculate_confidence(
            &green,
            0,
            &quality.adapt(&ThresholdSet::english(), Some(11.0)),
            &config,
        );
        assert_eq!(outcome.confidence, 50);
        assert_eq!(outcome.flags.len(), 1);
        assert_eq!(outcome.flags[0].severity, Severity::Low);
    }

    #[test]
    fn test_queue_priority() {
        assert_eq!(TriageLevel::Red.queue_priority(95), 2);
        assert_eq!(TriageLevel::Red.queue_priority(100), 1);
        assert_eq!(TriageLevel::Yellow.queue_priority(40), 6);
        assert_eq!(TriageLevel::Green.queue_priority(30), 9);
        assert_eq!(TriageLevel::Green.queue_priority(85), 8);
    }

    #[test]
    fn test_level_serializes_uppercase() {
        let json = serde_json::to_string(&TriageLevel::Yellow).unwrap();
        assert_eq!(json, "\"YELLOW\"");
        assert_eq!("red".parse::<TriageLevel>().unwrap(), TriageLevel::Red);
    }
}
