//! Acoustic pathology scorer
//!
//! Every feature is compared against its tiers, highest severity first. A
//! feature contributes at most one tier: the first one it crosses. Points are
//! the tier's base points scaled by the feature's reliability weight.

use tracing::debug;

use super::{
    weighted_points, Flag, FlagSource, PointsConfig, ScoringContext, Severity, StageScore,
};

/// Which side of a cutoff is pathological
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Values above the cutoff are flagged
    Above,
    /// Values below the cutoff are flagged (HNR, speech rate)
    Below,
}

impl Direction {
    fn crosses(&self, value: f64, cutoff: f64) -> bool {
        match self {
            Self::Above => value > cutoff,
            Self::Below => value < cutoff,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

/// One tier of a feature check
struct Tier {
    name: &'static str,
    cutoff: f64,
    severity: Severity,
}

/// A feature measurement with its ordered tiers
struct FeatureCheck {
    label: &'static str,
    unit: &'static str,
    value: f64,
    weight: f64,
    direction: Direction,
    tiers: Vec<Tier>,
}

impl FeatureCheck {
    fn evaluate(&self, points: &PointsConfig) -> Option<Flag> {
        let tier = self
            .tiers
            .iter()
            .find(|tier| self.direction.crosses(self.value, tier.cutoff))?;

        let awarded = weighted_points(points.for_severity(tier.severity), self.weight);
        Some(Flag::new(
            FlagSource::Acoustic,
            tier.severity,
            awarded,
            format!(
                "{} {:.2}{} is {} the {} threshold of {:.2}{}",
                self.label,
                self.value,
                self.unit,
                self.direction.describe(),
                tier.name,
                tier.cutoff,
                self.unit
            ),
        ))
    }
}

/// Score the acoustic features of one recording
pub fn score(ctx: &ScoringContext<'_>, points: &PointsConfig) -> StageScore {
    let features = ctx.features;
    let thresholds = &ctx.adaptation.thresholds;
    let weights = &ctx.adaptation.weights;

    let pause_label = if features.uses_respiratory_pauses() {
        "Respiratory pause ratio"
    } else {
        "Pause ratio"
    };

    let checks = [
        FeatureCheck {
            label: "Shimmer",
            unit: "%",
            value: features.shimmer,
            weight: weights.shimmer,
            direction: Direction::Above,
            tiers: vec![
                Tier {
                    name: "severe",
                    cutoff: thresholds.shimmer_severe,
                    severity: Severity::High,
                },
                Tier {
                    name: "mild",
                    cutoff: thresholds.shimmer_mild,
                    severity: Severity::Medium,
                },
            ],
        },
        FeatureCheck {
            label: pause_label,
            unit: "%",
            value: features.effective_pause_ratio(),
            weight: weights.pause_ratio,
            direction: Direction::Above,
            tiers: vec![
                Tier {
                    name: "red",
                    cutoff: thresholds.pause_red,
                    severity: Severity::High,
                },
                Tier {
                    name: "yellow",
                    cutoff: thresholds.pause_yellow,
                    severity: Severity::Medium,
                },
            ],
        },
        FeatureCheck {
            label: "Jitter",
            unit: "%",
            value: features.jitter,
            weight: weights.jitter,
            direction: Direction::Above,
            tiers: vec![Tier {
                name: "high",
                cutoff: thresholds.jitter_high,
                severity: Severity::Medium,
            }],
        },
        FeatureCheck {
            label: "HNR",
            unit: " dB",
            value: features.hnr,
            weight: weights.hnr,
            direction: Direction::Below,
            tiers: vec![
                Tier {
                    name: "red",
                    cutoff: thresholds.hnr_red,
                    severity: Severity::High,
                },
                Tier {
                    name: "yellow",
                    cutoff: thresholds.hnr_yellow,
                    severity: Severity::Medium,
                },
            ],
        },
        FeatureCheck {
            label: "Speech rate",
            unit: " syl/s",
            value: features.speech_rate,
            weight: weights.speech_rate,
            direction: Direction::Below,
            tiers: vec![
                Tier {
                    name: "red",
                    cutoff: thresholds.speech_rate_red,
                    severity: Severity::High,
                },
                Tier {
                    name: "yellow",
                    cutoff: thresholds.speech_rate_yellow,
                    severity: Severity::Medium,
                },
            ],
        },
        FeatureCheck {
            label: "Voice breaks",
            unit: "",
            value: f64::from(features.voice_breaks),
            weight: weights.voice_breaks,
            direction: Direction::Above,
            tiers: vec![Tier {
                name: "voice break",
                cutoff: thresholds.voice_breaks,
                severity: Severity::Medium,
            }],
        },
    ];

    let mut stage = StageScore::default();
    for check in &checks {
        if let Some(flag) = check.evaluate(points) {
            debug!("Acoustic flag ({:?}, {} pts): {}", flag.severity, flag.points, flag.message);
            stage.push(flag);
        }
    }

    debug!("Acoustic score: {} from {} flags", stage.points, stage.flags.len());
    stage
}
