//! Quality Adaptation Module
//!
//! Classifies the recording SNR into a quality bin and derives everything the
//! scorer needs from it:
//!
//! - **Thresholds** - unchanged in every bin but `critical`. Noise bias is
//!   corrected upstream in the feature extractor; relaxing clinical cutoffs here
//!   would let real pathology hide behind a noisy recording. The critical bin
//!   only gets a small measurement-error band.
//! - **Reliability weights** - jitter/shimmer degrade most under noise, HNR,
//!   speech rate and voice breaks are noise-aware or noise-independent.
//! - **Confidence modifier** - added to the level's base confidence.
//! - **Quality-limited constraints** - confidence cap, "require multiple flags"
//!   and a prominent warning for SNR below 12 dB.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::thresholds::ThresholdSet;

/// SNR quality bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityBin {
    Excellent,
    Good,
    Acceptable,
    Poor,
    Critical,
    /// No SNR was supplied
    Unmeasured,
}

impl QualityBin {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Acceptable => "acceptable",
            Self::Poor => "poor",
            Self::Critical => "critical",
            Self::Unmeasured => "unmeasured",
        }
    }
}

/// Per-feature reliability weights (multiplied into base points)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityWeights {
    pub jitter: f64,
    pub shimmer: f64,
    pub hnr: f64,
    pub speech_rate: f64,
    pub pause_ratio: f64,
    pub voice_breaks: f64,
    pub intelligibility: f64,
}

impl ReliabilityWeights {
    pub const FULL: Self = Self::degraded(1.0, 1.0, 1.0);

    const fn degraded(perturbation: f64, pause_ratio: f64, intelligibility: f64) -> Self {
        Self {
            jitter: perturbation,
            shimmer: perturbation,
            hnr: 1.0,
            speech_rate: 1.0,
            pause_ratio,
            voice_breaks: 1.0,
            intelligibility,
        }
    }
}

/// What a quality bin does to scoring and confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinProfile {
    pub weights: ReliabilityWeights,
    /// Added to the base confidence
    pub confidence_modifier: i32,
    /// Confidence cap; present only in quality-limited bins
    pub max_confidence: Option<u32>,
}

/// SNR bin edges and per-bin profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    pub excellent_min_db: f64,
    pub good_min_db: f64,
    pub acceptable_min_db: f64,
    pub poor_min_db: f64,
    /// Uncertainty band applied to thresholds in the critical bin (fraction)
    pub critical_threshold_band: f64,
    pub excellent: BinProfile,
    pub good: BinProfile,
    pub acceptable: BinProfile,
    pub poor: BinProfile,
    pub critical: BinProfile,
    pub unmeasured: BinProfile,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            excellent_min_db: 20.0,
            good_min_db: 15.0,
            acceptable_min_db: 12.0,
            poor_min_db: 10.0,
            critical_threshold_band: 0.05,
            excellent: BinProfile {
                weights: ReliabilityWeights::FULL,
                confidence_modifier: 5,
                max_confidence: None,
            },
            good: BinProfile {
                weights: ReliabilityWeights::degraded(0.85, 1.0, 1.0),
                confidence_modifier: 0,
                max_confidence: None,
            },
            acceptable: BinProfile {
                weights: ReliabilityWeights::degraded(0.70, 0.90, 1.0),
                confidence_modifier: -10,
                max_confidence: None,
            },
            poor: BinProfile {
                weights: ReliabilityWeights::degraded(0.50, 0.80, 0.85),
                confidence_modifier: -20,
                max_confidence: Some(75),
            },
            critical: BinProfile {
                weights: ReliabilityWeights::degraded(0.50, 0.70, 0.70),
                confidence_modifier: -35,
                max_confidence: Some(60),
            },
            unmeasured: BinProfile {
                weights: ReliabilityWeights::FULL,
                confidence_modifier: 0,
                max_confidence: None,
            },
        }
    }
}

/// Constraints active in quality-limited mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLimits {
    pub max_confidence: u32,
    /// A clean (score 0) result is not trusted on its own
    pub require_multiple_flags: bool,
    pub show_warning: bool,
}

/// Everything derived from one SNR measurement
#[derive(Debug, Clone, PartialEq)]
pub struct QualityAdaptation {
    pub bin: QualityBin,
    pub snr_db: Option<f64>,
    pub thresholds: ThresholdSet,
    pub weights: ReliabilityWeights,
    pub confidence_modifier: i32,
    pub limits: Option<QualityLimits>,
}

impl QualityAdaptation {
    pub fn is_quality_limited(&self) -> bool {
        self.limits.is_some()
    }
}

impl QualityConfig {
    pub fn classify(&self, snr_db: Option<f64>) -> QualityBin {
        match snr_db {
            None => QualityBin::Unmeasured,
            Some(snr) if snr >= self.excellent_min_db => QualityBin::Excellent,
            Some(snr) if snr >= self.good_min_db => QualityBin::Good,
            Some(snr) if snr >= self.acceptable_min_db => QualityBin::Acceptable,
            Some(snr) if snr >= self.poor_min_db => QualityBin::Poor,
            Some(_) => QualityBin::Critical,
        }
    }

    pub fn profile(&self, bin: QualityBin) -> &BinProfile {
        match bin {
            QualityBin::Excellent => &self.excellent,
            QualityBin::Good => &self.good,
            QualityBin::Acceptable => &self.acceptable,
            QualityBin::Poor => &self.poor,
            QualityBin::Critical => &self.critical,
            QualityBin::Unmeasured => &self.unmeasured,
        }
    }

    /// Derive thresholds, weights, confidence modifier and limits for an SNR.
    ///
    /// Returns a new threshold set; `base` is never modified.
    pub fn adapt(&self, base: &ThresholdSet, snr_db: Option<f64>) -> QualityAdaptation {
        let bin = self.classify(snr_db);
        let profile = self.profile(bin);

        let thresholds = if bin == QualityBin::Critical {
            base.with_uncertainty_band(self.critical_threshold_band)
        } else {
            base.clone()
        };

        let limits = profile.max_confidence.map(|max_confidence| QualityLimits {
            max_confidence,
            require_multiple_flags: true,
            show_warning: true,
        });

        debug!(
            "Quality bin {} (SNR {:?} dB), modifier {:+}, limited: {}",
            bin.label(),
            snr_db,
            profile.confidence_modifier,
            limits.is_some()
        );

        QualityAdaptation {
            bin,
            snr_db,
            thresholds,
            weights: profile.weights,
            confidence_modifier: profile.confidence_modifier,
            limits,
        }
    }
}
