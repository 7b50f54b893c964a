//! Caller-supplied measurements: acoustic features and recording quality
//!
//! The engine never recomputes any of these values. Feature extraction (Praat
//! jitter/shimmer/HNR, VAD, SNR estimation) belongs to the analysis backend.

use serde::{Deserialize, Serialize};

/// SNR at or above which no bias correction is applied (reference condition)
const CORRECTION_REFERENCE_SNR_DB: f64 = 20.0;

/// Acoustic features extracted from one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcousticFeatures {
    /// Local jitter (%)
    pub jitter: f64,
    /// Shimmer DDA (%)
    pub shimmer: f64,
    /// Harmonics-to-noise ratio (dB)
    pub hnr: f64,
    /// Estimated syllables per second of active speech
    pub speech_rate: f64,
    /// Total pause ratio within the active speech region (%)
    pub pause_ratio: f64,
    /// Pauses of 300-800ms (%)
    #[serde(default)]
    pub brief_pause_ratio: Option<f64>,
    /// Pauses longer than 800ms (%)
    #[serde(default)]
    pub respiratory_pause_ratio: Option<f64>,
    /// Number of voice breaks
    pub voice_breaks: u32,
    /// Mean intensity (dB), informational only
    #[serde(default)]
    pub mean_intensity: f64,
}

impl AcousticFeatures {
    /// Pause metric used for scoring.
    ///
    /// Prefers the respiratory-pause sub-metric because brief inter-sentence
    /// pauses are normal; falls back to the total ratio.
    pub fn effective_pause_ratio(&self) -> f64 {
        self.respiratory_pause_ratio.unwrap_or(self.pause_ratio)
    }

    /// Whether the pause metric in use is the respiratory sub-metric
    pub fn uses_respiratory_pauses(&self) -> bool {
        self.respiratory_pause_ratio.is_some()
    }

    /// Conservative SNR bias correction of the noise-sensitive features.
    ///
    /// Noise inflates jitter, shimmer and pauses and depresses HNR. Below the
    /// 20 dB reference each feature is shifted by a per-dB constant, clamped to
    /// a maximum correction. Speech rate, voice breaks and intensity are
    /// noise-independent and left untouched. Disabled by default in
    /// [`crate::config::EngineConfig`].
    pub fn corrected_for_snr(&self, snr_db: f64) -> Self {
        if !snr_db.is_finite() || snr_db >= CORRECTION_REFERENCE_SNR_DB {
            return self.clone();
        }

        let delta = CORRECTION_REFERENCE_SNR_DB - snr_db;
        let jitter_correction = (0.04 * delta).min(0.4);
        let shimmer_correction = (0.10 * delta).min(1.5);
        let hnr_correction = (0.30 * delta).min(3.0);
        let pause_correction = (0.4 * delta).min(5.0);

        let correct_pause = |value: f64| (value - pause_correction).clamp(0.0, 100.0);

        Self {
            jitter: (self.jitter - jitter_correction).max(0.0),
            shimmer: (self.shimmer - shimmer_correction).max(0.0),
            hnr: (self.hnr + hnr_correction).min(40.0),
            speech_rate: self.speech_rate,
            pause_ratio: correct_pause(self.pause_ratio),
            brief_pause_ratio: self.brief_pause_ratio.map(correct_pause),
            respiratory_pause_ratio: self.respiratory_pause_ratio.map(correct_pause),
            voice_breaks: self.voice_breaks,
            mean_intensity: self.mean_intensity,
        }
    }
}

/// Recording quality measurements
///
/// Used only to modulate thresholds, weights and confidence. Rejecting a
/// recording outright is the caller's job (see [`crate::service`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Signal-to-noise ratio (dB)
    pub snr_db: Option<f64>,
    /// Share of the active region that contains voiced speech (%)
    pub speech_percentage: Option<f64>,
    /// SNR and speech activity are both sufficient
    pub is_reliable: bool,
}

impl QualityMetrics {
    /// Minimum SNR for a reliable recording (dB)
    pub const RELIABLE_SNR_DB: f64 = 10.0;
    /// Minimum speech activity for a reliable recording (%)
    pub const SUFFICIENT_SPEECH_PERCENT: f64 = 20.0;

    pub fn new(snr_db: Option<f64>, speech_percentage: Option<f64>) -> Self {
        let snr_ok = snr_db.map_or(true, |snr| snr >= Self::RELIABLE_SNR_DB);
        let speech_ok =
            speech_percentage.map_or(true, |pct| pct >= Self::SUFFICIENT_SPEECH_PERCENT);
        Self {
            snr_db,
            speech_percentage,
            is_reliable: snr_ok && speech_ok,
        }
    }

    /// Whether enough speech was detected to analyze at all
    pub fn has_sufficient_speech(&self, min_percentage: f64) -> bool {
        self.speech_percentage.map_or(true, |pct| pct >= min_percentage)
    }
}
