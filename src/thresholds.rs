//! Language-specific clinical cutoffs
//!
//! Values are Praat-derived clinical thresholds. Several of them are known to
//! produce false positives on home recordings; they are kept as-is because
//! changing them requires clinical validation data.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Recording language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    /// Map a language code to a supported language.
    ///
    /// Anything that is not Arabic falls back to English.
    pub fn from_code(code: &str) -> Self {
        let normalized = code.trim().to_lowercase();
        if normalized == "ar" || normalized.starts_with("ar-") || normalized.starts_with("ar_") {
            Self::Ar
        } else {
            if normalized != "en" && !normalized.starts_with("en-") {
                debug!("Unsupported language '{}', falling back to English", code);
            }
            Self::En
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for Language {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl std::str::FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_code(s))
    }
}

/// One numeric cutoff per feature tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// Jitter above this is elevated (%)
    pub jitter_high: f64,
    /// Shimmer above this is mildly elevated (%)
    pub shimmer_mild: f64,
    /// Shimmer above this is severe (%)
    pub shimmer_severe: f64,
    /// HNR below this is a red-tier finding (dB)
    pub hnr_red: f64,
    /// HNR below this is a yellow-tier finding (dB)
    pub hnr_yellow: f64,
    /// Pause ratio above this is a red-tier finding (%)
    pub pause_red: f64,
    /// Pause ratio above this is a yellow-tier finding (%)
    pub pause_yellow: f64,
    /// Speech rate below this is a red-tier finding (syl/s)
    pub speech_rate_red: f64,
    /// Speech rate below this is a yellow-tier finding (syl/s)
    pub speech_rate_yellow: f64,
    /// Voice-break count above this is flagged
    pub voice_breaks: f64,
}

impl ThresholdSet {
    pub fn english() -> Self {
        Self {
            jitter_high: 2.0,
            shimmer_mild: 6.0,
            shimmer_severe: 10.0,
            hnr_red: 5.0,
            hnr_yellow: 8.0,
            pause_red: 40.0,
            pause_yellow: 30.0,
            speech_rate_red: 1.5,
            speech_rate_yellow: 2.0,
            voice_breaks: 2.0,
        }
    }

    /// Arabic differs only in speech rate (typical 2.0-2.5 syl/s vs 2.5-3.5)
    pub fn arabic() -> Self {
        Self {
            speech_rate_red: 1.2,
            speech_rate_yellow: 1.6,
            ..Self::english()
        }
    }

    /// Apply a measurement-error band of `fraction` around every cutoff.
    ///
    /// A value within the band of a cutoff counts as crossing it, so no
    /// cutoff ever moves past its base value in the lenient direction.
    /// Higher-is-worse cutoffs shrink, lower-is-worse cutoffs grow.
    pub fn with_uncertainty_band(&self, fraction: f64) -> Self {
        let lower = 1.0 - fraction;
        let raise = 1.0 + fraction;
        Self {
            jitter_high: self.jitter_high * lower,
            shimmer_mild: self.shimmer_mild * lower,
            shimmer_severe: self.shimmer_severe * lower,
            hnr_red: self.hnr_red * raise,
            hnr_yellow: self.hnr_yellow * raise,
            pause_red: self.pause_red * lower,
            pause_yellow: self.pause_yellow * lower,
            speech_rate_red: self.speech_rate_red * raise,
            speech_rate_yellow: self.speech_rate_yellow * raise,
            voice_breaks: self.voice_breaks * lower,
        }
    }
}

/// Base threshold sets for every supported language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfiles {
    pub en: ThresholdSet,
    pub ar: ThresholdSet,
}

impl Default for ThresholdProfiles {
    fn default() -> Self {
        Self {
            en: ThresholdSet::english(),
            ar: ThresholdSet::arabic(),
        }
    }
}

/// Supplies the base threshold set for a language
#[derive(Debug, Clone, Copy)]
pub struct ThresholdProvider<'a> {
    profiles: &'a ThresholdProfiles,
}

impl<'a> ThresholdProvider<'a> {
    pub fn new(profiles: &'a ThresholdProfiles) -> Self {
        Self { profiles }
    }

    pub fn for_language(&self, language: Language) -> &'a ThresholdSet {
        match language {
            Language::En => &self.profiles.en,
            Language::Ar => &self.profiles.ar,
        }
    }

    /// Resolve a raw language code, falling back to English
    pub fn for_code(&self, code: &str) -> &'a ThresholdSet {
        self.for_language(Language::from_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_fallback() {
        assert_eq!(Language::from_code("ar"), Language::Ar);
        assert_eq!(Language::from_code("AR-sa"), Language::Ar);
        assert_eq!(Language::from_code("en"), Language::En);
        assert_eq!(Language::from_code("fr"), Language::En);
        assert_eq!(Language::from_code(""), Language::En);
    }

    #[test]
    fn test_language_deserializes_with_fallback() {
        let ar: Language = serde_json::from_str("\"ar\"").unwrap();
        let fr: Language = serde_json::from_str("\"fr\"").unwrap();
        assert_eq!(ar, Language::Ar);
        assert_eq!(fr, Language::En);
        assert_eq!(serde_json::to_string(&Language::Ar).unwrap(), "\"ar\"");
    }

    #[test]
    fn test_english_base_values() {
        let set = ThresholdSet::english();
        assert_eq!(set.jitter_high, 2.0);
        assert_eq!(set.shimmer_mild, 6.0);
        assert_eq!(set.shimmer_severe, 10.0);
        assert_eq!(set.hnr_red, 5.0);
        assert_eq!(set.hnr_yellow, 8.0);
        assert_eq!(set.pause_red, 40.0);
        assert_eq!(set.pause_yellow, 30.0);
        assert_eq!(set.voice_breaks, 2.0);
    }

    #[test]
    fn test_provider_unknown_language_uses_english() {
        let profiles = ThresholdProfiles::default();
        let provider = ThresholdProvider::new(&profiles);
        assert_eq!(provider.for_code("de"), &ThresholdSet::english());
        assert_eq!(provider.for_code("ar"), &ThresholdSet::arabic());
    }

    #[test]
    fn test_uncertainty_band_never_relaxes_cutoffs() {
        for base in [ThresholdSet::english(), ThresholdSet::arabic()] {
            let banded = base.with_uncertainty_band(0.05);
            assert!(banded.jitter_high < base.jitter_high);
            assert!(banded.shimmer_mild < base.shimmer_mild);
            assert!(banded.shimmer_severe < base.shimmer_severe);
            assert!(banded.pause_red < base.pause_red);
            assert!(banded.pause_yellow < base.pause_yellow);
            assert!(banded.voice_breaks < base.voice_breaks);
            assert!(banded.hnr_red > base.hnr_red);
            assert!(banded.hnr_yellow > base.hnr_yellow);
            assert!(banded.speech_rate_red > base.speech_rate_red);
            assert!(banded.speech_rate_yellow > base.speech_rate_yellow);
        }

        let banded = ThresholdSet::english().with_uncertainty_band(0.05);
        assert!((banded.shimmer_severe - 9.5).abs() < 1e-9);
        assert!((banded.hnr_red - 5.25).abs() < 1e-9);
    }
}
