//! Word error rate against a fixed screening phrase
//!
//! The patient reads a known phrase; the speech-to-text transcript is compared
//! word by word against it. Slurred or effortful speech shows up as
//! substitutions and deletions long before acoustic measures move.
//!
//! Normalization is language aware: English is lowercased, Arabic has its
//! diacritics (harakat, tatweel) stripped and letter variants unified so that
//! orthographic differences in the recognizer output are not counted as errors.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::thresholds::Language;

/// Severity tier of a word error rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WerSeverity {
    Normal,
    Mild,
    Moderate,
    Severe,
}

impl WerSeverity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

/// Language-specific WER cutoffs (upper bounds, inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WerCutoffs {
    pub normal: f64,
    pub mild: f64,
    /// Languages without a moderate tier go straight from mild to severe
    pub moderate: Option<f64>,
}

impl WerCutoffs {
    pub fn classify(&self, wer: f64) -> WerSeverity {
        if wer <= self.normal {
            WerSeverity::Normal
        } else if wer <= self.mild {
            WerSeverity::Mild
        } else if self.moderate.map_or(false, |moderate| wer <= moderate) {
            WerSeverity::Moderate
        } else {
            WerSeverity::Severe
        }
    }
}

/// Points contributed to the triage score per WER severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WerPoints {
    pub mild: u32,
    pub moderate: u32,
    pub severe: u32,
}

impl WerPoints {
    pub fn for_severity(&self, severity: WerSeverity) -> u32 {
        match severity {
            WerSeverity::Normal => 0,
            WerSeverity::Mild => self.mild,
            WerSeverity::Moderate => self.moderate,
            WerSeverity::Severe => self.severe,
        }
    }
}

/// Expected phrases, severity cutoffs and points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordErrorConfig {
    pub english_phrase: String,
    pub arabic_phrase: String,
    pub english_cutoffs: WerCutoffs,
    pub arabic_cutoffs: WerCutoffs,
    pub points: WerPoints,
}

impl Default for WordErrorConfig {
    fn default() -> Self {
        Self {
            english_phrase: "the sky is blue in cincinnati".to_string(),
            arabic_phrase: "اليوم الجو جميل والسماء صافية".to_string(),
            english_cutoffs: WerCutoffs {
                normal: 0.15,
                mild: 0.30,
                moderate: Some(0.50),
            },
            arabic_cutoffs: WerCutoffs {
                normal: 0.20,
                mild: 0.40,
                moderate: None,
            },
            points: WerPoints {
                mild: 2,
                moderate: 3,
                severe: 5,
            },
        }
    }
}

impl WordErrorConfig {
    pub fn expected_phrase(&self, language: Language) -> &str {
        match language {
            Language::En => &self.english_phrase,
            Language::Ar => &self.arabic_phrase,
        }
    }

    pub fn cutoffs(&self, language: Language) -> &WerCutoffs {
        match language {
            Language::En => &self.english_cutoffs,
            Language::Ar => &self.arabic_cutoffs,
        }
    }

    /// Severity of a WER value (0.0-1.0)
    pub fn severity(&self, wer: f64, language: Language) -> WerSeverity {
        self.cutoffs(language).classify(wer)
    }

    /// Severity of a word accuracy value (0-100, = (1 - wer) * 100)
    pub fn severity_from_accuracy(&self, accuracy: f64, language: Language) -> WerSeverity {
        self.severity(accuracy_to_wer(accuracy), language)
    }

    /// Compare a transcript against the language's expected phrase
    pub fn evaluate(&self, transcript: &str, language: Language) -> WerResult {
        calculate_wer(transcript, self.expected_phrase(language), language, self)
    }
}

/// Convert a 0-100 accuracy into a clamped 0.0-1.0 WER.
///
/// Subtracting before dividing keeps whole-percent accuracies exact on the
/// tier edges (`1.0 - 0.85` is not `0.15`).
pub fn accuracy_to_wer(accuracy: f64) -> f64 {
    ((100.0 - accuracy) / 100.0).clamp(0.0, 1.0)
}

/// Outcome of one WER computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WerResult {
    pub wer: f64,
    /// (1 - wer) * 100
    pub accuracy: f64,
    pub substitutions: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub reference_words: usize,
    pub hypothesis_words: usize,
    pub severity: WerSeverity,
    pub points: u32,
    pub normalized_transcript: String,
    pub expected_phrase: String,
}

/// Edit operation counts from the alignment backtrace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EditCounts {
    substitutions: usize,
    insertions: usize,
    deletions: usize,
}

impl EditCounts {
    fn distance(&self) -> usize {
        self.substitutions + self.insertions + self.deletions
    }
}

/// Compute WER of `transcript` against `expected`
pub fn calculate_wer(
    transcript: &str,
    expected: &str,
    language: Language,
    config: &WordErrorConfig,
) -> WerResult {
    let reference = normalize(expected, language);
    let hypothesis = normalize(transcript, language);

    let counts = align(&reference, &hypothesis);
    let wer = if reference.is_empty() {
        if hypothesis.is_empty() {
            0.0
        } else {
            1.0
        }
    } else {
        (counts.distance() as f64 / reference.len() as f64).clamp(0.0, 1.0)
    };

    let severity = config.severity(wer, language);
    let points = config.points.for_severity(severity);

    debug!(
        "WER {:.3} ({:?}): S={} I={} D={} over {} reference words",
        wer,
        severity,
        counts.substitutions,
        counts.insertions,
        counts.deletions,
        reference.len()
    );

    WerResult {
        wer,
        accuracy: (1.0 - wer) * 100.0,
        substitutions: counts.substitutions,
        insertions: counts.insertions,
        deletions: counts.deletions,
        reference_words: reference.len(),
        hypothesis_words: hypothesis.len(),
        severity,
        points,
        normalized_transcript: hypothesis.join(" "),
        expected_phrase: reference.join(" "),
    }
}

/// Normalize text into comparable words
pub fn normalize(text: &str, language: Language) -> Vec<String> {
    let cleaned: String = match language {
        Language::Ar => text.chars().filter_map(normalize_arabic_char).collect(),
        Language::En => text.to_lowercase(),
    };

    cleaned
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Strip diacritics and unify letter variants. `None` drops the character.
fn normalize_arabic_char(c: char) -> Option<char> {
    match c {
        // Harakat (fathatan .. sukun) and superscript alef
        '\u{064B}'..='\u{0652}' | '\u{0670}' => None,
        // Tatweel
        '\u{0640}' => None,
        'أ' | 'إ' | 'آ' | 'ٱ' => Some('ا'),
        'ة' => Some('ه'),
        'ى' => Some('ي'),
        'ؤ' => Some('و'),
        'ئ' => Some('ي'),
        other => Some(other.to_lowercase().next().unwrap_or(other)),
    }
}

/// Word-level Levenshtein alignment with backtrace
fn align(reference: &[String], hypothesis: &[String]) -> EditCounts {
    let rows = reference.len() + 1;
    let cols = hypothesis.len() + 1;

    let mut dist = vec![vec![0usize; cols]; rows];
    for (i, row) in dist.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..cols {
        dist[0][j] = j;
    }

    for i in 1..rows {
        for j in 1..cols {
            let cost = usize::from(reference[i - 1] != hypothesis[j - 1]);
            dist[i][j] = (dist[i - 1][j - 1] + cost)
                .min(dist[i - 1][j] + 1)
                .min(dist[i][j - 1] + 1);
        }
    }

    // Walk back from the bottom-right corner, preferring diagonal moves
    let mut counts = EditCounts::default();
    let (mut i, mut j) = (reference.len(), hypothesis.len());
    while i > 0 || j > 0 {
        if i > 0 && j > 0 {
            let cost = usize::from(reference[i - 1] != hypothesis[j - 1]);
            if dist[i][j] == dist[i - 1][j - 1] + cost {
                counts.substitutions += cost;
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 && dist[i][j] == dist[i - 1][j] + 1 {
            counts.deletions += 1;
            i -= 1;
        } else {
            counts.insertions += 1;
            j -= 1;
        }
    }

    counts
}
