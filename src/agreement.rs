//! Cross-method agreement
//!
//! Re-scores every available method independently into a
//! normal/concerning/critical verdict and measures how far they agree. The
//! caller uses the consensus to adjust confidence in the primary decision and,
//! under the safety bias, to escalate a GREEN result that the voice methods
//! critically contradict.
//!
//! Methods:
//! - acoustic: pre-adjustment acoustic points
//! - intelligibility: average log-probability of the transcript
//! - word_error: WER severity tier
//! - quality: SNR and speech activity

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::request::TriageRequest;
use crate::wer::{accuracy_to_wer, WerSeverity, WordErrorConfig};

/// Independent assessment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Acoustic,
    Intelligibility,
    WordError,
    Quality,
}

impl Method {
    /// Whether the method measures the voice itself rather than the recording
    pub fn measures_voice(&self) -> bool {
        !matches!(self, Self::Quality)
    }
}

/// Per-method verdict, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Normal,
    Concerning,
    Critical,
}

/// How strongly the methods agree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consensus {
    Unanimous,
    Strong,
    Mixed,
    Conflicting,
}

impl Consensus {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            Self::Unanimous
        } else if percentage >= 75.0 {
            Self::Strong
        } else if percentage >= 50.0 {
            Self::Mixed
        } else {
            Self::Conflicting
        }
    }
}

/// One method's independent verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodAssessment {
    pub method: Method,
    pub verdict: Verdict,
    pub score: f64,
    pub max_score: f64,
    pub details: String,
}

/// Consensus over all available methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementResult {
    pub methods_agreeing: usize,
    pub total_methods: usize,
    pub agreement_percentage: f64,
    #[serde(rename = "consensus_level")]
    pub consensus: Consensus,
    #[serde(rename = "method_details")]
    pub methods: Vec<MethodAssessment>,
    pub overall_verdict: Verdict,
}

impl AgreementResult {
    /// Overall verdict of the voice methods alone.
    ///
    /// A poor recording is not evidence of pathology, so the quality verdict
    /// is left out.
    pub fn voice_verdict(&self) -> Verdict {
        let voice = self.methods.iter().filter(|m| m.method.measures_voice());
        VerdictCounts::of(voice).overall()
    }
}

/// Method tiers and merge adjustments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementConfig {
    pub acoustic_concerning_score: u32,
    pub acoustic_critical_score: u32,
    /// Average log-probability at or above this is normal
    pub logprob_normal: f64,
    /// Average log-probability at or above this is concerning
    pub logprob_concerning: f64,
    pub quality_normal_snr_db: f64,
    pub quality_normal_speech: f64,
    pub quality_concerning_snr_db: f64,
    pub quality_concerning_speech: f64,
    pub quality_max_score: f64,
    pub unanimous_bonus: u32,
    pub unanimous_cap: u32,
    pub conflicting_penalty: u32,
    pub conflicting_floor: u32,
    /// Escalate GREEN to YELLOW when the overall verdict is critical
    pub escalate_on_critical: bool,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            acoustic_concerning_score: 5,
            acoustic_critical_score: 10,
            logprob_normal: -0.7,
            logprob_concerning: -1.0,
            quality_normal_snr_db: 15.0,
            quality_normal_speech: 40.0,
            quality_concerning_snr_db: 10.0,
            quality_concerning_speech: 20.0,
            quality_max_score: 50.0,
            unanimous_bonus: 10,
            unanimous_cap: 95,
            conflicting_penalty: 15,
            conflicting_floor: 40,
            escalate_on_critical: true,
        }
    }
}

/// Speech-to-text confidence (0-100) from an average log-probability
pub fn confidence_from_logprob(avg_logprob: f64) -> f64 {
    ((avg_logprob + 2.0) * 50.0).clamp(0.0, 100.0)
}

/// Inverse of [`confidence_from_logprob`]
pub fn logprob_from_confidence(confidence: f64) -> f64 {
    confidence / 50.0 - 2.0
}

fn assess_acoustic(points: u32, max_points: u32, config: &AgreementConfig) -> MethodAssessment {
    let verdict = if points >= config.acoustic_critical_score {
        Verdict::Critical
    } else if points >= config.acoustic_concerning_score {
        Verdict::Concerning
    } else {
        Verdict::Normal
    };
    MethodAssessment {
        method: Method::Acoustic,
        verdict,
        score: f64::from(points),
        max_score: f64::from(max_points),
        details: format!("{} of {} acoustic points", points, max_points),
    }
}

fn assess_intelligibility(
    avg_logprob: Option<f64>,
    confidence: Option<f64>,
    config: &AgreementConfig,
) -> Option<MethodAssessment> {
    let logprob = avg_logprob.or_else(|| confidence.map(logprob_from_confidence))?;
    let confidence = confidence.unwrap_or_else(|| confidence_from_logprob(logprob));

    let verdict = if logprob >= config.logprob_normal {
        Verdict::Normal
    } else if logprob >= config.logprob_concerning {
        Verdict::Concerning
    } else {
        Verdict::Critical
    };
    Some(MethodAssessment {
        method: Method::Intelligibility,
        verdict,
        score: confidence,
        max_score: 100.0,
        details: format!("average log-probability {:.2}", logprob),
    })
}

fn assess_word_error(
    accuracy: Option<f64>,
    request: &TriageRequest,
    word_error: &WordErrorConfig,
) -> Option<MethodAssessment> {
    let wer = accuracy_to_wer(accuracy?);
    let severity = word_error.severity(wer, request.language);
    let verdict = match severity {
        WerSeverity::Normal => Verdict::Normal,
        WerSeverity::Mild | WerSeverity::Moderate => Verdict::Concerning,
        WerSeverity::Severe => Verdict::Critical,
    };
    Some(MethodAssessment {
        method: Method::WordError,
        verdict,
        score: wer * 100.0,
        max_score: 100.0,
        details: format!("WER {:.0}% ({})", wer * 100.0, severity.label()),
    })
}

fn assess_quality(
    snr_db: Option<f64>,
    speech_percentage: Option<f64>,
    config: &AgreementConfig,
) -> Option<MethodAssessment> {
    let snr = snr_db?;
    let speech_at_least = |floor: f64| speech_percentage.map_or(true, |pct| pct >= floor);

    let verdict = if snr >= config.quality_normal_snr_db
        && speech_at_least(config.quality_normal_speech)
    {
        Verdict::Normal
    } else if snr >= config.quality_concerning_snr_db
        && speech_at_least(config.quality_concerning_speech)
    {
        Verdict::Concerning
    } else {
        Verdict::Critical
    };
    let details = match speech_percentage {
        Some(pct) => format!("SNR {:.1} dB, {:.0}% speech", snr, pct),
        None => format!("SNR {:.1} dB", snr),
    };
    Some(MethodAssessment {
        method: Method::Quality,
        verdict,
        score: snr,
        max_score: config.quality_max_score,
        details,
    })
}

#[derive(Debug, Clone, Copy, Default)]
struct VerdictCounts {
    normal: usize,
    concerning: usize,
    critical: usize,
}

impl VerdictCounts {
    fn of<'a>(methods: impl IntoIterator<Item = &'a MethodAssessment>) -> Self {
        let mut counts = Self::default();
        for method in methods {
            match method.verdict {
                Verdict::Normal => counts.normal += 1,
                Verdict::Concerning => counts.concerning += 1,
                Verdict::Critical => counts.critical += 1,
            }
        }
        counts
    }

    fn total(&self) -> usize {
        self.normal + self.concerning + self.critical
    }

    /// Verdict shared by most methods; ties go to the more severe verdict
    fn majority(&self) -> (Verdict, usize) {
        if self.total() == 0 {
            return (Verdict::Normal, 0);
        }
        [
            (Verdict::Normal, self.normal),
            (Verdict::Concerning, self.concerning),
            (Verdict::Critical, self.critical),
        ]
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .unwrap_or((Verdict::Normal, 0))
    }

    /// Severity-first verdict
    fn overall(&self) -> Verdict {
        let total = self.total();
        if self.critical >= 2 || (self.critical >= 1 && self.critical * 2 >= total) {
            Verdict::Critical
        } else if self.critical >= 1 || self.concerning >= 2 {
            Verdict::Concerning
        } else {
            self.majority().0
        }
    }
}

/// Assess every available method and compute the consensus
pub fn assess(
    request: &TriageRequest,
    acoustic_points: u32,
    max_acoustic_points: u32,
    config: &AgreementConfig,
    word_error: &WordErrorConfig,
) -> AgreementResult {
    let mut methods = vec![assess_acoustic(acoustic_points, max_acoustic_points, config)];
    methods.extend(assess_intelligibility(
        request.avg_logprob,
        request.intelligibility_confidence,
        config,
    ));
    methods.extend(assess_word_error(request.word_error_accuracy, request, word_error));
    methods.extend(assess_quality(request.snr_db, request.speech_percentage, config));

    let counts = VerdictCounts::of(&methods);
    let total = methods.len();
    let (_, agreeing) = counts.majority();
    let agreement_percentage = agreeing as f64 / total as f64 * 100.0;
    let consensus = Consensus::from_percentage(agreement_percentage);
    let overall_verdict = counts.overall();

    debug!(
        "Agreement: {}/{} methods ({:.0}%) -> {:?}, overall {:?}",
        agreeing, total, agreement_percentage, consensus, overall_verdict
    );

    AgreementResult {
        methods_agreeing: agreeing,
        total_methods: total,
        agreement_percentage,
        consensus,
        methods,
        overall_verdict,
    }
}
