//! Patient risk questionnaire
//!
//! An independent point system over self-reported answers. The result is
//! merged with the voice score by the caller (see [`crate::enrich`]); nothing
//! here looks at the recording.
//!
//! Current-health answers can be negative: a cold or tiredness explains a
//! voice change rather than indicating risk, and dampens trust in the voice
//! result through the confidence modifier.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Age bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgeBracket {
    #[default]
    #[serde(rename = "under_40")]
    Under40,
    #[serde(rename = "40_54")]
    From40To54,
    #[serde(rename = "55_64")]
    From55To64,
    #[serde(rename = "65_plus")]
    Over65,
}

impl AgeBracket {
    pub fn points(&self) -> i32 {
        match self {
            Self::Under40 => 0,
            Self::From40To54 => 1,
            Self::From55To64 => 2,
            Self::Over65 => 3,
        }
    }
}

/// Pre-existing condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicalCondition {
    Hypertension,
    Diabetes,
    HeartDisease,
    AtrialFibrillation,
    PreviousStroke,
    HighCholesterol,
    RespiratoryDisease,
    NeurologicalDisorder,
}

impl MedicalCondition {
    pub fn points(&self) -> i32 {
        match self {
            Self::Hypertension => 2,
            Self::Diabetes => 2,
            Self::HeartDisease => 3,
            Self::AtrialFibrillation => 3,
            Self::PreviousStroke => 4,
            Self::HighCholesterol => 1,
            Self::RespiratoryDisease => 2,
            Self::NeurologicalDisorder => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hypertension => "hypertension",
            Self::Diabetes => "diabetes",
            Self::HeartDisease => "heart disease",
            Self::AtrialFibrillation => "atrial fibrillation",
            Self::PreviousStroke => "previous stroke",
            Self::HighCholesterol => "high cholesterol",
            Self::RespiratoryDisease => "respiratory disease",
            Self::NeurologicalDisorder => "neurological disorder",
        }
    }
}

/// How the patient feels today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Healthy,
    ColdFlu,
    Tired,
    OtherUnwell,
}

impl HealthStatus {
    pub fn points(&self) -> i32 {
        match self {
            Self::Healthy => 0,
            Self::ColdFlu => -2,
            Self::Tired => -1,
            Self::OtherUnwell => 1,
        }
    }

    /// Explains a voice change without indicating risk
    pub fn is_confounding(&self) -> bool {
        matches!(self, Self::ColdFlu | Self::Tired)
    }
}

/// Lifestyle risk factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifestyleFactor {
    Smoking,
    HeavyAlcohol,
    Sedentary,
    Obesity,
}

impl LifestyleFactor {
    pub fn points(&self) -> i32 {
        match self {
            Self::Smoking => 2,
            Self::HeavyAlcohol => 2,
            Self::Sedentary => 1,
            Self::Obesity => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Smoking => "smoking",
            Self::HeavyAlcohol => "heavy alcohol use",
            Self::Sedentary => "sedentary lifestyle",
            Self::Obesity => "obesity",
        }
    }
}

/// Time since the last medical checkup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckupRecency {
    #[default]
    WithinYear,
    OneToTwoYears,
    OverTwoYears,
    Never,
}

impl CheckupRecency {
    pub fn points(&self) -> i32 {
        match self {
            Self::WithinYear => 0,
            Self::OneToTwoYears => 1,
            Self::OverTwoYears => 2,
            Self::Never => 3,
        }
    }
}

/// Stroke warning sign reported as sudden onset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuddenEvent {
    SuddenWeakness,
    SuddenConfusion,
    SuddenHeadache,
}

impl SuddenEvent {
    pub fn points(&self) -> i32 {
        match self {
            Self::SuddenWeakness => 3,
            Self::SuddenConfusion => 3,
            Self::SuddenHeadache => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SuddenWeakness => "sudden weakness",
            Self::SuddenConfusion => "sudden confusion",
            Self::SuddenHeadache => "sudden severe headache",
        }
    }

    /// Weakness and confusion trigger the stroke-warning escalation
    pub fn is_stroke_warning(&self) -> bool {
        matches!(self, Self::SuddenWeakness | Self::SuddenConfusion)
    }
}

/// Questionnaire risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: i32) -> Self {
        if score <= 3 {
            Self::Low
        } else if score <= 7 {
            Self::Moderate
        } else {
            Self::High
        }
    }
}

/// Raw answers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionnaireAnswers {
    pub age: AgeBracket,
    pub conditions: Vec<MedicalCondition>,
    pub current_health: HealthStatus,
    pub lifestyle: Vec<LifestyleFactor>,
    pub last_checkup: CheckupRecency,
    pub sudden_events: Vec<SuddenEvent>,
}

/// Scored questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireResult {
    pub total_score: i32,
    pub risk_level: RiskLevel,
    pub has_confounding_factors: bool,
    pub confidence_modifier: f64,
    pub risk_factors: Vec<String>,
    pub sudden_events: Vec<SuddenEvent>,
}

/// Wire form handed to the triage request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireSummary {
    pub score: f64,
    pub risk_level: RiskLevel,
    pub has_confounding: bool,
    pub confidence_modifier: f64,
    #[serde(default)]
    pub sudden_events: Vec<SuddenEvent>,
}

impl QuestionnaireSummary {
    pub fn has_stroke_warning(&self) -> bool {
        self.sudden_events.iter().any(SuddenEvent::is_stroke_warning)
    }
}

/// Confidence modifier when a confounding health status is reported
const CONFOUNDING_MODIFIER: f64 = 0.6;
/// Multiplier once enough conditions are reported
const COMORBIDITY_MULTIPLIER: f64 = 1.2;
const COMORBIDITY_MIN_CONDITIONS: usize = 3;
const MAX_MODIFIER: f64 = 1.3;

impl QuestionnaireAnswers {
    /// Score the answers. Duplicate selections count once.
    pub fn score(&self) -> QuestionnaireResult {
        let mut conditions = self.conditions.clone();
        dedup_in_order(&mut conditions);
        let mut lifestyle = self.lifestyle.clone();
        dedup_in_order(&mut lifestyle);
        let mut sudden_events = self.sudden_events.clone();
        dedup_in_order(&mut sudden_events);

        let mut risk_factors = Vec::new();
        let mut total = self.age.points();
        if self.age.points() > 0 {
            risk_factors.push(format!("age bracket ({} pts)", self.age.points()));
        }

        for condition in &conditions {
            total += condition.points();
            risk_factors.push(format!("{} ({} pts)", condition.label(), condition.points()));
        }

        total += self.current_health.points();

        for factor in &lifestyle {
            total += factor.points();
            risk_factors.push(format!("{} ({} pts)", factor.label(), factor.points()));
        }

        total += self.last_checkup.points();
        if self.last_checkup.points() > 0 {
            risk_factors.push(format!("overdue checkup ({} pts)", self.last_checkup.points()));
        }

        for event in &sudden_events {
            total += event.points();
            risk_factors.push(format!("{} ({} pts)", event.label(), event.points()));
        }

        let has_confounding_factors = self.current_health.is_confounding();
        let mut confidence_modifier = if has_confounding_factors {
            CONFOUNDING_MODIFIER
        } else {
            1.0
        };
        if conditions.len() >= COMORBIDITY_MIN_CONDITIONS {
            confidence_modifier =
                (confidence_modifier * COMORBIDITY_MULTIPLIER).min(MAX_MODIFIER);
        }

        let risk_level = RiskLevel::from_score(total);
        debug!(
            "Questionnaire score {} ({:?}), confounding {}, modifier {:.2}",
            total, risk_level, has_confounding_factors, confidence_modifier
        );

        QuestionnaireResult {
            total_score: total,
            risk_level,
            has_confounding_factors,
            confidence_modifier,
            risk_factors,
            sudden_events,
        }
    }
}

fn dedup_in_order<T: PartialEq>(items: &mut Vec<T>) {
    let mut i = 0;
    while i < items.len() {
        if items[..i].contains(&items[i]) {
            items.remove(i);
        } else {
            i += 1;
        }
    }
}

impl QuestionnaireResult {
    pub fn summary(&self) -> QuestionnaireSummary {
        QuestionnaireSummary {
            score: f64::from(self.total_score),
            risk_level: self.risk_level,
            has_confounding: self.has_confounding_factors,
            confidence_modifier: self.confidence_modifier,
            sudden_events: self.sudden_events.clone(),
        }
    }
}
