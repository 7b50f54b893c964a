use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::agreement::AgreementConfig;
use crate::classify::LevelConfig;
use crate::enrich::EscalationConfig;
use crate::quality::QualityConfig;
use crate::scoring::rules::{ConsistencyConfig, ExtremeConfig};
use crate::scoring::PointsConfig;
use crate::service::ServiceConfig;
use crate::thresholds::ThresholdProfiles;
use crate::wer::WordErrorConfig;

/// Current config schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Label of the clinical threshold set shipped as default
pub const THRESHOLD_VERSION: &str = "praat-clinical-v1";

/// Engine configuration
///
/// Every tunable constant of the decision engine lives here, so a deployed
/// configuration can be audited as one file. Missing sections fall back to
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub schema_version: u32,
    pub threshold_version: String,
    pub thresholds: ThresholdProfiles,
    pub quality: QualityConfig,
    pub points: PointsConfig,
    pub extreme: ExtremeConfig,
    pub consistency: ConsistencyConfig,
    pub levels: LevelConfig,
    pub agreement: AgreementConfig,
    pub questionnaire_escalation: EscalationConfig,
    pub word_error: WordErrorConfig,
    pub service: ServiceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            threshold_version: THRESHOLD_VERSION.to_string(),
            thresholds: ThresholdProfiles::default(),
            quality: QualityConfig::default(),
            points: PointsConfig::default(),
            extreme: ExtremeConfig::default(),
            consistency: ConsistencyConfig::default(),
            levels: LevelConfig::default(),
            agreement: AgreementConfig::default(),
            questionnaire_escalation: EscalationConfig::default(),
            word_error: WordErrorConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            let config: Self = serde_json::from_str(&content)
                .context("Failed to parse config file")?;
            if config.schema_version != SCHEMA_VERSION {
                warn!(
                    "Config schema version {} differs from supported version {}",
                    config.schema_version, SCHEMA_VERSION
                );
            }
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, content)
            .context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to get home directory")?;
        Ok(home.join(".voice-triage"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }
}
