//! Configuration loading
//!
//! The config file is JSON. Every field is optional; missing fields take the
//! built-in defaults.
//!
//! ```text
//! {
//!   "candidate_regions": ["eastus", "swedencentral"],
//!   "recommended_threshold": 200,
//!   "max_concurrent_probes": 4,
//!   "env_key": "AZURE_LOCATION",
//!   "models": [
//!     { "name": "chat", "model": "gpt-4o", "deployment_type": "GlobalStandard", "capacity": 30 }
//!   ],
//!   "provider": { "program": "az", "timeout_secs": 30 }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::ModelRequest;
use crate::services::assessment::{AssessmentSettings, DEFAULT_MAX_CONCURRENT_PROBES};
use crate::services::env_store::DEFAULT_ENV_KEY;
use crate::services::quota::{CliProviderSettings, RECOMMENDED_THRESHOLD};
use crate::utils::expand_path;

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "REGIONFIT_CONFIG";

/// Regions probed when the config names none
pub const DEFAULT_CANDIDATE_REGIONS: &[&str] = &[
    "eastus",
    "eastus2",
    "westus",
    "westus2",
    "westus3",
    "northcentralus",
    "southcentralus",
    "canadacentral",
    "uksouth",
    "francecentral",
    "swedencentral",
    "japaneast",
    "australiaeast",
];

/// A model request as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRequestEntry {
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
    pub deployment_type: String,
    pub capacity: i64,
}

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionFitConfig {
    pub candidate_regions: Vec<String>,
    pub recommended_threshold: i64,
    pub max_concurrent_probes: usize,
    pub env_key: String,
    pub models: Vec<ModelRequestEntry>,
    pub provider: CliProviderSettings,
}

impl Default for RegionFitConfig {
    fn default() -> Self {
        Self {
            candidate_regions: DEFAULT_CANDIDATE_REGIONS.iter().map(|s| s.to_string()).collect(),
            recommended_threshold: RECOMMENDED_THRESHOLD,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
            env_key: DEFAULT_ENV_KEY.to_string(),
            models: Vec::new(),
            provider: CliProviderSettings::default(),
        }
    }
}

impl RegionFitConfig {
    /// Load configuration
    ///
    /// Priority: `explicit` path > `REGIONFIT_CONFIG` env var > default
    /// config file (only if it exists) > built-in defaults. An explicitly
    /// named file that does not exist is an error.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        if let Some(raw) = explicit {
            return Self::from_file(&expand_path(raw));
        }

        if let Ok(raw) = std::env::var(CONFIG_ENV_VAR) {
            if !raw.trim().is_empty() {
                return Self::from_file(&expand_path(&raw));
            }
        }

        match default_config_path() {
            Ok(path) if path.exists() => Self::from_file(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Read and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        log::debug!("Loaded config from {:?}", path);
        config.validate()
    }

    /// Reject values the engine cannot work with
    pub fn validate(self) -> Result<Self> {
        if self.recommended_threshold < 0 {
            return Err(Error::config(format!(
                "recommended_threshold must not be negative, got {}",
                self.recommended_threshold
            )));
        }
        if self.max_concurrent_probes == 0 {
            return Err(Error::config("max_concurrent_probes must be at least 1"));
        }
        if self.provider.program.trim().is_empty() {
            return Err(Error::config("provider.program must not be empty"));
        }
        Ok(self)
    }

    /// Model requests from the config file, validated
    pub fn model_requests(&self) -> Result<Vec<ModelRequest>> {
        self.models
            .iter()
            .map(|m| {
                ModelRequest::new(
                    m.name.clone().unwrap_or_default(),
                    m.model.as_str(),
                    m.deployment_type.as_str(),
                    m.capacity,
                )
            })
            .collect()
    }

    pub fn assessment_settings(&self) -> AssessmentSettings {
        AssessmentSettings {
            recommended_threshold: self.recommended_threshold,
            max_concurrent_probes: self.max_concurrent_probes,
        }
    }
}

/// Default config file location
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "regionfit", "regionfit")
        .ok_or_else(|| Error::config("Could not determine project directories"))?;
    Ok(dirs.config_dir().join("config.json"))
}

/// The config file `load(explicit)` would read, if any
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(raw) = explicit {
        return Some(expand_path(raw));
    }
    if let Ok(raw) = std::env::var(CONFIG_ENV_VAR) {
        if !raw.trim().is_empty() {
            return Some(expand_path(&raw));
        }
    }
    default_config_path().ok().filter(|p| p.exists())
}
