//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod assess;
pub mod config;
pub mod select;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use regionfit_core::{
    AssessmentEngine, AssessmentSettings, CliQuotaProvider, Error, FileQuotaProvider,
    ModelRequest, QuotaProvider, RegionFitConfig,
};

use crate::output::OutputFormat;

/// Where the config file location came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Flag,
    Env,
    Detected,
    Default,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Flag => "flag",
            ConfigSource::Env => "env",
            ConfigSource::Detected => "detected",
            ConfigSource::Default => "default",
        }
    }
}

/// Shared context for all commands
pub struct Context {
    pub config: RegionFitConfig,
    pub config_path: Option<PathBuf>,
    pub config_source: ConfigSource,
    pub quota_file: Option<PathBuf>,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Context {
    /// Quota source: the fixture file if one was given, else the cloud CLI
    pub fn provider(&self) -> Arc<dyn QuotaProvider> {
        match &self.quota_file {
            Some(path) => Arc::new(
                FileQuotaProvider::new(path)
                    .with_usage_name_template(self.config.provider.usage_name_template.as_str()),
            ),
            None => Arc::new(CliQuotaProvider::new(self.config.provider.clone())),
        }
    }

    /// Engine over the configured provider; warns when the provider cannot
    /// be reached, since every probe will then report missing data
    pub async fn engine(&self, settings: AssessmentSettings) -> AssessmentEngine {
        let provider = self.provider();
        if !provider.is_available().await {
            log::warn!("{} is not available", provider.display_name());
        }
        AssessmentEngine::new(provider, settings)
    }
}

/// Model request flags shared by `select` and `assess`
#[derive(Args, Debug, Default)]
pub struct ModelArgs {
    /// Model request as [name=]model:deployment_type:capacity (repeatable)
    #[arg(long = "model", value_name = "MODEL")]
    pub entries: Vec<String>,

    /// Model identifiers, comma separated
    #[arg(long, value_delimiter = ',')]
    pub models: Vec<String>,

    /// Deployment types, one per model
    #[arg(long, value_delimiter = ',')]
    pub deployment_types: Vec<String>,

    /// Required capacities, one per model
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub capacities: Vec<i64>,

    /// Deployment names, one per model (default: the model identifier)
    #[arg(long, value_delimiter = ',')]
    pub names: Vec<String>,
}

impl ModelArgs {
    /// Requests from flags, falling back to the config file's `models`
    pub fn requests(&self, config: &RegionFitConfig) -> Result<Vec<ModelRequest>, Error> {
        let mut requests = self
            .entries
            .iter()
            .map(|raw| ModelRequest::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let lists_given = !self.models.is_empty()
            || !self.deployment_types.is_empty()
            || !self.capacities.is_empty()
            || !self.names.is_empty();
        if lists_given {
            requests.extend(ModelRequest::from_lists(
                &self.names,
                &self.models,
                &self.deployment_types,
                &self.capacities,
            )?);
        }

        if requests.is_empty() {
            requests = config.model_requests()?;
        }
        if requests.is_empty() {
            return Err(Error::validation(
                "no model requests given; use --model or add models to the config file",
            ));
        }
        Ok(requests)
    }
}

/// Split comma separated region flags, dropping blanks
pub fn region_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
