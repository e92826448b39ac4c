//! Cloud CLI quota provider
//!
//! Implements the QuotaProvider trait by shelling out to the cloud
//! management CLI and reading the region's usage listing.
//!
//! # Overview
//!
//! For every probe the provider runs (by default)
//!
//! ```text
//! az cognitiveservices usage list --location <region> --output json
//! ```
//!
//! and looks for the entry whose `name.value` matches the request's usage
//! key, rendered from a template (`OpenAI.{deployment_type}.{model}` unless
//! configured otherwise). A missing entry means the region has no quota
//! data for that model.
//!
//! Every call is bounded by `timeout_secs`. The child process is killed when
//! the timeout fires.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::{QuotaError, QuotaProvider};
use super::types::{find_usage, parse_usage_listing, usage_key, QuotaUsage, DEFAULT_USAGE_NAME_TEMPLATE};
use crate::models::ModelRequest;
use crate::utils::create_command;

// ============================================================================
// Constants
// ============================================================================

/// Default management CLI program
const DEFAULT_PROGRAM: &str = "az";

/// Default probe timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Stderr fragments that indicate an authentication problem
const AUTH_ERROR_MARKERS: &[&str] = &["az login", "aadsts", "not logged in", "unauthorized"];

// ============================================================================
// Settings
// ============================================================================

/// How to invoke the management CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliProviderSettings {
    /// Program to run
    pub program: String,
    /// Arguments; `{region}` is replaced with the probed region
    pub args: Vec<String>,
    /// Template for the usage entry name of a request
    pub usage_name_template: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CliProviderSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: [
                "cognitiveservices",
                "usage",
                "list",
                "--location",
                "{region}",
                "--output",
                "json",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            usage_name_template: DEFAULT_USAGE_NAME_TEMPLATE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CliProviderSettings {
    /// Arguments for probing `region`
    pub fn args_for(&self, region: &str) -> Vec<String> {
        self.args.iter().map(|a| a.replace("{region}", region)).collect()
    }
}

// ============================================================================
// CliQuotaProvider
// ============================================================================

/// Quota provider backed by the cloud management CLI
pub struct CliQuotaProvider {
    settings: CliProviderSettings,
}

impl CliQuotaProvider {
    pub fn new(settings: CliProviderSettings) -> Self {
        Self { settings }
    }

    /// Run the listing command for a region and return its stdout
    async fn list_usages(&self, region: &str) -> Result<String, QuotaError> {
        let args = self.settings.args_for(region);
        log::debug!(
            "[quota:cli] Running {} {}",
            self.settings.program,
            args.join(" ")
        );

        let mut cmd = create_command(&self.settings.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut cmd = tokio::process::Command::from(cmd);
        cmd.kill_on_drop(true);

        let timeout = Duration::from_secs(self.settings.timeout_secs.max(1));
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                log::warn!(
                    "[quota:cli] Usage listing for {} timed out after {}s",
                    region,
                    timeout.as_secs()
                );
                return Err(QuotaError::Timeout(timeout.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(&stderr, output.status.code()));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| QuotaError::ParseError(format!("usage listing is not UTF-8: {}", e)))
    }
}

/// Map a failed CLI invocation to a QuotaError
fn classify_failure(stderr: &str, code: Option<i32>) -> QuotaError {
    let lowered = stderr.to_lowercase();
    if AUTH_ERROR_MARKERS.iter().any(|m| lowered.contains(m)) {
        return QuotaError::Unauthorized(stderr.to_string());
    }
    let first_line = stderr.lines().next().unwrap_or("").to_string();
    match code {
        Some(code) => QuotaError::CommandFailed(format!("exit code {}: {}", code, first_line)),
        None => QuotaError::CommandFailed(format!("terminated by signal: {}", first_line)),
    }
}

#[async_trait]
impl QuotaProvider for CliQuotaProvider {
    fn provider_id(&self) -> &'static str {
        "cli"
    }

    fn display_name(&self) -> &'static str {
        "Cloud CLI"
    }

    async fn observe(
        &self,
        region: &str,
        request: &ModelRequest,
    ) -> Result<Option<QuotaUsage>, QuotaError> {
        let stdout = self.list_usages(region).await?;
        let entries = parse_usage_listing(&stdout)?;
        let key = usage_key(&self.settings.usage_name_template, request);
        let usage = find_usage(&entries, &key);

        if usage.is_none() {
            log::debug!("[quota:cli] No usage entry {} in {}", key, region);
        }
        Ok(usage)
    }

    async fn observe_region(
        &self,
        region: &str,
        requests: &[ModelRequest],
    ) -> Vec<Result<Option<QuotaUsage>, QuotaError>> {
        let entries = match self.list_usages(region).await {
            Ok(stdout) => parse_usage_listing(&stdout),
            Err(e) => Err(e),
        };
        let entries = match entries {
            Ok(entries) => entries,
            Err(e) => return requests.iter().map(|_| Err(e.clone())).collect(),
        };

        requests
            .iter()
            .map(|request| {
                let key = usage_key(&self.settings.usage_name_template, request);
                let usage = find_usage(&entries, &key);
                if usage.is_none() {
                    log::debug!("[quota:cli] No usage entry {} in {}", key, region);
                }
                Ok(usage)
            })
            .collect()
    }

    async fn is_available(&self) -> bool {
        let mut cmd = create_command(&self.settings.program);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let mut cmd = tokio::process::Command::from(cmd);
        cmd.kill_on_drop(true);

        let timeout = Duration::from_secs(self.settings.timeout_secs.max(1));
        matches!(
            tokio::time::timeout(timeout, cmd.status()).await,
            Ok(Ok(status)) if status.success()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ModelRequest {
        ModelRequest::new("", "gpt-4o", "GlobalStandard", 10).unwrap()
    }

    #[test]
    fn test_default_settings() {
        let settings = CliProviderSettings::default();
        assert_eq!(settings.program, "az");
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(
            settings.args_for("swedencentral"),
            vec![
                "cognitiveservices",
                "usage",
                "list",
                "--location",
                "swedencentral",
                "--output",
                "json"
            ]
        );
    }

    #[test]
    fn test_classify_auth_failure() {
        let err = classify_failure("ERROR: Please run 'az login' to setup account.", Some(1));
        assert!(matches!(err, QuotaError::Unauthorized(_)));
    }

    #[test]
    fn test_classify_other_failure() {
        let err = classify_failure("ERROR: The region 'mars' is invalid\nmore", Some(2));
        match err {
            QuotaError::CommandFailed(msg) => {
                assert!(msg.contains("exit code 2"));
                assert!(!msg.contains("more"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_not_installed() {
        let provider = CliQuotaProvider::new(CliProviderSettings {
            program: "regionfit-definitely-missing-binary".to_string(),
            ..Default::default()
        });
        let err = provider.observe("eastus", &request()).await.unwrap_err();
        assert!(matches!(err, QuotaError::NotInstalled(_)));
        assert!(!provider.is_available().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reads_listing_from_command_output() {
        let listing = r#"[{"name":{"value":"OpenAI.GlobalStandard.gpt-4o"},"currentValue":20,"limit":150}]"#;
        let provider = CliQuotaProvider::new(CliProviderSettings {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), format!("echo '{}'", listing)],
            ..Default::default()
        });

        let usage = provider.observe("eastus", &request()).await.unwrap();
        assert_eq!(usage, Some(QuotaUsage::new(150, 20)));

        let other = ModelRequest::new("", "o3", "GlobalStandard", 10).unwrap();
        assert_eq!(provider.observe("eastus", &other).await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_region_listing_runs_once_for_all_requests() {
        let dir = tempfile::TempDir::new().unwrap();
        let runs = dir.path().join("runs");
        let listing = r#"[{"name":{"value":"OpenAI.GlobalStandard.gpt-4o"},"currentValue":20,"limit":150},{"name":{"value":"OpenAI.GlobalStandard.o3"},"currentValue":0,"limit":50}]"#;
        let provider = CliQuotaProvider::new(CliProviderSettings {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                format!("echo run >> '{}'; echo '{}'", runs.display(), listing),
            ],
            ..Default::default()
        });

        let requests = vec![
            request(),
            ModelRequest::new("", "o3", "GlobalStandard", 10).unwrap(),
            ModelRequest::new("", "o1", "GlobalStandard", 10).unwrap(),
        ];
        let results = provider.observe_region("eastus", &requests).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &Some(QuotaUsage::new(150, 20)));
        assert_eq!(results[1].as_ref().unwrap(), &Some(QuotaUsage::new(50, 0)));
        assert_eq!(results[2].as_ref().unwrap(), &None);
        assert_eq!(std::fs::read_to_string(&runs).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_region_listing_failure_applies_to_every_request() {
        let provider = CliQuotaProvider::new(CliProviderSettings {
            program: "regionfit-definitely-missing-binary".to_string(),
            ..Default::default()
        });
        let results = provider.observe_region("eastus", &[request(), request()]).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| matches!(r, Err(QuotaError::NotInstalled(_)))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_command_times_out() {
        let provider = CliQuotaProvider::new(CliProviderSettings {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "sleep 5".to_string()],
            timeout_secs: 1,
            ..Default::default()
        });
        let err = provider.observe("eastus", &request()).await.unwrap_err();
        assert!(matches!(err, QuotaError::Timeout(1)));
    }
}
