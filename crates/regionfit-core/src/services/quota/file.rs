//! Fixture-file quota provider
//!
//! Reads region usage listings from a JSON file shaped like
//!
//! ```text
//! {
//!   "eastus":  [ { "name": { "value": "OpenAI.GlobalStandard.gpt-4o" },
//!                  "currentValue": 95, "limit": 100 } ],
//!   "westus3": [ ... ]
//! }
//! ```
//!
//! i.e. one CLI usage listing per region. The file is read again for every
//! region lookup, so edits between prompts are picked up.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use super::provider::{QuotaError, QuotaProvider};
use super::types::{find_usage, usage_key, QuotaUsage, UsageEntry, DEFAULT_USAGE_NAME_TEMPLATE};
use crate::models::ModelRequest;

/// Quota provider backed by a JSON fixture file
pub struct FileQuotaProvider {
    path: PathBuf,
    usage_name_template: String,
}

impl FileQuotaProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            usage_name_template: DEFAULT_USAGE_NAME_TEMPLATE.to_string(),
        }
    }

    /// Override the usage entry name template
    pub fn with_usage_name_template(mut self, template: impl Into<String>) -> Self {
        self.usage_name_template = template.into();
        self
    }

    async fn load(&self) -> Result<HashMap<String, Vec<UsageEntry>>, QuotaError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            log::warn!("[quota:file] Failed to read {:?}: {}", self.path, e);
            QuotaError::IoError(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl QuotaProvider for FileQuotaProvider {
    fn provider_id(&self) -> &'static str {
        "file"
    }

    fn display_name(&self) -> &'static str {
        "Quota fixture file"
    }

    async fn observe(
        &self,
        region: &str,
        request: &ModelRequest,
    ) -> Result<Option<QuotaUsage>, QuotaError> {
        let regions = self.load().await?;
        let Some(entries) = regions.get(region) else {
            log::debug!("[quota:file] Region {} not present in {:?}", region, self.path);
            return Ok(None);
        };
        let key = usage_key(&self.usage_name_template, request);
        Ok(find_usage(entries, &key))
    }

    async fn observe_region(
        &self,
        region: &str,
        requests: &[ModelRequest],
    ) -> Vec<Result<Option<QuotaUsage>, QuotaError>> {
        let regions = match self.load().await {
            Ok(regions) => regions,
            Err(e) => return requests.iter().map(|_| Err(e.clone())).collect(),
        };
        let entries = regions.get(region).map(Vec::as_slice).unwrap_or(&[]);
        requests
            .iter()
            .map(|request| {
                let key = usage_key(&self.usage_name_template, request);
                Ok(find_usage(entries, &key))
            })
            .collect()
    }

    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.path).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write fixture");
        file
    }

    #[tokio::test]
    async fn test_reads_region_listing() {
        let file = fixture(
            r#"{"eastus": [{"name": {"value": "OpenAI.GlobalStandard.gpt-4o"}, "currentValue": 95, "limit": 100}]}"#,
        );
        let provider = FileQuotaProvider::new(file.path());
        let req = ModelRequest::new("", "gpt-4o", "GlobalStandard", 10).unwrap();

        assert!(provider.is_available().await);
        assert_eq!(
            provider.observe("eastus", &req).await.unwrap(),
            Some(QuotaUsage::new(100, 95))
        );
        assert_eq!(provider.observe("westus", &req).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_observe_region_matches_single_probes() {
        let file = fixture(
            r#"{"eastus": [{"name": {"value": "OpenAI.GlobalStandard.gpt-4o"}, "currentValue": 95, "limit": 100}]}"#,
        );
        let provider = FileQuotaProvider::new(file.path());
        let requests = vec![
            ModelRequest::new("", "gpt-4o", "GlobalStandard", 10).unwrap(),
            ModelRequest::new("", "o3", "GlobalStandard", 10).unwrap(),
        ];

        let results = provider.observe_region("eastus", &requests).await;
        assert_eq!(results[0].as_ref().unwrap(), &Some(QuotaUsage::new(100, 95)));
        assert_eq!(results[1].as_ref().unwrap(), &None);

        let elsewhere = provider.observe_region("westus", &requests).await;
        assert!(elsewhere.iter().all(|r| matches!(r, Ok(None))));

        let missing = FileQuotaProvider::new("/nonexistent/regionfit/quota.json");
        let failed = missing.observe_region("eastus", &requests).await;
        assert!(failed.iter().all(|r| matches!(r, Err(QuotaError::IoError(_)))));
    }

    #[tokio::test]
    async fn test_missing_file_is_transport_failure() {
        let provider = FileQuotaProvider::new("/nonexistent/regionfit/quota.json");
        let req = ModelRequest::new("", "gpt-4o", "GlobalStandard", 10).unwrap();
        assert!(!provider.is_available().await);
        assert!(matches!(
            provider.observe("eastus", &req).await,
            Err(QuotaError::IoError(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let file = fixture("{ not json");
        let provider = FileQuotaProvider::new(file.path());
        let req = ModelRequest::new("", "gpt-4o", "GlobalStandard", 10).unwrap();
        assert!(matches!(
            provider.observe("eastus", &req).await,
            Err(QuotaError::ParseError(_))
        ));
    }
}
