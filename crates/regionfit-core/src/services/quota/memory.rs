//! In-memory quota provider
//!
//! Holds usage numbers keyed by region and usage key. Useful for embedding
//! the engine with data fetched elsewhere, and for tests: it counts probes
//! and can inject transport failures and latency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::provider::{QuotaError, QuotaProvider};
use super::types::{usage_key, QuotaUsage, DEFAULT_USAGE_NAME_TEMPLATE};
use crate::models::ModelRequest;

#[derive(Default)]
struct ProbeStats {
    per_region: HashMap<String, usize>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Quota provider serving numbers from memory
pub struct StaticQuotaProvider {
    usages: RwLock<HashMap<(String, String), QuotaUsage>>,
    failures: RwLock<HashMap<String, String>>,
    usage_name_template: String,
    latency: Option<Duration>,
    probes: AtomicUsize,
    stats: Mutex<ProbeStats>,
}

impl Default for StaticQuotaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticQuotaProvider {
    pub fn new() -> Self {
        Self {
            usages: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            usage_name_template: DEFAULT_USAGE_NAME_TEMPLATE.to_string(),
            latency: None,
            probes: AtomicUsize::new(0),
            stats: Mutex::new(ProbeStats::default()),
        }
    }

    /// Add usage numbers for a model/deployment type in a region
    pub fn with_usage(
        self,
        region: &str,
        model: &str,
        deployment_type: &str,
        limit: i64,
        used: i64,
    ) -> Self {
        self.set_usage(region, model, deployment_type, limit, used);
        self
    }

    /// Make every probe of `region` fail with a transport error
    pub fn with_failure(self, region: &str, reason: &str) -> Self {
        self.failures
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(region.to_string(), reason.to_string());
        self
    }

    /// Delay every probe, to exercise concurrent fan-out
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replace usage numbers, e.g. to simulate quota drift between probes
    pub fn set_usage(&self, region: &str, model: &str, deployment_type: &str, limit: i64, used: i64) {
        let key = self
            .usage_name_template
            .replace("{deployment_type}", deployment_type)
            .replace("{model}", model);
        self.usages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((region.to_string(), key), QuotaUsage::new(limit, used));
    }

    /// Total number of probes served
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Number of probes served for one region
    pub fn probes_for(&self, region: &str) -> usize {
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.per_region.get(region).copied().unwrap_or(0)
    }

    /// Highest number of probes that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).max_in_flight
    }

    fn enter(&self, region: &str) {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        *stats.per_region.entry(region.to_string()).or_insert(0) += 1;
        stats.in_flight += 1;
        stats.max_in_flight = stats.max_in_flight.max(stats.in_flight);
    }

    fn leave(&self) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.in_flight = stats.in_flight.saturating_sub(1);
    }
}

#[async_trait]
impl QuotaProvider for StaticQuotaProvider {
    fn provider_id(&self) -> &'static str {
        "static"
    }

    async fn observe(
        &self,
        region: &str,
        request: &ModelRequest,
    ) -> Result<Option<QuotaUsage>, QuotaError> {
        self.enter(region);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.leave();

        let failure = self
            .failures
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(region)
            .cloned();
        if let Some(reason) = failure {
            return Err(QuotaError::Other(reason));
        }

        let key = usage_key(&self.usage_name_template, request);
        Ok(self
            .usages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(region.to_string(), key))
            .copied())
    }

    async fn is_available(&self) -> bool {
        true
    }
}
