//! Region assessment engine
//!
//! Probes every (region, model request) pair through a [`QuotaProvider`]
//! and folds the observations into one [`RegionAssessment`] per region.
//!
//! Regions are probed concurrently, at most `max_concurrent_probes` at a
//! time, with one provider call per region covering all requests. Each
//! result lands in its own `(region, request)` slot, written once by the
//! collecting task, so completion order does not matter.
//!
//! The engine does not rank anything. [`AssessmentTable`] is an unordered
//! map; ordering is the selection procedure's business.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::quota::{Observation, QuotaProvider, RECOMMENDED_THRESHOLD};
use crate::models::ModelRequest;

/// Default number of probes allowed in flight at once
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 4;

// ============================================================================
// Settings
// ============================================================================

/// Tunables for the assessment engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentSettings {
    /// Minimum available quota, per request, for a region to be recommended
    pub recommended_threshold: i64,
    /// Upper bound on concurrent provider calls
    pub max_concurrent_probes: usize,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self {
            recommended_threshold: RECOMMENDED_THRESHOLD,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
        }
    }
}

// ============================================================================
// Assessment Types
// ============================================================================

/// Classification of one model request in one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestAssessment {
    pub request: ModelRequest,
    pub observation: Observation,
    /// Present and `available >= capacity`
    pub sufficient: bool,
    /// Present and `available >= recommended threshold`
    pub recommended: bool,
}

impl RequestAssessment {
    /// Classify an observation against a request and the threshold
    pub fn evaluate(request: ModelRequest, observation: Observation, threshold: i64) -> Self {
        let (sufficient, recommended) = match observation.available() {
            Some(available) => (available >= i64::from(request.capacity), available >= threshold),
            None => (false, false),
        };
        Self {
            request,
            observation,
            sufficient,
            recommended,
        }
    }
}

/// Joint classification of all model requests in one region
#[derive(Debug, Clone, Serialize)]
pub struct RegionAssessment {
    pub region: String,
    pub requests: Vec<RequestAssessment>,
    /// Every request is sufficient
    pub sufficient: bool,
    /// Every request meets the recommended threshold
    pub recommended: bool,
    /// At least one request has no usable observation
    pub has_missing_data: bool,
    pub checked_at: DateTime<Utc>,
}

impl RegionAssessment {
    /// Derive region-level flags from per-request classifications
    ///
    /// A region with no requests is neither sufficient nor recommended.
    pub fn from_requests(region: impl Into<String>, requests: Vec<RequestAssessment>) -> Self {
        let any = !requests.is_empty();
        let sufficient = any && requests.iter().all(|r| r.sufficient);
        let recommended = any && requests.iter().all(|r| r.recommended);
        let has_missing_data = requests.iter().any(|r| r.observation.is_missing());

        Self {
            region: region.into(),
            requests,
            sufficient,
            recommended,
            has_missing_data,
            checked_at: Utc::now(),
        }
    }

    /// Smallest headroom across requests; `None` if any data is missing
    pub fn min_available(&self) -> Option<i64> {
        self.requests
            .iter()
            .map(|r| r.observation.available())
            .collect::<Option<Vec<i64>>>()
            .and_then(|values| values.into_iter().min())
    }

    /// Requests without a usable observation
    pub fn missing(&self) -> impl Iterator<Item = &RequestAssessment> {
        self.requests.iter().filter(|r| r.observation.is_missing())
    }

    /// Requests that are present but below their required capacity
    pub fn short(&self) -> impl Iterator<Item = &RequestAssessment> {
        self.requests
            .iter()
            .filter(|r| !r.sufficient && !r.observation.is_missing())
    }

    /// One-line status, used in diagnostics
    pub fn status_label(&self) -> &'static str {
        if self.has_missing_data {
            "missing data"
        } else if self.sufficient && self.recommended {
            "sufficient, recommended"
        } else if self.sufficient {
            "sufficient, below recommended threshold"
        } else {
            "insufficient"
        }
    }
}

/// Assessments keyed by region; carries no ordering
#[derive(Debug, Clone, Default)]
pub struct AssessmentTable {
    regions: HashMap<String, RegionAssessment>,
}

impl AssessmentTable {
    pub fn get(&self, region: &str) -> Option<&RegionAssessment> {
        self.regions.get(region)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &RegionAssessment> {
        self.regions.values()
    }

    pub fn into_values(self) -> impl Iterator<Item = RegionAssessment> {
        self.regions.into_values()
    }

    fn insert(&mut self, assessment: RegionAssessment) {
        self.regions.insert(assessment.region.clone(), assessment);
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Assesses regions against a set of model requests
pub struct AssessmentEngine {
    provider: Arc<dyn QuotaProvider>,
    settings: AssessmentSettings,
}

impl AssessmentEngine {
    pub fn new(provider: Arc<dyn QuotaProvider>, settings: AssessmentSettings) -> Self {
        Self { provider, settings }
    }

    /// Assess a single region
    pub async fn assess_region(&self, requests: &[ModelRequest], region: &str) -> RegionAssessment {
        let mut table = self.assess(requests, &[region.to_string()]).await;
        table
            .regions
            .remove(region)
            .unwrap_or_else(|| RegionAssessment::from_requests(region, Vec::new()))
    }

    /// Assess every region in `regions` for all of `requests`
    ///
    /// Duplicate region identifiers are probed once. Provider failures are
    /// folded into the assessment as missing data; this never fails.
    pub async fn assess(&self, requests: &[ModelRequest], regions: &[String]) -> AssessmentTable {
        let mut seen = HashSet::new();
        let mut unique: Vec<&String> = Vec::with_capacity(regions.len());
        for region in regions {
            if seen.insert(region.as_str()) {
                unique.push(region);
            }
        }
        let regions = unique;

        log::info!(
            "[assess] Probing {} region(s) x {} request(s) via {} (max {} in flight)",
            regions.len(),
            requests.len(),
            self.provider.display_name(),
            self.settings.max_concurrent_probes.max(1)
        );

        let mut slots = self.probe_all(requests, &regions).await;

        let mut table = AssessmentTable::default();
        for (region_idx, region) in regions.iter().enumerate() {
            let assessed = requests
                .iter()
                .enumerate()
                .map(|(request_idx, request)| {
                    let observation = slots.remove(&(region_idx, request_idx)).unwrap_or_else(|| {
                        Observation::Unreachable {
                            reason: "probe task did not complete".to_string(),
                        }
                    });
                    log::debug!(
                        "[assess] {} / {}: {}",
                        region,
                        request.label(),
                        observation.describe()
                    );
                    RequestAssessment::evaluate(
                        request.clone(),
                        observation,
                        self.settings.recommended_threshold,
                    )
                })
                .collect();

            let assessment = RegionAssessment::from_requests(region.as_str(), assessed);
            log::info!("[assess] {}: {}", assessment.region, assessment.status_label());
            table.insert(assessment);
        }

        table
    }

    /// Run all probes with bounded fan-out
    ///
    /// One task per region, at most `max_concurrent_probes` in flight; each
    /// asks the provider for every request of that region in one call.
    /// Returns one observation per `(region index, request index)`. Slots of
    /// panicked tasks are left empty.
    async fn probe_all(
        &self,
        requests: &[ModelRequest],
        regions: &[&String],
    ) -> HashMap<(usize, usize), Observation> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_probes.max(1)));
        let requests: Arc<[ModelRequest]> = requests.into();
        let mut probes = JoinSet::new();

        for (region_idx, region) in regions.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let requests = Arc::clone(&requests);
            let region = (*region).clone();

            probes.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let observations = requests
                            .iter()
                            .map(|_| Observation::Unreachable {
                                reason: "probe pool closed".to_string(),
                            })
                            .collect::<Vec<_>>();
                        return (region_idx, observations);
                    }
                };
                let observations = provider
                    .observe_region(&region, &requests)
                    .await
                    .into_iter()
                    .map(Observation::from_probe)
                    .collect::<Vec<_>>();
                (region_idx, observations)
            });
        }

        let mut slots = HashMap::with_capacity(regions.len() * requests.len());
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((region_idx, observations)) => {
                    if observations.len() != requests.len() {
                        log::warn!(
                            "[assess] Provider returned {} result(s) for {} request(s) in {}",
                            observations.len(),
                            requests.len(),
                            regions[region_idx]
                        );
                    }
                    for (request_idx, observation) in observations.into_iter().enumerate().take(requests.len()) {
                        slots.entry((region_idx, request_idx)).or_insert(observation);
                    }
                }
                Err(e) => log::error!("[assess] Probe task failed: {}", e),
            }
        }
        slots
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quota::{QuotaError, QuotaUsage, StaticQuotaProvider};
    use std::time::Duration;

    fn request(model: &str, capacity: i64) -> ModelRequest {
        ModelRequest::new("", model, "GlobalStandard", capacity).unwrap()
    }

    fn engine(provider: Arc<StaticQuotaProvider>) -> AssessmentEngine {
        AssessmentEngine::new(provider, AssessmentSettings::default())
    }

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_request_sufficiency_boundary() {
        let req = request("gpt-4o", 10);
        let exact = RequestAssessment::evaluate(
            req.clone(),
            Observation::Present { limit: 100, used: 90 },
            RECOMMENDED_THRESHOLD,
        );
        assert!(exact.sufficient);
        assert!(!exact.recommended);

        let short = RequestAssessment::evaluate(
            req,
            Observation::Present { limit: 100, used: 91 },
            RECOMMENDED_THRESHOLD,
        );
        assert!(!short.sufficient);
    }

    #[test]
    fn test_negative_available_is_insufficient() {
        let assessed = RequestAssessment::evaluate(
            request("gpt-4o", 1),
            Observation::Present { limit: 50, used: 80 },
            RECOMMENDED_THRESHOLD,
        );
        assert_eq!(assessed.observation.available(), Some(-30));
        assert!(!assessed.sufficient);
        assert!(!assessed.recommended);
    }

    #[test]
    fn test_recommended_is_independent_of_capacity() {
        // Small request, small headroom: sufficient but not recommended
        let small = RequestAssessment::evaluate(
            request("gpt-4o", 5),
            Observation::Present { limit: 10, used: 0 },
            RECOMMENDED_THRESHOLD,
        );
        assert!(small.sufficient);
        assert!(!small.recommended);

        // Large request: 260 available is both, 150 is neither
        let large_ok = RequestAssessment::evaluate(
            request("gpt-4o", 250),
            Observation::Present { limit: 300, used: 40 },
            RECOMMENDED_THRESHOLD,
        );
        assert!(large_ok.sufficient && large_ok.recommended);

        let large_short = RequestAssessment::evaluate(
            request("gpt-4o", 250),
            Observation::Present { limit: 300, used: 150 },
            RECOMMENDED_THRESHOLD,
        );
        assert!(!large_short.sufficient && !large_short.recommended);

        // Required above the threshold: recommended can hold while sufficient does not
        let over = RequestAssessment::evaluate(
            request("gpt-4o", 300),
            Observation::Present { limit: 500, used: 250 },
            RECOMMENDED_THRESHOLD,
        );
        assert!(!over.sufficient);
        assert!(over.recommended);
    }

    #[test]
    fn test_absence_is_never_satisfaction() {
        let assessed = RegionAssessment::from_requests(
            "eastus",
            vec![
                RequestAssessment::evaluate(
                    request("gpt-4o", 10),
                    Observation::Present { limit: 1000, used: 0 },
                    RECOMMENDED_THRESHOLD,
                ),
                RequestAssessment::evaluate(request("o3", 10), Observation::Absent, RECOMMENDED_THRESHOLD),
            ],
        );
        assert!(assessed.has_missing_data);
        assert!(!assessed.sufficient);
        assert!(!assessed.recommended);
        assert_eq!(assessed.min_available(), None);
        assert_eq!(assessed.missing().count(), 1);
    }

    #[test]
    fn test_empty_request_set_does_not_qualify() {
        let assessed = RegionAssessment::from_requests("eastus", Vec::new());
        assert!(!assessed.sufficient);
        assert!(!assessed.recommended);
    }

    #[tokio::test]
    async fn test_joint_satisfiability() {
        let provider = Arc::new(
            StaticQuotaProvider::new()
                .with_usage("eastus", "gpt-4o", "GlobalStandard", 1000, 0)
                .with_usage("eastus", "o3", "GlobalStandard", 100, 95)
                .with_usage("westus", "gpt-4o", "GlobalStandard", 1000, 0)
                .with_usage("westus", "o3", "GlobalStandard", 1000, 0),
        );
        let requests = vec![request("gpt-4o", 50), request("o3", 10)];
        let table = engine(provider)
            .assess(&requests, &regions(&["eastus", "westus"]))
            .await;

        let east = table.get("eastus").unwrap();
        assert!(!east.sufficient);
        assert!(!east.has_missing_data);
        assert_eq!(east.short().count(), 1);

        let west = table.get("westus").unwrap();
        assert!(west.sufficient);
        assert!(west.recommended);
        assert_eq!(west.min_available(), Some(1000));
    }

    #[tokio::test]
    async fn test_transport_failure_counts_as_missing() {
        let provider = Arc::new(StaticQuotaProvider::new().with_failure("eastus", "connection reset"));
        let assessed = engine(provider)
            .assess_region(&[request("gpt-4o", 10)], "eastus")
            .await;
        assert!(assessed.has_missing_data);
        assert!(!assessed.sufficient);
        assert!(matches!(
            assessed.requests[0].observation,
            Observation::Unreachable { .. }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_regions_probed_once() {
        let provider = Arc::new(StaticQuotaProvider::new().with_usage("eastus", "gpt-4o", "GlobalStandard", 100, 0));
        let table = engine(Arc::clone(&provider))
            .assess(&[request("gpt-4o", 10)], &regions(&["eastus", "eastus", "eastus"]))
            .await;
        assert_eq!(table.len(), 1);
        assert_eq!(provider.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_every_pair_is_probed() {
        let provider = Arc::new(StaticQuotaProvider::new());
        let requests = vec![request("gpt-4o", 10), request("o3", 10)];
        let table = engine(Arc::clone(&provider))
            .assess(&requests, &regions(&["a", "b", "c"]))
            .await;
        assert_eq!(table.len(), 3);
        assert_eq!(provider.probe_count(), 6);
        assert!(table.values().all(|r| r.has_missing_data && r.requests.len() == 2));
    }

    #[tokio::test]
    async fn test_fan_out_is_bounded() {
        let provider = Arc::new(StaticQuotaProvider::new().with_latency(Duration::from_millis(20)));
        let settings = AssessmentSettings {
            max_concurrent_probes: 2,
            ..Default::default()
        };
        let engine = AssessmentEngine::new(provider.clone(), settings);
        let requests = vec![request("gpt-4o", 10), request("o3", 10)];
        engine
            .assess(&requests, &regions(&["a", "b", "c", "d"]))
            .await;

        assert_eq!(provider.probe_count(), 8);
        assert!(provider.max_in_flight() <= 2);
        assert!(provider.max_in_flight() >= 1);
    }

    /// Provider answering whole regions at once, counting calls
    #[derive(Default)]
    struct RegionListing {
        region_calls: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl QuotaProvider for RegionListing {
        fn provider_id(&self) -> &'static str {
            "listing"
        }

        async fn observe(
            &self,
            _region: &str,
            _request: &ModelRequest,
        ) -> Result<Option<QuotaUsage>, QuotaError> {
            Err(QuotaError::Other("per-request lookup not expected".into()))
        }

        async fn observe_region(
            &self,
            region: &str,
            requests: &[ModelRequest],
        ) -> Vec<Result<Option<QuotaUsage>, QuotaError>> {
            self.region_calls.lock().unwrap().push(region.to_string());
            requests
                .iter()
                .map(|r| Ok(Some(QuotaUsage::new(1000, i64::from(r.capacity)))))
                .collect()
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_one_provider_call_per_region() {
        let provider = Arc::new(RegionListing::default());
        let requests = vec![request("gpt-4o", 10), request("o3", 90), request("o1", 20)];
        let table = AssessmentEngine::new(provider.clone(), AssessmentSettings::default())
            .assess(&requests, &regions(&["eastus", "westus3"]))
            .await;

        let mut calls = provider.region_calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["eastus", "westus3"]);

        let east = table.get("eastus").unwrap();
        assert_eq!(east.requests.len(), 3);
        assert_eq!(east.requests[1].request.model, "o3");
        assert_eq!(east.requests[1].observation.available(), Some(910));
        assert!(east.sufficient && east.recommended);
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let provider = Arc::new(StaticQuotaProvider::new().with_usage("eastus", "gpt-4o", "GlobalStandard", 100, 0));
        let settings = AssessmentSettings {
            recommended_threshold: 50,
            ..Default::default()
        };
        let assessed = AssessmentEngine::new(provider, settings)
            .assess_region(&[request("gpt-4o", 10)], "eastus")
            .await;
        assert!(assessed.sufficient);
        assert!(assessed.recommended);
    }
}
