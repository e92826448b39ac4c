//! Quota observation types
//!
//! Types for the numbers a provider reports for one region and model, and
//! for the usage listing shape shared by the CLI and fixture providers.

use serde::{Deserialize, Serialize};

use super::provider::QuotaError;
use crate::models::ModelRequest;

// ============================================================================
// Constants
// ============================================================================

/// Default minimum available quota for a region to count as recommended
pub const RECOMMENDED_THRESHOLD: i64 = 200;

/// Default template for the usage entry name a request maps to
pub const DEFAULT_USAGE_NAME_TEMPLATE: &str = "OpenAI.{deployment_type}.{model}";

// ============================================================================
// Usage Numbers
// ============================================================================

/// Limit and current usage for one region and model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Quota limit
    pub limit: i64,
    /// Quota currently consumed
    pub used: i64,
}

impl QuotaUsage {
    pub fn new(limit: i64, used: i64) -> Self {
        Self { limit, used }
    }

    /// Headroom left: `limit - used`, negative when usage exceeds the limit
    pub fn available(&self) -> i64 {
        self.limit.saturating_sub(self.used)
    }
}

// ============================================================================
// Observation
// ============================================================================

/// What a single probe produced
///
/// `Absent` and `Unreachable` both count as missing data. `Unreachable`
/// keeps the transport failure for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Observation {
    Present { limit: i64, used: i64 },
    Absent,
    Unreachable { reason: String },
}

impl Observation {
    /// Fold a provider result into an observation
    pub fn from_probe(result: Result<Option<QuotaUsage>, QuotaError>) -> Self {
        match result {
            Ok(Some(usage)) => Observation::Present {
                limit: usage.limit,
                used: usage.used,
            },
            Ok(None) => Observation::Absent,
            Err(e) => Observation::Unreachable {
                reason: e.to_string(),
            },
        }
    }

    pub fn usage(&self) -> Option<QuotaUsage> {
        match self {
            Observation::Present { limit, used } => Some(QuotaUsage::new(*limit, *used)),
            _ => None,
        }
    }

    pub fn available(&self) -> Option<i64> {
        self.usage().map(|u| u.available())
    }

    pub fn is_missing(&self) -> bool {
        !matches!(self, Observation::Present { .. })
    }

    /// Short human description, used by diagnostics
    pub fn describe(&self) -> String {
        match self {
            Observation::Present { limit, used } => format!(
                "limit={} used={} available={}",
                limit,
                used,
                limit.saturating_sub(*used)
            ),
            Observation::Absent => "no quota data".to_string(),
            Observation::Unreachable { reason } => format!("probe failed: {}", reason),
        }
    }
}

// ============================================================================
// Usage Listing
// ============================================================================

/// Name block of a usage entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageName {
    pub value: String,
    #[serde(rename = "localizedValue", default)]
    pub localized_value: Option<String>,
}

/// One entry of a region's usage listing, as the cloud CLI prints it
///
/// Numbers may come back as floats (`10.0`), so they are read as `f64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEntry {
    pub name: UsageName,
    #[serde(rename = "currentValue", default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub limit: Option<f64>,
}

/// Render the usage entry name for a request
pub fn usage_key(template: &str, request: &ModelRequest) -> String {
    template
        .replace("{deployment_type}", &request.deployment_type)
        .replace("{model}", &request.model)
        .replace("{name}", &request.name)
}

/// Parse a usage listing (JSON array of entries)
pub fn parse_usage_listing(json: &str) -> Result<Vec<UsageEntry>, QuotaError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(json)?)
}

/// Find the usage numbers for `key` in a listing
///
/// Entries without both numbers count as absent, and so do entries with a
/// negative, non-finite or out-of-range number. Fractional values are
/// truncated.
pub fn find_usage(entries: &[UsageEntry], key: &str) -> Option<QuotaUsage> {
    let entry = entries.iter().find(|e| e.name.value.eq_ignore_ascii_case(key))?;
    match (quota_number(entry.limit), quota_number(entry.current_value)) {
        (Some(limit), Some(used)) => Some(QuotaUsage::new(limit, used)),
        _ => {
            log::warn!(
                "[quota] Ignoring usage entry {} with invalid numbers (limit={:?}, currentValue={:?})",
                entry.name.value,
                entry.limit,
                entry.current_value
            );
            None
        }
    }
}

/// A listing number as a non-negative integer
fn quota_number(value: Option<f64>) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which itself does not fit
    const UPPER: f64 = 9_223_372_036_854_775_808.0;
    match value {
        Some(v) if v.is_finite() && v >= 0.0 && v < UPPER => Some(v.trunc() as i64),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gpt4o(capacity: i64) -> ModelRequest {
        ModelRequest::new("", "gpt-4o", "GlobalStandard", capacity).unwrap()
    }

    #[test]
    fn test_available_arithmetic() {
        assert_eq!(QuotaUsage::new(100, 95).available(), 5);
        assert_eq!(QuotaUsage::new(0, 0).available(), 0);
        assert_eq!(QuotaUsage::new(50, 80).available(), -30);
    }

    #[test]
    fn test_usage_key_template() {
        assert_eq!(
            usage_key(DEFAULT_USAGE_NAME_TEMPLATE, &gpt4o(10)),
            "OpenAI.GlobalStandard.gpt-4o"
        );
        assert_eq!(usage_key("{model}/{name}", &gpt4o(10)), "gpt-4o/gpt-4o");
    }

    #[test]
    fn test_parse_listing_and_find() {
        let json = r#"[
            {"name": {"value": "OpenAI.GlobalStandard.gpt-4o", "localizedValue": "GPT-4o"},
             "currentValue": 95.0, "limit": 100.0, "unit": "Count"},
            {"name": {"value": "OpenAI.Standard.text-embedding-3-small"},
             "currentValue": 10, "limit": 350}
        ]"#;
        let entries = parse_usage_listing(json).unwrap();
        assert_eq!(entries.len(), 2);

        let usage = find_usage(&entries, "OpenAI.GlobalStandard.gpt-4o").unwrap();
        assert_eq!(usage, QuotaUsage::new(100, 95));

        let usage = find_usage(&entries, "openai.standard.text-embedding-3-small").unwrap();
        assert_eq!(usage.available(), 340);

        assert!(find_usage(&entries, "OpenAI.GlobalStandard.o3").is_none());
    }

    #[test]
    fn test_entry_without_numbers_is_absent() {
        let json = r#"[{"name": {"value": "OpenAI.GlobalStandard.gpt-4o"}}]"#;
        let entries = parse_usage_listing(json).unwrap();
        assert!(find_usage(&entries, "OpenAI.GlobalStandard.gpt-4o").is_none());
    }

    #[test]
    fn test_out_of_range_numbers_are_absent() {
        let json = r#"[
            {"name": {"value": "negative-limit"}, "currentValue": 5, "limit": -1e19},
            {"name": {"value": "negative-used"}, "currentValue": -1, "limit": 100},
            {"name": {"value": "huge-used"}, "currentValue": 1e30, "limit": 100},
            {"name": {"value": "ok"}, "currentValue": 0, "limit": 9.2e18}
        ]"#;
        let entries = parse_usage_listing(json).unwrap();
        assert!(find_usage(&entries, "negative-limit").is_none());
        assert!(find_usage(&entries, "negative-used").is_none());
        assert!(find_usage(&entries, "huge-used").is_none());
        assert_eq!(
            find_usage(&entries, "ok").map(|u| u.available()),
            Some(9_200_000_000_000_000_000)
        );
    }

    #[test]
    fn test_available_saturates() {
        assert_eq!(QuotaUsage::new(i64::MIN, 5).available(), i64::MIN);
        assert_eq!(QuotaUsage::new(i64::MAX, -5).available(), i64::MAX);
        let observation = Observation::Present { limit: i64::MIN, used: 5 };
        assert!(observation.describe().contains("available=-9223372036854775808"));
    }

    #[test]
    fn test_empty_listing() {
        assert!(parse_usage_listing("  ").unwrap().is_empty());
        assert!(parse_usage_listing("not json").is_err());
    }

    #[test]
    fn test_observation_from_probe() {
        let present = Observation::from_probe(Ok(Some(QuotaUsage::new(10, 4))));
        assert_eq!(present.available(), Some(6));
        assert!(!present.is_missing());

        let absent = Observation::from_probe(Ok(None));
        assert!(absent.is_missing());
        assert_eq!(absent.available(), None);

        let failed = Observation::from_probe(Err(QuotaError::Timeout(5)));
        assert!(failed.is_missing());
        assert!(failed.describe().contains("timed out"));
    }
}
