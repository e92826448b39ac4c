//! Quota provider trait and error types
//!
//! Defines the interface that quota providers must implement.

use async_trait::async_trait;
use thiserror::Error;

use super::types::QuotaUsage;
use crate::models::ModelRequest;

// ============================================================================
// Error Types
// ============================================================================

/// Transport-level failures while probing quota
///
/// "No data" is not an error: providers return `Ok(None)` for that.
#[derive(Error, Debug, Clone)]
pub enum QuotaError {
    /// Provider tooling is not installed or not on PATH
    #[error("Provider not installed: {0}")]
    NotInstalled(String),

    /// Authentication failed or the session has expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The management API returned an error
    #[error("API error: {0}")]
    ApiError(String),

    /// Failed to parse the provider's response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The provider command exited unsuccessfully
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The probe did not finish in time (seconds)
    #[error("Probe timed out after {0}s")]
    Timeout(u64),

    /// I/O error (e.g., reading a fixture file)
    #[error("IO error: {0}")]
    IoError(String),

    /// General/unknown error
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for QuotaError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            QuotaError::NotInstalled(err.to_string())
        } else {
            QuotaError::IoError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for QuotaError {
    fn from(err: serde_json::Error) -> Self {
        QuotaError::ParseError(err.to_string())
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Trait for quota data providers
///
/// Implement this trait to read quota from a new source. A provider:
/// 1. Looks up limit and usage for one model request in one region
/// 2. Returns `Ok(None)` when the source has no entry for it
/// 3. Returns `Err` only for transport problems (auth, network, timeouts)
///
/// Providers must bound their own calls in time. A probe that hangs stalls
/// the assessment that issued it.
///
/// # Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
/// use regionfit_core::services::quota::{QuotaError, QuotaProvider, QuotaUsage};
/// use regionfit_core::ModelRequest;
///
/// struct Unlimited;
///
/// #[async_trait]
/// impl QuotaProvider for Unlimited {
///     fn provider_id(&self) -> &'static str {
///         "unlimited"
///     }
///
///     async fn observe(
///         &self,
///         _region: &str,
///         _request: &ModelRequest,
///     ) -> Result<Option<QuotaUsage>, QuotaError> {
///         Ok(Some(QuotaUsage::new(i64::MAX, 0)))
///     }
///
///     async fn is_available(&self) -> bool {
///         true
///     }
/// }
/// ```
#[async_trait]
pub trait QuotaProvider: Send + Sync {
    /// Unique identifier for this provider, e.g. "cli" or "file"
    fn provider_id(&self) -> &'static str;

    /// Human-readable display name for this provider
    ///
    /// Defaults to the provider_id if not overridden.
    fn display_name(&self) -> &'static str {
        self.provider_id()
    }

    /// Look up quota for one model request in one region
    ///
    /// # Errors
    ///
    /// Returns `QuotaError` if the source cannot be reached or read. A
    /// missing entry is `Ok(None)`, not an error.
    async fn observe(
        &self,
        region: &str,
        request: &ModelRequest,
    ) -> Result<Option<QuotaUsage>, QuotaError>;

    /// Look up quota for every request in one region
    ///
    /// Returns one result per request, in request order. The default calls
    /// [`observe`](Self::observe) for each request in turn. Providers that
    /// fetch a whole region listing at once override this so the listing is
    /// fetched a single time.
    async fn observe_region(
        &self,
        region: &str,
        requests: &[ModelRequest],
    ) -> Vec<Result<Option<QuotaUsage>, QuotaError>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.observe(region, request).await);
        }
        results
    }

    /// Check if this provider can be used at all
    ///
    /// A quick local check; it should not probe any region.
    async fn is_available(&self) -> bool;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let quota_err: QuotaError = io_err.into();
        assert!(matches!(quota_err, QuotaError::IoError(_)));
        assert!(quota_err.to_string().contains("denied"));
    }

    #[test]
    fn test_quota_error_from_missing_program() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "az: not found");
        let quota_err: QuotaError = io_err.into();
        assert!(matches!(quota_err, QuotaError::NotInstalled(_)));
    }

    #[test]
    fn test_quota_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let quota_err: QuotaError = json_err.into();
        assert!(matches!(quota_err, QuotaError::ParseError(_)));
    }

    #[test]
    fn test_quota_error_display() {
        assert_eq!(
            QuotaError::NotInstalled("az".to_string()).to_string(),
            "Provider not installed: az"
        );
        assert_eq!(
            QuotaError::Unauthorized("run 'az login'".to_string()).to_string(),
            "Unauthorized: run 'az login'"
        );
        assert_eq!(QuotaError::Timeout(30).to_string(), "Probe timed out after 30s");
    }
}
