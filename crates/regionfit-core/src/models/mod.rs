//! Data models for regionfit
//!
//! Model requests are the caller's input to the engine; selection outcomes
//! are the only thing the selection procedure hands back.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};

// ============================================================================
// Model Request
// ============================================================================

/// One deployment the caller needs capacity for
///
/// Immutable once built. The constructors reject non-positive capacities,
/// so every `ModelRequest` in circulation has `capacity > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Deployment name (defaults to the model identifier)
    pub name: String,
    /// Model identifier, e.g. "gpt-4o"
    pub model: String,
    /// Deployment type / SKU, e.g. "GlobalStandard"
    pub deployment_type: String,
    /// Required capacity, in the quota's capacity units
    pub capacity: u32,
}

impl ModelRequest {
    /// Create a validated model request
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        deployment_type: impl Into<String>,
        capacity: i64,
    ) -> Result<Self> {
        let model = model.into().trim().to_string();
        let deployment_type = deployment_type.into().trim().to_string();
        let name = name.into().trim().to_string();

        if model.is_empty() {
            return Err(Error::validation("model identifier must not be empty"));
        }
        if deployment_type.is_empty() {
            return Err(Error::validation(format!(
                "deployment type for model '{}' must not be empty",
                model
            )));
        }
        if capacity <= 0 {
            return Err(Error::validation(format!(
                "required capacity for model '{}' must be positive, got {}",
                model, capacity
            )));
        }
        let capacity = u32::try_from(capacity).map_err(|_| {
            Error::validation(format!(
                "required capacity for model '{}' is too large: {}",
                model, capacity
            ))
        })?;

        Ok(Self {
            name: if name.is_empty() { model.clone() } else { name },
            model,
            deployment_type,
            capacity,
        })
    }

    /// Parse the CLI form `[name=]model:deployment_type:capacity`
    pub fn parse(raw: &str) -> Result<Self> {
        let (name, rest) = match raw.split_once('=') {
            Some((name, rest)) => (name.trim(), rest),
            None => ("", raw),
        };

        let mut parts = rest.rsplitn(3, ':');
        let capacity = parts.next();
        let deployment_type = parts.next();
        let model = parts.next();

        match (model, deployment_type, capacity) {
            (Some(model), Some(deployment_type), Some(capacity)) => {
                let capacity: i64 = capacity.trim().parse().map_err(|_| {
                    Error::validation(format!(
                        "invalid capacity '{}' in model request '{}'",
                        capacity, raw
                    ))
                })?;
                Self::new(name, model, deployment_type, capacity)
            }
            _ => Err(Error::validation(format!(
                "invalid model request '{}', expected [name=]model:deployment_type:capacity",
                raw
            ))),
        }
    }

    /// Build requests from parallel vectors
    ///
    /// `models`, `deployment_types` and `capacities` must have the same
    /// length; `names` may be empty (names default to the model) or match
    /// that length too.
    pub fn from_lists(
        names: &[String],
        models: &[String],
        deployment_types: &[String],
        capacities: &[i64],
    ) -> Result<Vec<Self>> {
        if models.is_empty() {
            return Err(Error::validation("no model requests given"));
        }
        if models.len() != deployment_types.len() || models.len() != capacities.len() {
            return Err(Error::validation(format!(
                "mismatched request lists: {} models, {} deployment types, {} capacities",
                models.len(),
                deployment_types.len(),
                capacities.len()
            )));
        }
        if !names.is_empty() && names.len() != models.len() {
            return Err(Error::validation(format!(
                "mismatched request lists: {} names for {} models",
                names.len(),
                models.len()
            )));
        }

        models
            .iter()
            .enumerate()
            .map(|(i, model)| {
                let name = names.get(i).map(String::as_str).unwrap_or("");
                Self::new(name, model.as_str(), deployment_types[i].as_str(), capacities[i])
            })
            .collect()
    }

    /// Short label used in logs and prompts
    pub fn label(&self) -> String {
        if self.name == self.model {
            format!("{} ({})", self.model, self.deployment_type)
        } else {
            format!("{}: {} ({})", self.name, self.model, self.deployment_type)
        }
    }
}

impl std::fmt::Display for ModelRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.model, self.deployment_type, self.capacity)
    }
}

// ============================================================================
// Selection Outcome
// ============================================================================

/// Why a selection run ended without a region
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The primary region could not be assessed at all
    #[error("quota data unavailable for primary region '{region}': {detail}")]
    PrimaryRegionDataUnavailable { region: String, detail: String },

    /// Neither the primary nor any fallback region has enough quota
    #[error("no region has sufficient quota for all requested models")]
    NoRegionMeetsCapacity,

    /// A prompt received no input
    #[error("selection aborted: no input received")]
    UserAborted,

    /// The model request list was rejected before probing
    #[error("invalid model request specification: {0}")]
    InvalidRequestSpecification(String),
}

impl FailureReason {
    /// Build an `InvalidRequestSpecification` from a validation error
    pub fn invalid_request(err: &Error) -> Self {
        match err {
            Error::Validation(msg) => FailureReason::InvalidRequestSpecification(msg.clone()),
            other => FailureReason::InvalidRequestSpecification(other.to_string()),
        }
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            FailureReason::PrimaryRegionDataUnavailable { .. } => 2,
            FailureReason::NoRegionMeetsCapacity => 3,
            FailureReason::UserAborted => 4,
            FailureReason::InvalidRequestSpecification(_) => 64,
        }
    }

    /// Stable identifier, used in JSON output
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::PrimaryRegionDataUnavailable { .. } => "primary_region_data_unavailable",
            FailureReason::NoRegionMeetsCapacity => "no_region_meets_capacity",
            FailureReason::UserAborted => "user_aborted",
            FailureReason::InvalidRequestSpecification(_) => "invalid_request_specification",
        }
    }
}

/// Terminal result of a selection run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Accepted(String),
    Failed(FailureReason),
}

impl SelectionOutcome {
    /// The accepted region, if any
    pub fn region(&self) -> Option<&str> {
        match self {
            SelectionOutcome::Accepted(region) => Some(region),
            SelectionOutcome::Failed(_) => None,
        }
    }

    /// Process exit code: 0 on acceptance
    pub fn exit_code(&self) -> i32 {
        match self {
            SelectionOutcome::Accepted(_) => 0,
            SelectionOutcome::Failed(reason) => reason.exit_code(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_name_to_model() {
        let req = ModelRequest::new("", "gpt-4o", "GlobalStandard", 50).unwrap();
        assert_eq!(req.name, "gpt-4o");
        assert_eq!(req.capacity, 50);
    }

    #[test]
    fn test_new_rejects_non_positive_capacity() {
        assert!(ModelRequest::new("chat", "gpt-4o", "GlobalStandard", 0).is_err());
        assert!(ModelRequest::new("chat", "gpt-4o", "GlobalStandard", -5).is_err());
    }

    #[test]
    fn test_parse_with_and_without_name() {
        let req = ModelRequest::parse("gpt-4o-mini:GlobalStandard:30").unwrap();
        assert_eq!(req.model, "gpt-4o-mini");
        assert_eq!(req.deployment_type, "GlobalStandard");
        assert_eq!(req.capacity, 30);

        let req = ModelRequest::parse("embed=text-embedding-3-small:Standard:80").unwrap();
        assert_eq!(req.name, "embed");
        assert_eq!(req.model, "text-embedding-3-small");
        assert_eq!(req.capacity, 80);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ModelRequest::parse("gpt-4o").is_err());
        assert!(ModelRequest::parse("gpt-4o:GlobalStandard").is_err());
        assert!(ModelRequest::parse("gpt-4o:GlobalStandard:lots").is_err());
    }

    #[test]
    fn test_from_lists_length_mismatch() {
        let models = vec!["gpt-4o".to_string(), "text-embedding-3-small".to_string()];
        let types = vec!["GlobalStandard".to_string()];
        let err = ModelRequest::from_lists(&[], &models, &types, &[10, 20]).unwrap_err();
        assert!(err.to_string().contains("mismatched"));
    }

    #[test]
    fn test_from_lists_builds_in_order() {
        let names = vec!["chat".to_string(), "embed".to_string()];
        let models = vec!["gpt-4o".to_string(), "text-embedding-3-small".to_string()];
        let types = vec!["GlobalStandard".to_string(), "Standard".to_string()];
        let reqs = ModelRequest::from_lists(&names, &models, &types, &[10, 20]).unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].name, "chat");
        assert_eq!(reqs[1].deployment_type, "Standard");
        assert_eq!(reqs[1].capacity, 20);
    }

    #[test]
    fn test_failure_exit_codes_are_distinct_and_non_zero() {
        let reasons = [
            FailureReason::PrimaryRegionDataUnavailable {
                region: "eastus".into(),
                detail: "no data".into(),
            },
            FailureReason::NoRegionMeetsCapacity,
            FailureReason::UserAborted,
            FailureReason::InvalidRequestSpecification("bad".into()),
        ];
        let mut codes: Vec<i32> = reasons.iter().map(|r| r.exit_code()).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), reasons.len());
    }

    #[test]
    fn test_outcome_exit_code() {
        assert_eq!(SelectionOutcome::Accepted("eastus".into()).exit_code(), 0);
        assert_eq!(
            SelectionOutcome::Failed(FailureReason::UserAborted).exit_code(),
            4
        );
    }
}
