//! # regionfit-core
//!
//! Capacity-aware region selection for model deployments.
//!
//! This crate provides:
//! - Model requests and selection outcomes (`models` module)
//! - Quota providers, assessment, selection and reporting (`services` module)
//! - Configuration loading (`config` module)
//! - Unified error handling (`error` module)

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-export utils for convenience
pub use utils::{create_command, expand_path};

// Re-exports for convenience
pub use config::{ModelRequestEntry, RegionFitConfig};
pub use error::{Error, Result};
pub use models::{FailureReason, ModelRequest, SelectionOutcome};

// Re-export commonly used types from services
pub use services::{
    rank_pool, render_table, report_rows, AssessmentEngine, AssessmentSettings, AssessmentTable,
    AutoApprove, CliProviderSettings, CliQuotaProvider, EnvFileStore, EventLevel,
    FileQuotaProvider, Interaction, Observation, QuotaError, QuotaProvider, QuotaUsage,
    RegionAssessment, RejectReason, ReportRow, RequestAssessment, SelectionEvent,
    SelectionProcedure, StaticQuotaProvider,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}
