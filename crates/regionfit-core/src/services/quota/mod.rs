//! Quota data providers
//!
//! Everything the engine knows about quota comes through one trait.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ AssessmentEngine (services::assessment)                 │
//! │   - assess() / assess_region()                          │
//! └─────────────────────────────────────────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │ trait QuotaProvider                                     │
//! │   - observe(region, request) -> Option<QuotaUsage>      │
//! │   - is_available() -> bool                              │
//! └─────────────────────────────────────────────────────────┘
//!          │
//!     ┌────┼──────────┐
//!     ▼    ▼          ▼
//! ┌─────┐ ┌──────┐ ┌────────┐
//! │ CLI │ │ File │ │ Static │
//! └─────┘ └──────┘ └────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use regionfit_core::services::quota::{CliProviderSettings, CliQuotaProvider, QuotaProvider};
//!
//! let provider = CliQuotaProvider::new(CliProviderSettings::default());
//! if provider.is_available().await {
//!     match provider.observe("swedencentral", &request).await? {
//!         Some(usage) => println!("available: {}", usage.available()),
//!         None => println!("no quota data"),
//!     }
//! }
//! ```

pub mod types;
pub mod provider;
pub mod cli;
pub mod file;
pub mod memory;

// Re-export main types
pub use types::{
    find_usage,
    parse_usage_listing,
    usage_key,
    Observation,
    QuotaUsage,
    UsageEntry,
    UsageName,
    DEFAULT_USAGE_NAME_TEMPLATE,
    RECOMMENDED_THRESHOLD,
};

// Re-export provider trait and error
pub use provider::{QuotaProvider, QuotaError};

// Re-export providers
pub use cli::{CliProviderSettings, CliQuotaProvider};
pub use file::FileQuotaProvider;
pub use memory::StaticQuotaProvider;
