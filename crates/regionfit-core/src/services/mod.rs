//! Services module

pub mod assessment;
pub mod env_store;
pub mod quota;
pub mod report;
pub mod selection;

pub use assessment::{
    AssessmentEngine, AssessmentSettings, AssessmentTable, RegionAssessment, RequestAssessment,
    DEFAULT_MAX_CONCURRENT_PROBES,
};
pub use env_store::{EnvFileStore, DEFAULT_ENV_KEY};
pub use quota::{
    CliProviderSettings, CliQuotaProvider, FileQuotaProvider, Observation, QuotaError,
    QuotaProvider, QuotaUsage, StaticQuotaProvider, RECOMMENDED_THRESHOLD,
};
pub use report::{render_table, rows as report_rows, ReportRow};
pub use selection::{
    rank_pool, AutoApprove, EventLevel, Interaction, RejectReason, SelectionEvent,
    SelectionProcedure,
};
