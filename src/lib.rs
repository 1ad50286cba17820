pub mod api;
pub mod earnings;
pub mod jobs;
pub mod runtime;

pub use api::{
    CredentialProvider, FetchError, InMemorySessionStore, PortalApi, PortalClient,
    PortalClientOptions, RequestMetricsSnapshot, SessionCredential, SessionStore,
    SessionTokenLocator, StaticToken,
};
pub use earnings::{estimate, EarningsError, EarningsEstimate, QualityTier, QUALITY_TIERS};
pub use jobs::{
    dispatch_url, dispatch_urls, filter_by_progress, group_by_comment, AssetId, CompletionFilter,
    JobGroup, JobRecord, LicenseRenewal, ProgressRecord,
};
pub use runtime::config::{BatchConfig, BatchConfigBuilder, BatchConfigParams};
pub use runtime::dispatcher::{Dispatcher, StdoutOpener, UrlOpener};
pub use runtime::orchestrator::{BatchOrchestrator, BatchRun, RenewalStatus};
pub use runtime::telemetry::{init_tracing, log_request_metrics};
