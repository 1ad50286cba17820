//! Batch orchestration: fetch claimed jobs and their progress, keep the
//! incomplete ones, group them by comment, renew their licenses, and emit one
//! dispatch URL per group.
//!
//! Steps run strictly in sequence because each needs the previous step's
//! output. A failed job listing or progress fetch aborts the run before any
//! renewal or dispatch; a failed renewal is logged and folded into the result.

use crate::api::client::{FetchError, PortalApi};
use crate::jobs::{
    asset_ids_csv, dispatch_urls, filter_by_progress, group_by_comment, AssetId,
    CompletionFilter, JobGroup, JobRecord, ProgressRecord,
};
use crate::runtime::config::BatchConfig;
use std::sync::Arc;

/// Outcome of the best-effort license renewal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalStatus {
    Renewed { count: usize },
    /// Nothing to renew, or the run aborted before this step.
    Skipped,
    Failed(FetchError),
}

/// Everything one orchestration run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRun {
    /// One editor URL per group, in group-creation order.
    pub urls: Vec<String>,
    pub groups: Vec<JobGroup>,
    pub claimed: usize,
    pub incomplete: usize,
    pub renewal: RenewalStatus,
    /// Set when the job listing or progress fetch failed; no renewal or
    /// dispatch happened.
    pub aborted: Option<FetchError>,
}

impl BatchRun {
    fn empty(claimed: usize) -> Self {
        Self {
            urls: Vec::new(),
            groups: Vec::new(),
            claimed,
            incomplete: 0,
            renewal: RenewalStatus::Skipped,
            aborted: None,
        }
    }

    fn aborted(error: FetchError, claimed: usize) -> Self {
        Self {
            aborted: Some(error),
            ..Self::empty(claimed)
        }
    }
}

pub struct BatchOrchestrator {
    api: Arc<dyn PortalApi>,
    dispatch_host: String,
}

impl BatchOrchestrator {
    pub fn new(api: Arc<dyn PortalApi>, dispatch_host: impl Into<String>) -> Self {
        Self {
            api,
            dispatch_host: dispatch_host.into(),
        }
    }

    pub fn from_config(api: Arc<dyn PortalApi>, config: &BatchConfig) -> Self {
        Self::new(api, config.dispatch_host())
    }

    pub async fn run(&self) -> BatchRun {
        let jobs = match self.api.claimed_jobs().await {
            Ok(jobs) => jobs,
            Err(err) => {
                tracing::error!(error = %err, "claimed jobs unavailable; aborting batch run");
                return BatchRun::aborted(err, 0);
            }
        };

        if jobs.is_empty() {
            tracing::info!("no claimed jobs; nothing to dispatch");
            return BatchRun::empty(0);
        }

        let progress = match self.api.progress(&asset_ids_csv(&jobs)).await {
            Ok(progress) => progress,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    jobs = jobs.len(),
                    "progress unavailable; aborting before renewal and dispatch"
                );
                return BatchRun::aborted(err, jobs.len());
            }
        };

        let incomplete = filter_by_progress(&jobs, &progress, CompletionFilter::Incomplete);
        let groups = group_by_comment(&incomplete);
        let renewal = self.renew(&incomplete).await;
        let urls = dispatch_urls(&self.dispatch_host, &groups);

        tracing::info!(
            claimed = jobs.len(),
            incomplete = incomplete.len(),
            groups = groups.len(),
            urls = urls.len(),
            "batch run prepared dispatch list"
        );

        BatchRun {
            urls,
            groups,
            claimed: jobs.len(),
            incomplete: incomplete.len(),
            renewal,
            aborted: None,
        }
    }

    /// Asset identifiers of claimed jobs whose progress is exactly 100.
    ///
    /// Any fetch failure yields an empty selection.
    pub async fn select_completed(&self) -> Vec<AssetId> {
        let (jobs, progress) = match self.load_jobs_with_progress().await {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::error!(error = %err, "job data unavailable; nothing selected");
                return Vec::new();
            }
        };

        let selected: Vec<AssetId> =
            filter_by_progress(&jobs, &progress, CompletionFilter::Complete)
                .iter()
                .map(|job| job.asset_id)
                .collect();
        tracing::info!(
            claimed = jobs.len(),
            selected = selected.len(),
            "selected completed jobs"
        );
        selected
    }

    async fn load_jobs_with_progress(
        &self,
    ) -> Result<(Vec<JobRecord>, Vec<ProgressRecord>), FetchError> {
        let jobs = self.api.claimed_jobs().await?;
        if jobs.is_empty() {
            return Ok((jobs, Vec::new()));
        }

        let progress = self.api.progress(&asset_ids_csv(&jobs)).await?;
        Ok((jobs, progress))
    }

    async fn renew(&self, jobs: &[JobRecord]) -> RenewalStatus {
        if jobs.is_empty() {
            return RenewalStatus::Skipped;
        }

        match self.api.renew_licenses(jobs).await {
            Ok(()) => RenewalStatus::Renewed { count: jobs.len() },
            Err(err) => {
                tracing::warn!(error = %err, jobs = jobs.len(), "license renewal failed");
                RenewalStatus::Failed(err)
            }
        }
    }
}
