use super::{AssetId, JobRecord, ProgressRecord};
use std::collections::HashMap;

const COMPLETE_PERCENT: f64 = 100.0;

/// Which side of the completion split to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionFilter {
    /// Jobs whose progress is exactly 100.
    Complete,
    /// Everything else, including jobs without any progress record.
    Incomplete,
}

impl CompletionFilter {
    fn wants_complete(self) -> bool {
        matches!(self, CompletionFilter::Complete)
    }
}

impl From<bool> for CompletionFilter {
    fn from(want_complete: bool) -> Self {
        if want_complete {
            CompletionFilter::Complete
        } else {
            CompletionFilter::Incomplete
        }
    }
}

/// Keeps the jobs that fall on the requested side of the completion split,
/// preserving input order.
///
/// Completion is an exact comparison with 100. A job with no progress record,
/// or a record without a value, counts as incomplete. When the progress list
/// repeats an asset, the last record wins.
pub fn filter_by_progress(
    jobs: &[JobRecord],
    progress: &[ProgressRecord],
    filter: CompletionFilter,
) -> Vec<JobRecord> {
    let by_asset: HashMap<AssetId, Option<f64>> = progress
        .iter()
        .map(|record| (record.asset_id, record.progress))
        .collect();

    jobs.iter()
        .filter(|job| {
            let complete = matches!(
                by_asset.get(&job.asset_id),
                Some(Some(percent)) if *percent == COMPLETE_PERCENT
            );
            complete == filter.wants_complete()
        })
        .cloned()
        .collect()
}
