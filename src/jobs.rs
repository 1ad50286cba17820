//! Job dataset: claimed-job and progress records as returned by the portal,
//! plus the pure partitioning logic (progress filter, comment grouping, and
//! dispatch URL construction) applied to them.

pub mod dispatch;
pub mod filter;
pub mod group;

use serde::{Deserialize, Deserializer, Serialize};

pub use dispatch::{dispatch_url, dispatch_urls};
pub use filter::{filter_by_progress, CompletionFilter};
pub use group::{group_by_comment, JobGroup};

/// Portal asset identifier shared by claimed jobs and progress records.
pub type AssetId = i64;

/// One claimed job, as listed by `/api/asset/claimed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "assetPKID")]
    pub asset_id: AssetId,
    #[serde(rename = "cloudProjectUid", default, deserialize_with = "string_or_empty")]
    pub cloud_project_uid: String,
    #[serde(rename = "cloudUid", default, deserialize_with = "string_or_empty")]
    pub cloud_uid: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(rename = "qualityName", default)]
    pub quality_name: Option<String>,
    #[serde(rename = "wordcount", default, deserialize_with = "number_or_zero")]
    pub word_count: f64,
}

impl JobRecord {
    /// Comment text, if present and non-empty.
    pub fn group_key(&self) -> Option<&str> {
        self.comment.as_deref().filter(|comment| !comment.is_empty())
    }
}

/// Completion percentage for one asset, as listed by `AssetAdditionalData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(rename = "assetPkId")]
    pub asset_id: AssetId,
    #[serde(default)]
    pub progress: Option<f64>,
}

/// Request item for `/api/asset/RenewLicense`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRenewal {
    #[serde(rename = "AssetPKID")]
    pub asset_id: AssetId,
    #[serde(rename = "CloudProjectId")]
    pub cloud_project_id: String,
    #[serde(rename = "CloudUid")]
    pub cloud_uid: String,
}

impl From<&JobRecord> for LicenseRenewal {
    fn from(job: &JobRecord) -> Self {
        Self {
            asset_id: job.asset_id,
            cloud_project_id: job.cloud_project_uid.clone(),
            cloud_uid: job.cloud_uid.clone(),
        }
    }
}

/// Comma-joined asset identifiers in job order, as the progress endpoint expects.
pub fn asset_ids_csv(jobs: &[JobRecord]) -> String {
    jobs.iter()
        .map(|job| job.asset_id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
