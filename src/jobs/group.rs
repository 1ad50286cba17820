use super::JobRecord;
use std::collections::HashMap;

/// Cloud unit identifiers of the jobs sharing one comment, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobGroup {
    pub comment: String,
    pub cloud_uids: Vec<String>,
}

/// Clusters jobs by comment text.
///
/// Groups come back in the order their first job appears. Jobs with a missing
/// or empty comment are left out, so every returned group is non-empty.
pub fn group_by_comment(jobs: &[JobRecord]) -> Vec<JobGroup> {
    let mut groups: Vec<JobGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for job in jobs {
        let Some(comment) = job.group_key() else {
            continue;
        };

        let slot = *index.entry(comment).or_insert_with(|| {
            groups.push(JobGroup {
                comment: comment.to_owned(),
                cloud_uids: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].cloud_uids.push(job.cloud_uid.clone());
    }

    groups
}
