use super::JobGroup;

/// Editor URL opening every listed cloud unit at once.
///
/// `host` is a bare host name (no scheme). A single identifier yields a URL for
/// that job alone; several are joined with `-` in list order. An empty list has
/// no URL.
pub fn dispatch_url(host: &str, cloud_uids: &[String]) -> Option<String> {
    if cloud_uids.is_empty() {
        return None;
    }
    Some(format!(
        "https://{host}/web/job/{}/translate",
        cloud_uids.join("-")
    ))
}

/// One URL per group, in group order.
pub fn dispatch_urls(host: &str, groups: &[JobGroup]) -> Vec<String> {
    groups
        .iter()
        .filter_map(|group| dispatch_url(host, &group.cloud_uids))
        .collect()
}
