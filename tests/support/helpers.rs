use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use claimbatch::{
    BatchConfig, CredentialProvider, InMemorySessionStore, PortalClient, SessionTokenLocator,
};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use super::mock_portal::TEST_TOKEN;

pub const DISPATCH_HOST: &str = "editor.test";
pub const TARGET_HINT: &str = "api://portal";

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

/// Session storage as the portal page leaves it: unrelated keys, a token for
/// another audience, and the portal token.
pub fn session_store() -> InMemorySessionStore {
    InMemorySessionStore::new()
        .with_entry("a.theme", "dark")
        .with_entry(
            "b.graph-token",
            json!({
                "tokenType": "Bearer",
                "target": "https://graph.example/.default",
                "secret": "wrong-audience",
            })
            .to_string(),
        )
        .with_entry(
            "c.portal-token",
            json!({
                "tokenType": "Bearer",
                "target": format!("{TARGET_HINT}/user_impersonation"),
                "secret": TEST_TOKEN,
            })
            .to_string(),
        )
}

pub fn config(portal_url: &str) -> Result<BatchConfig> {
    BatchConfig::builder()
        .portal_url(portal_url)
        .dispatch_host(DISPATCH_HOST)
        .target_hint(TARGET_HINT)
        .request_timeout(Duration::from_secs(5))
        .dispatch_delay(Duration::from_millis(1))
        .build()
}

pub fn client(config: &BatchConfig) -> Result<Arc<PortalClient>> {
    let mut locator = SessionTokenLocator::new(session_store());
    if let Some(hint) = config.target_hint() {
        locator = locator.with_target_hint(hint);
    }
    client_with(config, Arc::new(locator))
}

pub fn client_with(
    config: &BatchConfig,
    credentials: Arc<dyn CredentialProvider>,
) -> Result<Arc<PortalClient>> {
    Ok(Arc::new(PortalClient::from_config(config, credentials)?))
}

pub fn claimed_job(
    asset_id: i64,
    cloud_uid: &str,
    comment: Option<&str>,
    quality: &str,
    words: u64,
) -> Value {
    json!({
        "assetPKID": asset_id,
        "cloudProjectUid": format!("project-{asset_id}"),
        "cloudUid": cloud_uid,
        "comment": comment,
        "qualityName": quality,
        "wordcount": words,
    })
}
