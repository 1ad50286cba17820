use anyhow::{bail, Context, Result};
use std::time::Duration;

pub const DEFAULT_DISPATCH_HOST: &str = "cloud.memsource.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DISPATCH_DELAY_MS: u64 = 100;

/// Runtime configuration for a batch run.
///
/// All instances must be constructed via [`BatchConfig::builder`] or [`BatchConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    portal_url: String,
    dispatch_host: String,
    target_hint: Option<String>,
    request_timeout: Duration,
    dispatch_delay: Duration,
}

pub struct BatchConfigParams {
    pub portal_url: String,
    pub dispatch_host: String,
    pub target_hint: Option<String>,
    pub request_timeout: Duration,
    pub dispatch_delay: Duration,
}

impl BatchConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    pub fn new(params: BatchConfigParams) -> Result<Self> {
        let BatchConfigParams {
            portal_url,
            dispatch_host,
            target_hint,
            request_timeout,
            dispatch_delay,
        } = params;

        let config = Self {
            portal_url: trimmed_string(portal_url),
            dispatch_host: trimmed_string(dispatch_host),
            target_hint: target_hint
                .map(trimmed_string)
                .filter(|hint| !hint.is_empty()),
            request_timeout,
            dispatch_delay,
        };

        config.validate()?;
        Ok(config)
    }

    /// Portal origin (scheme and host) that API paths are appended to.
    pub fn portal_url(&self) -> &str {
        &self.portal_url
    }

    /// Host of the editor that dispatch URLs point at.
    pub fn dispatch_host(&self) -> &str {
        &self.dispatch_host
    }

    /// Audience substring used to pick the bearer token out of session state.
    pub fn target_hint(&self) -> Option<&str> {
        self.target_hint.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Spacing between successive dispatched URLs.
    pub fn dispatch_delay(&self) -> Duration {
        self.dispatch_delay
    }

    pub fn validate(&self) -> Result<()> {
        validate_url(&self.portal_url)?;
        ensure_not_empty(&self.dispatch_host, "dispatch_host")?;

        if self.dispatch_host.contains("://") || self.dispatch_host.contains('/') {
            bail!("dispatch_host must be a bare host name without scheme or path");
        }

        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }

        if self.dispatch_delay.is_zero() {
            bail!("dispatch_delay must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct BatchConfigBuilder {
    portal_url: Option<String>,
    dispatch_host: Option<String>,
    target_hint: Option<String>,
    request_timeout: Option<Duration>,
    dispatch_delay: Option<Duration>,
}

impl BatchConfigBuilder {
    pub fn portal_url(mut self, url: impl Into<String>) -> Self {
        self.portal_url = Some(url.into());
        self
    }

    pub fn dispatch_host(mut self, host: impl Into<String>) -> Self {
        self.dispatch_host = Some(host.into());
        self
    }

    pub fn target_hint(mut self, hint: impl Into<String>) -> Self {
        self.target_hint = Some(hint.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn dispatch_delay(mut self, delay: Duration) -> Self {
        self.dispatch_delay = Some(delay);
        self
    }

    pub fn build(self) -> Result<BatchConfig> {
        let params = BatchConfigParams {
            portal_url: self.portal_url.context("portal_url is required")?,
            dispatch_host: self
                .dispatch_host
                .unwrap_or_else(|| DEFAULT_DISPATCH_HOST.to_owned()),
            target_hint: self.target_hint,
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            dispatch_delay: self
                .dispatch_delay
                .unwrap_or_else(|| Duration::from_millis(DEFAULT_DISPATCH_DELAY_MS)),
        };

        BatchConfig::new(params)
    }
}

fn trimmed_string(value: String) -> String {
    value.trim().to_owned()
}

fn ensure_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("portal_url must start with http:// or https://");
    }
    Ok(())
}
