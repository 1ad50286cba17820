//! Portal client implementation and the `PortalApi` abstraction consumed by
//! the orchestrator and the earnings aggregator.
//!
//! Every call makes exactly one attempt. The bearer token is resolved from the
//! configured [`CredentialProvider`] per request; when none is available the
//! call fails with [`FetchError::NoToken`] before any network I/O.

use crate::api::auth::build_auth_headers;
use crate::api::credentials::CredentialProvider;
use crate::api::metrics::{RequestMetrics, RequestMetricsSnapshot};
use crate::api::options::PortalClientOptions;
use crate::earnings::MeteredVolume;
use crate::jobs::{JobRecord, LicenseRenewal, ProgressRecord};
use crate::runtime::config::BatchConfig;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

pub const CLAIMED_JOBS_PATH: &str = "/api/asset/claimed";
pub const PROGRESS_PATH: &str = "/api/v2.0/AssetAdditionalData";
pub const RENEW_LICENSE_PATH: &str = "/api/asset/RenewLicense";
pub const METRIC_VOLUME_PATH: &str = "/api/v2/Metric/Volume";

const PROGRESS_DATA_TYPE: u32 = 2;
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    NoToken,
    Http { path: String, status: u16 },
    Network { path: String, message: String },
    Parse { path: String, message: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NoToken => write!(f, "no bearer token available in session state"),
            FetchError::Http { path, status } => {
                write!(f, "request to {path} failed with HTTP status {status}")
            }
            FetchError::Network { path, message } => {
                write!(f, "request to {path} failed: {message}")
            }
            FetchError::Parse { path, message } => {
                write!(f, "response from {path} is not valid JSON: {message}")
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// Portal operations the pipeline depends on.
pub trait PortalApi: Send + Sync {
    fn claimed_jobs(&self) -> BoxFuture<'_, Result<Vec<JobRecord>, FetchError>>;

    fn progress<'a>(
        &'a self,
        asset_ids_csv: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ProgressRecord>, FetchError>>;

    fn renew_licenses<'a>(&'a self, jobs: &'a [JobRecord]) -> BoxFuture<'a, Result<(), FetchError>>;

    fn metered_volume<'a>(
        &'a self,
        from: NaiveDate,
        to: NaiveDate,
        quality_level: &'a str,
    ) -> BoxFuture<'a, Result<MeteredVolume, FetchError>>;
}

#[derive(Clone)]
pub struct PortalClient {
    base_url: Arc<String>,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    options: PortalClientOptions,
    metrics: Arc<RequestMetrics>,
}

impl fmt::Debug for PortalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalClient")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PortalApi for PortalClient {
    fn claimed_jobs(&self) -> BoxFuture<'_, Result<Vec<JobRecord>, FetchError>> {
        Box::pin(self.claimed_jobs())
    }

    fn progress<'a>(
        &'a self,
        asset_ids_csv: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ProgressRecord>, FetchError>> {
        Box::pin(self.progress(asset_ids_csv))
    }

    fn renew_licenses<'a>(&'a self, jobs: &'a [JobRecord]) -> BoxFuture<'a, Result<(), FetchError>> {
        Box::pin(self.renew_licenses(jobs))
    }

    fn metered_volume<'a>(
        &'a self,
        from: NaiveDate,
        to: NaiveDate,
        quality_level: &'a str,
    ) -> BoxFuture<'a, Result<MeteredVolume, FetchError>> {
        Box::pin(self.metered_volume(from, to, quality_level))
    }
}

impl PortalClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        Self::with_options(base_url, credentials, PortalClientOptions::default())
    }

    pub fn with_options(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        options: PortalClientOptions,
    ) -> Result<Self> {
        options.validate()?;

        let base_url = base_url.into().trim().trim_end_matches('/').to_owned();
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|err| anyhow!("failed to build portal HTTP client: {err}"))?;

        Ok(Self {
            base_url: Arc::new(base_url),
            http,
            credentials,
            options,
            metrics: Arc::new(RequestMetrics::default()),
        })
    }

    pub fn from_config(
        config: &BatchConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let options = PortalClientOptions {
            request_timeout: config.request_timeout(),
            ..PortalClientOptions::default()
        };
        Self::with_options(config.portal_url().to_owned(), credentials, options)
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    pub fn metrics(&self) -> RequestMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Issues one authorized request and parses the response body as JSON.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, FetchError> {
        self.request_as(method, path, body).await
    }

    pub async fn claimed_jobs(&self) -> Result<Vec<JobRecord>, FetchError> {
        let jobs: Vec<JobRecord> = self.request_as(Method::GET, CLAIMED_JOBS_PATH, None).await?;
        tracing::debug!(count = jobs.len(), "fetched claimed jobs");
        Ok(jobs)
    }

    pub async fn progress(&self, asset_ids_csv: &str) -> Result<Vec<ProgressRecord>, FetchError> {
        let path = progress_path(asset_ids_csv);
        let records: Vec<ProgressRecord> = self.request_as(Method::GET, &path, None).await?;
        tracing::debug!(count = records.len(), "fetched job progress");
        Ok(records)
    }

    /// Renews editor licenses for `jobs`. The response body is not inspected.
    pub async fn renew_licenses(&self, jobs: &[JobRecord]) -> Result<(), FetchError> {
        let renewals: Vec<LicenseRenewal> = jobs.iter().map(LicenseRenewal::from).collect();
        let body = serde_json::to_value(&renewals).map_err(|err| FetchError::Parse {
            path: RENEW_LICENSE_PATH.to_owned(),
            message: err.to_string(),
        })?;
        self.send(Method::POST, RENEW_LICENSE_PATH, Some(&body)).await?;
        tracing::debug!(count = renewals.len(), "renewed job licenses");
        Ok(())
    }

    pub async fn metered_volume(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        quality_level: &str,
    ) -> Result<MeteredVolume, FetchError> {
        let path = metered_volume_path(from, to, quality_level);
        self.request_as(Method::GET, &path, None).await
    }

    async fn request_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, FetchError> {
        let bytes = self.send(method, path, body).await?;
        serde_json::from_slice(&bytes).map_err(|err| {
            let error = FetchError::Parse {
                path: path.to_owned(),
                message: err.to_string(),
            };
            tracing::warn!(path, error = %error, "portal response could not be decoded");
            error
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Bytes, FetchError> {
        let Some(token) = self.credentials.bearer_token() else {
            self.metrics.record_missing_token();
            tracing::warn!(path, "skipping portal request: no bearer token");
            return Err(FetchError::NoToken);
        };

        let headers = build_auth_headers(&token).map_err(|err| {
            self.metrics.record_missing_token();
            tracing::warn!(path, error = %err, "bearer token is not usable as a header");
            FetchError::NoToken
        })?;

        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let start = Instant::now();
        let outcome = self.execute(builder, path).await;
        match &outcome {
            Ok(bytes) => {
                self.metrics.record_success(start.elapsed());
                tracing::debug!(%method, path, bytes = bytes.len(), "portal request completed");
            }
            Err(error) => {
                self.metrics.record_failure(start.elapsed());
                tracing::warn!(%method, path, error = %error, "portal request failed");
            }
        }
        outcome
    }

    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<Bytes, FetchError> {
        let network = |err: reqwest::Error| FetchError::Network {
            path: path.to_owned(),
            message: err.to_string(),
        };

        let response = builder.send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                path: path.to_owned(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(network)
    }
}

pub(crate) fn progress_path(asset_ids_csv: &str) -> String {
    format!("{PROGRESS_PATH}?type={PROGRESS_DATA_TYPE}&assetPkIds={asset_ids_csv}")
}

pub(crate) fn metered_volume_path(from: NaiveDate, to: NaiveDate, quality_level: &str) -> String {
    format!(
        "{METRIC_VOLUME_PATH}?from={}&to={}&qualityLevel[0]={quality_level}",
        from.format(DATE_FORMAT),
        to.format(DATE_FORMAT)
    )
}
