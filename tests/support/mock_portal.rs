use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const TEST_TOKEN: &str = "test-bearer-secret";

/// Scripted portal state shared between the test and the mock server.
#[derive(Clone)]
pub struct MockPortal {
    inner: Arc<RwLock<PortalInner>>,
}

struct PortalInner {
    token: String,
    claimed: Option<Value>,
    progress: Option<Value>,
    renew_status: StatusCode,
    volumes: HashMap<String, Option<f64>>,
    renewals: Vec<Value>,
    progress_queries: Vec<HashMap<String, String>>,
    volume_queries: Vec<HashMap<String, String>>,
    unauthorized: usize,
}

impl MockPortal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(PortalInner {
                token: TEST_TOKEN.to_owned(),
                claimed: Some(json!([])),
                progress: Some(json!([])),
                renew_status: StatusCode::OK,
                volumes: HashMap::new(),
                renewals: Vec::new(),
                progress_queries: Vec::new(),
                volume_queries: Vec::new(),
                unauthorized: 0,
            })),
        }
    }

    pub fn with_claimed(self, jobs: Value) -> Self {
        self.write().claimed = Some(jobs);
        self
    }

    /// Makes the claimed-jobs endpoint answer 500.
    pub fn failing_claimed(self) -> Self {
        self.write().claimed = None;
        self
    }

    pub fn with_progress(self, progress: Value) -> Self {
        self.write().progress = Some(progress);
        self
    }

    pub fn failing_progress(self) -> Self {
        self.write().progress = None;
        self
    }

    pub fn with_renew_status(self, status: StatusCode) -> Self {
        self.write().renew_status = status;
        self
    }

    pub fn with_volume(self, quality_level: &str, processed_words: f64) -> Self {
        self.write()
            .volumes
            .insert(quality_level.to_owned(), Some(processed_words));
        self
    }

    /// Makes the metering endpoint answer 503 for one quality level.
    pub fn failing_volume(self, quality_level: &str) -> Self {
        self.write().volumes.insert(quality_level.to_owned(), None);
        self
    }

    pub fn renewals(&self) -> Vec<Value> {
        self.read().renewals.clone()
    }

    pub fn progress_queries(&self) -> Vec<HashMap<String, String>> {
        self.read().progress_queries.clone()
    }

    pub fn volume_queries(&self) -> Vec<HashMap<String, String>> {
        self.read().volume_queries.clone()
    }

    pub fn unauthorized(&self) -> usize {
        self.read().unauthorized
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PortalInner> {
        self.inner.read().expect("mock portal poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PortalInner> {
        self.inner.write().expect("mock portal poisoned")
    }
}

pub struct MockPortalServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockPortalServer {
    pub async fn start(portal: MockPortal) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock portal listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let portal = portal.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| serve_request(portal.clone(), req)))
            }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock portal server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(
    portal: MockPortal,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let expected = format!("Bearer {}", portal.read().token);
    let authorized = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        portal.write().unauthorized += 1;
        return Ok(status_response(StatusCode::UNAUTHORIZED, "missing bearer token"));
    }

    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let query = parse_query(req.uri().query().unwrap_or_default());

    let bytes = match body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return Ok(status_response(
                StatusCode::BAD_REQUEST,
                format!("failed to read body: {err}"),
            ))
        }
    };

    let response = match (method, path.as_str()) {
        (Method::GET, "/api/asset/claimed") => match portal.read().claimed.clone() {
            Some(jobs) => json_response(jobs),
            None => status_response(StatusCode::INTERNAL_SERVER_ERROR, "claimed listing failed"),
        },
        (Method::GET, "/api/v2.0/AssetAdditionalData") => {
            let mut inner = portal.write();
            inner.progress_queries.push(query);
            match inner.progress.clone() {
                Some(progress) => json_response(progress),
                None => status_response(StatusCode::BAD_GATEWAY, "progress unavailable"),
            }
        }
        (Method::POST, "/api/asset/RenewLicense") => {
            let payload: Value = match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(err) => {
                    return Ok(status_response(
                        StatusCode::BAD_REQUEST,
                        format!("invalid JSON payload: {err}"),
                    ))
                }
            };
            let mut inner = portal.write();
            inner.renewals.push(payload);
            status_response(inner.renew_status, "")
        }
        (Method::GET, "/api/v2/Metric/Volume") => {
            let mut inner = portal.write();
            let level = query.get("qualityLevel[0]").cloned().unwrap_or_default();
            inner.volume_queries.push(query);
            match inner.volumes.get(&level) {
                Some(Some(words)) => json_response(json!({ "processedWords": words })),
                Some(None) => {
                    status_response(StatusCode::SERVICE_UNAVAILABLE, "metering unavailable")
                }
                None => json_response(json!({ "processedWords": 0 })),
            }
        }
        _ => status_response(StatusCode::NOT_FOUND, "unknown route"),
    };

    Ok(response)
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_brackets(key), value.to_owned())
        })
        .collect()
}

fn decode_brackets(key: &str) -> String {
    key.replace("%5B", "[")
        .replace("%5b", "[")
        .replace("%5D", "]")
        .replace("%5d", "]")
}

fn json_response(value: Value) -> Response<Body> {
    let mut response = Response::new(Body::from(value.to_string()));
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn status_response(status: StatusCode, message: impl Into<String>) -> Response<Body> {
    let mut response = Response::new(Body::from(message.into()));
    *response.status_mut() = status;
    response
}
