//! Portal client plumbing: session credentials, authentication headers,
//! client options, request metrics, and the authenticated fetcher.

pub mod auth;
pub mod client;
pub mod credentials;
pub mod metrics;
pub mod options;

pub use client::{FetchError, PortalApi, PortalClient};
pub use credentials::{
    CredentialProvider, InMemorySessionStore, SessionCredential, SessionStore,
    SessionTokenLocator, StaticToken,
};
pub use metrics::RequestMetricsSnapshot;
pub use options::PortalClientOptions;
