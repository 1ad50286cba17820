//! Session credential discovery.
//!
//! The portal keeps its bearer token in the page's session storage, one JSON
//! encoded object per key. [`SessionTokenLocator`] scans such a store for the
//! first entry shaped like a bearer token. The portal client never touches the
//! store directly: it asks a [`CredentialProvider`] on every request, so tests
//! and callers can inject a fake store or a fixed secret.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const BEARER_TOKEN_TYPE: &str = "Bearer";

/// Read-only view of ambient key/value session state.
pub trait SessionStore: Send + Sync {
    /// Returns every `(key, value)` pair in key order.
    fn entries(&self) -> Vec<(String, String)>;
}

/// Session state held in memory, iterated in key order.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    entries: BTreeMap<String, String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Parses a session-storage dump: a JSON object whose values are the raw
    /// stored strings. Non-string values are kept as their JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(raw).context("session dump is not valid JSON")?;
        let Some(object) = value.as_object() else {
            bail!("session dump must be a JSON object of key/value pairs");
        };

        let entries = object
            .iter()
            .map(|(key, value)| {
                let stored = match value {
                    serde_json::Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (key.clone(), stored)
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session dump {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Bearer credential discovered in session state.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub secret: String,
    pub token_type: String,
    pub target: Option<String>,
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("secret", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("target", &self.target)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredToken {
    token_type: Option<String>,
    target: Option<String>,
    secret: Option<String>,
}

/// Scans `store` for the first bearer entry whose audience contains
/// `target_hint` (when given).
///
/// Entries that are not JSON objects are skipped. The first qualifying entry
/// decides the outcome: if it carries no secret (or an empty one) the lookup reports `None`
/// rather than continuing to later entries.
pub fn locate(store: &dyn SessionStore, target_hint: Option<&str>) -> Option<SessionCredential> {
    for (key, value) in store.entries() {
        let stored: StoredToken = match serde_json::from_str(&value) {
            Ok(stored) => stored,
            Err(err) => {
                tracing::debug!(key = %key, error = %err, "skipping unparsable session entry");
                continue;
            }
        };

        if stored.token_type.as_deref() != Some(BEARER_TOKEN_TYPE) {
            continue;
        }

        if let Some(hint) = target_hint {
            let matches_target = stored
                .target
                .as_deref()
                .is_some_and(|target| target.contains(hint));
            if !matches_target {
                continue;
            }
        }

        return match stored.secret.filter(|secret| !secret.is_empty()) {
            Some(secret) => {
                tracing::debug!(key = %key, "located bearer token in session state");
                Some(SessionCredential {
                    secret,
                    token_type: BEARER_TOKEN_TYPE.to_owned(),
                    target: stored.target,
                })
            }
            None => {
                tracing::warn!(key = %key, "bearer session entry has no secret");
                None
            }
        };
    }

    tracing::warn!(target_hint = ?target_hint, "no bearer token found in session state");
    None
}

/// Source of the bearer secret attached to portal requests.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Resolves the token from session state on every call.
pub struct SessionTokenLocator<S> {
    store: S,
    target_hint: Option<String>,
}

impl<S: SessionStore> SessionTokenLocator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            target_hint: None,
        }
    }

    pub fn with_target_hint(mut self, hint: impl Into<String>) -> Self {
        self.target_hint = Some(hint.into());
        self
    }

    pub fn locate(&self) -> Option<SessionCredential> {
        locate(&self.store, self.target_hint.as_deref())
    }
}

impl<S: SessionStore> CredentialProvider for SessionTokenLocator<S> {
    fn bearer_token(&self) -> Option<String> {
        self.locate().map(|credential| credential.secret)
    }
}

/// A secret supplied up front, for example from an environment variable.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        let secret = self.0.trim();
        if secret.is_empty() {
            None
        } else {
            Some(secret.to_owned())
        }
    }
}
