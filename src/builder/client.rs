//! HTTP client for the persistence endpoint.
//!
//! [`CheckerRemote`] is the seam the store talks through; [`CheckerClient`]
//! is the reqwest implementation. Every request gets a timeout and is retried
//! when it fails transiently (connect error, timeout, 5xx). Saves are
//! exclusive per checker id: a second save for an id that is already being
//! saved fails fast with [`SyncError::SaveInProgress`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::models::{Checker, CheckerId, CheckerSummary, PublishedChecker};
use crate::errors::SyncError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4100";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRIES: u32 = 1;

/// Operations the store needs from wherever documents are persisted.
#[async_trait]
pub trait CheckerRemote: Send + Sync {
    async fn list(&self) -> Result<Vec<CheckerSummary>, SyncError>;

    /// Fetch the stored document for `id`.
    async fn fetch(&self, id: &CheckerId) -> Result<Checker, SyncError>;

    /// Overwrite the stored document; returns the copy the server kept.
    async fn store(&self, checker: &Checker) -> Result<Checker, SyncError>;

    async fn publish(&self, id: &CheckerId) -> Result<PublishedChecker, SyncError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Extra attempts after a transient failure.
    pub retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }
}

/// Clones share one set of in-flight saves.
#[derive(Clone)]
pub struct CheckerClient {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
    saves_in_flight: Arc<Mutex<HashSet<CheckerId>>>,
}

/// Marks a save as in flight until dropped.
pub(crate) struct SaveGuard {
    saves_in_flight: Arc<Mutex<HashSet<CheckerId>>>,
    id: CheckerId,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        let mut in_flight = self
            .saves_in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.id);
    }
}

impl CheckerClient {
    pub fn new(config: &ClientConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("checker-builder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SyncError::Network)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retries: config.retries,
            saves_in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn begin_save(&self, id: &CheckerId) -> Result<SaveGuard, SyncError> {
        let mut in_flight = self
            .saves_in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(id.clone()) {
            return Err(SyncError::SaveInProgress {
                id: id.to_string(),
            });
        }
        Ok(SaveGuard {
            saves_in_flight: Arc::clone(&self.saves_in_flight),
            id: id.clone(),
        })
    }

    /// Send the request built by `build`, retrying transient failures up to
    /// `self.retries` times. Non-success statuses come back as
    /// [`SyncError::Status`].
    async fn send<F>(&self, build: F) -> Result<reqwest::Response, SyncError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let result = match build().send().await {
                Ok(resp) if resp.status().is_success() => Ok(resp),
                Ok(resp) => Err(status_error(resp).await),
                Err(e) => Err(SyncError::Network(e)),
            };
            match result {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "transient failure, retrying");
                }
                other => return other,
            }
        }
    }

    async fn read_text(resp: reqwest::Response) -> Result<String, SyncError> {
        resp.text().await.map_err(SyncError::Network)
    }
}

/// Turn a non-success response into an error, using the server's
/// `{"error": ...}` body when it has one.
async fn status_error(resp: reqwest::Response) -> SyncError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);
    SyncError::Status {
        status: status.as_u16(),
        message,
    }
}

fn not_found_as(id: &CheckerId) -> impl FnOnce(SyncError) -> SyncError + '_ {
    move |e| match e {
        SyncError::Status { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            SyncError::NotFound { id: id.to_string() }
        }
        other => other,
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, SyncError> {
    serde_json::from_str(body).map_err(|e| {
        SyncError::InvalidDocument(crate::errors::BuilderError::InvalidDocument(e.to_string()))
    })
}

#[async_trait]
impl CheckerRemote for CheckerClient {
    async fn list(&self) -> Result<Vec<CheckerSummary>, SyncError> {
        let url = self.url("/c");
        let resp = self.send(|| self.http.get(&url)).await?;
        decode(&Self::read_text(resp).await?)
    }

    async fn fetch(&self, id: &CheckerId) -> Result<Checker, SyncError> {
        let url = self.url(&format!("/c/{}", id));
        debug!(checker = %id, "loading checker");
        let resp = self
            .send(|| self.http.get(&url))
            .await
            .map_err(not_found_as(id))?;
        let body = Self::read_text(resp).await?;
        Ok(Checker::from_json(&body)?)
    }

    async fn store(&self, checker: &Checker) -> Result<Checker, SyncError> {
        let _guard = self.begin_save(&checker.id)?;
        let url = self.url(&format!("/c/{}", checker.id));
        debug!(checker = %checker.id, "saving checker");
        let resp = self.send(|| self.http.put(&url).json(checker)).await?;
        let body = Self::read_text(resp).await?;
        Ok(Checker::from_json(&body)?)
    }

    async fn publish(&self, id: &CheckerId) -> Result<PublishedChecker, SyncError> {
        let url = self.url(&format!("/c/{}/publish", id));
        let resp = self
            .send(|| self.http.post(&url))
            .await
            .map_err(not_found_as(id))?;
        decode(&Self::read_text(resp).await?)
    }
}
