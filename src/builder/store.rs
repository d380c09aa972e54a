//! Explicitly owned editing state for one checker document.
//!
//! A [`CheckerStore`] holds the document being edited, the baseline it was
//! last saved as or loaded from (none for a document never persisted), and
//! the remote it syncs with. All edits go
//! through [`CheckerStore::dispatch`]; a rejected action leaves the document
//! untouched.

use tracing::{debug, info};

use super::client::CheckerRemote;
use super::models::{Checker, CheckerId, PublishedChecker};
use super::reducer::{Action, reduce};
use crate::errors::{BuilderError, SyncError};

pub struct CheckerStore<R: CheckerRemote> {
    config: Checker,
    baseline: Option<Checker>,
    remote: R,
}

impl<R: CheckerRemote> CheckerStore<R> {
    /// Start from the default document. It has never been saved, so it
    /// counts as changed until the first save or load.
    pub fn new(remote: R) -> Self {
        Self {
            config: Checker::default(),
            baseline: None,
            remote,
        }
    }

    /// Start from `config`, treating it as already persisted.
    pub fn with_config(remote: R, config: Checker) -> Self {
        Self {
            baseline: Some(config.clone()),
            config,
            remote,
        }
    }

    pub fn config(&self) -> &Checker {
        &self.config
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn dispatch(&mut self, action: Action) -> Result<&Checker, BuilderError> {
        self.config = reduce(&self.config, action)?;
        Ok(&self.config)
    }

    /// Whether the document has edits that were never saved.
    pub fn is_changed(&self) -> bool {
        self.baseline
            .as_ref()
            .is_none_or(|baseline| !self.config.content_eq(baseline))
    }

    /// Persist the current document and adopt the server's copy.
    pub async fn save(&mut self) -> Result<&Checker, SyncError> {
        let stored = self.remote.store(&self.config).await?;
        info!(checker = %stored.id, "checker saved");
        self.baseline = Some(stored.clone());
        self.config = stored;
        Ok(&self.config)
    }

    /// Replace the document with the stored copy of `id`. On failure the
    /// current document is kept.
    pub async fn load(&mut self, id: &CheckerId) -> Result<&Checker, SyncError> {
        let loaded = self.remote.fetch(id).await?;
        debug!(checker = %id, "checker loaded");
        self.baseline = Some(loaded.clone());
        Ok(self.dispatch(Action::LoadConfig(Box::new(loaded)))?)
    }

    /// Publish the current document, saving pending edits first.
    pub async fn publish(&mut self) -> Result<PublishedChecker, SyncError> {
        if self.is_changed() {
            self.save().await?;
        }
        let published = self.remote.publish(&self.config.id).await?;
        info!(checker = %published.checker_id, snapshot = published.id, "checker published");
        Ok(published)
    }
}
