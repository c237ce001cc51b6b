//! Persistence adapter.
//!
//! Reconciles three JSON sources into one in-memory collection:
//!
//! - **Load** (once, at startup): origin document, then the file-cache slot,
//!   then the snapshot slot, then nothing (the caller seeds).
//! - **Save** (after every mutation): both local cache slots synchronously,
//!   then in the background an origin PUT, falling back to a debounced push to
//!   the remote store when the origin rejects it.
//!
//! Only the local write is a guarantee; background steps log and report
//! through the status board.

mod debounce;

pub use debounce::Debouncer;

use std::sync::Arc;

use crate::db::{CacheRepository, FILE_CACHE_KEY, SNAPSHOT_KEY};
use crate::errors::AppError;
use crate::models::{parse_document, to_document_string, Node, Snapshot};
use crate::origin::OriginClient;
use crate::remote::RemoteSyncClient;
use crate::status::StatusBoard;

/// Commit message for pushes requested explicitly.
pub const MANUAL_PUSH_MESSAGE: &str = "Update folder tree";

/// Commit message for debounced background pushes.
pub const AUTO_PUSH_MESSAGE: &str = "Auto-sync: update tree";

/// Where the loaded collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Origin,
    FileCache,
    Snapshot,
    Empty,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub source: LoadSource,
    pub nodes: Vec<Node>,
}

#[derive(Clone)]
pub struct Persistence {
    cache: CacheRepository,
    origin: Option<OriginClient>,
    remote: Option<RemoteSyncClient>,
    auto_sync: bool,
    pusher: Debouncer,
    status: Arc<StatusBoard>,
}

impl Persistence {
    pub fn new(
        cache: CacheRepository,
        origin: Option<OriginClient>,
        remote: Option<RemoteSyncClient>,
        auto_sync: bool,
        pusher: Debouncer,
        status: Arc<StatusBoard>,
    ) -> Self {
        Self {
            cache,
            origin,
            remote,
            auto_sync,
            pusher,
            status,
        }
    }

    pub fn remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    pub fn status(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    /// Load the collection from the first tier that yields a valid document.
    pub async fn load(&self) -> LoadOutcome {
        if let Some(origin) = &self.origin {
            match origin.fetch_document().await {
                Ok(nodes) => {
                    tracing::info!(
                        "Loaded {} nodes from origin {}",
                        nodes.len(),
                        origin.document_url()
                    );
                    self.mirror_origin(&nodes).await;
                    return LoadOutcome {
                        source: LoadSource::Origin,
                        nodes,
                    };
                }
                Err(e) => tracing::warn!("Origin document unavailable, using local cache: {}", e),
            }
        }

        for (key, source) in [
            (FILE_CACHE_KEY, LoadSource::FileCache),
            (SNAPSHOT_KEY, LoadSource::Snapshot),
        ] {
            match self.cache.get_slot(key).await {
                Ok(Some(raw)) => match parse_document(&raw) {
                    Ok(nodes) => {
                        tracing::info!("Loaded {} nodes from cache slot {}", nodes.len(), key);
                        return LoadOutcome { source, nodes };
                    }
                    Err(e) => tracing::warn!("Cache slot {} is unreadable: {}", key, e),
                },
                Ok(None) => tracing::debug!("Cache slot {} is empty", key),
                Err(e) => tracing::warn!("Failed to read cache slot {}: {}", key, e),
            }
        }

        tracing::info!("No stored tree found");
        LoadOutcome {
            source: LoadSource::Empty,
            nodes: Vec::new(),
        }
    }

    /// Keep the file-cache slot equal to the last document read from the origin.
    async fn mirror_origin(&self, nodes: &[Node]) {
        let result = match to_document_string(nodes) {
            Ok(document) => self.cache.put_slot(FILE_CACHE_KEY, &document).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to mirror origin document locally: {}", e);
        }
    }

    /// Write the local cache, then push outward in the background.
    pub async fn save(&self, snapshot: Snapshot) {
        let document = match to_document_string(&snapshot.nodes) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!("Failed to serialize tree: {}", e);
                self.status.show("Error saving locally").await;
                return;
            }
        };

        match self
            .cache
            .put_slots(&[SNAPSHOT_KEY, FILE_CACHE_KEY], &document)
            .await
        {
            Ok(()) => {
                tracing::debug!("Saved revision {} locally", snapshot.revision);
                self.status.show("Saved locally").await;
            }
            Err(e) => {
                tracing::error!("Failed to save locally: {}", e);
                self.status.show("Error saving locally").await;
            }
        }

        if self.auto_sync && self.remote.is_some() {
            self.schedule_push(snapshot.revision, document.clone())
                .await;
        }

        let this = self.clone();
        tokio::spawn(async move {
            this.push_outward(snapshot.revision, document).await;
        });
    }

    async fn push_outward(&self, revision: i64, document: String) {
        if let Some(origin) = &self.origin {
            match origin.put_document(&document).await {
                Ok(()) => {
                    self.status
                        .show(format!("Saved to {}", origin.document_url()))
                        .await;
                    return;
                }
                Err(e) => tracing::debug!("Origin rejected save: {}", e),
            }
        }

        if self.remote.is_some() && !self.auto_sync {
            self.schedule_push(revision, document).await;
        }
    }

    async fn schedule_push(&self, revision: i64, document: String) {
        let Some(remote) = self.remote.clone() else {
            return;
        };
        let status = Arc::clone(&self.status);
        self.pusher
            .schedule(revision, move || async move {
                status.show("Auto-sync: pushing to remote...").await;
                match remote
                    .put_file(remote.path(), &document, AUTO_PUSH_MESSAGE)
                    .await
                {
                    Ok(_) => status.show("Auto-sync: push OK").await,
                    Err(e) => {
                        tracing::warn!("Auto-sync push failed: {}", e);
                        status.show("Auto-sync error").await;
                    }
                }
            })
            .await;
    }

    /// Push immediately, cancelling any pending background push.
    pub async fn push_now(&self, nodes: &[Node]) -> Result<String, AppError> {
        let remote = self.remote.as_ref().ok_or_else(|| {
            AppError::NotConfigured("Remote token, owner, repository and path are required".into())
        })?;
        if self.pusher.cancel().await {
            tracing::debug!("Cancelled pending auto-sync push");
        }

        self.status.show("Pushing to remote...").await;
        let document = to_document_string(nodes)?;
        match remote
            .put_file(remote.path(), &document, MANUAL_PUSH_MESSAGE)
            .await
        {
            Ok(revision) => {
                self.status
                    .show(format!("Push OK: {}", remote.path()))
                    .await;
                Ok(revision)
            }
            Err(e) => {
                self.status.show(format!("Push error: {}", e)).await;
                Err(e)
            }
        }
    }

    /// Fetch the remote document. The caller replaces the collection with it.
    pub async fn pull(&self) -> Result<Vec<Node>, AppError> {
        let remote = self.remote.as_ref().ok_or_else(|| {
            AppError::NotConfigured("Remote token, owner, repository and path are required".into())
        })?;

        self.status.show("Downloading from remote...").await;
        let result = remote
            .get_file(remote.path())
            .await
            .and_then(|file| parse_document(&file.content));
        if let Err(e) = &result {
            self.status.show(format!("Pull error: {}", e)).await;
        }
        result
    }
}
