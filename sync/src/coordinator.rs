//! Persistence/sync coordinator.
//!
//! Every change log change is written whole to the local cache under one
//! fixed key, then upserted to the same key remotely in a background task.
//! Replication is fire-and-forget: failures are logged and surface only as
//! [`SyncState::ReplicationFailed`].

use crate::cache::LocalCache;
use crate::remote::RemoteStore;
use masterdata_engine::ChangeLog;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of the local and remote copies of the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Init,
    Fetching,
    Synced,
    OfflineFallback,
    Dirty,
    PersistingLocal,
    PersistingRemote,
    ReplicationFailed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Init => "init",
            SyncState::Fetching => "fetching",
            SyncState::Synced => "synced",
            SyncState::OfflineFallback => "offline_fallback",
            SyncState::Dirty => "dirty",
            SyncState::PersistingLocal => "persisting_local",
            SyncState::PersistingRemote => "persisting_remote",
            SyncState::ReplicationFailed => "replication_failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    cache: Arc<dyn LocalCache>,
    remote: Arc<dyn RemoteStore>,
    changes_key: String,
    state: Arc<watch::Sender<SyncState>>,
    /// Id of the latest attempt; only it may publish a terminal state
    attempt: Arc<AtomicU64>,
}

impl Coordinator {
    pub fn new(
        cache: Arc<dyn LocalCache>,
        remote: Arc<dyn RemoteStore>,
        changes_key: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Init);
        Self {
            cache,
            remote,
            changes_key: changes_key.into(),
            state: Arc::new(state),
            attempt: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Read the cached change log. Missing or unreadable data yields an
    /// empty log.
    pub fn restore_local(&self) -> ChangeLog {
        let json = match self.cache.get(&self.changes_key) {
            Ok(Some(json)) => json,
            Ok(None) => return ChangeLog::new(),
            Err(e) => {
                error!(key = %self.changes_key, error = %e, "Failed to read cached change log");
                return ChangeLog::new();
            }
        };
        match ChangeLog::from_json(&json) {
            Ok(changes) => {
                debug!(
                    added = changes.added_count(),
                    updated = changes.updated_count(),
                    deleted = changes.deleted_count(),
                    "Restored cached change log"
                );
                changes
            }
            Err(e) => {
                error!(key = %self.changes_key, error = %e, "Cached change log is corrupt, starting empty");
                ChangeLog::new()
            }
        }
    }

    /// Mark a startup fetch as in flight.
    pub fn begin_fetch(&self) {
        self.settle(SyncState::Fetching);
    }

    /// Overwrite the local copy without replicating. Used when the remote
    /// copy has just been adopted.
    pub fn store_local(&self, changes: &ChangeLog) {
        match changes.to_json() {
            Ok(json) => self.write_local(&json),
            Err(e) => error!(error = %e, "Failed to serialize change log"),
        }
    }

    /// End a startup fetch in `state` (`Synced` or `OfflineFallback`).
    pub fn finish_fetch(&self, state: SyncState) {
        self.settle(state);
    }

    /// Persist `changes` locally, then replicate them in the background.
    ///
    /// The local write completes before this returns. The returned handle
    /// resolves when the remote upsert settles; dropping it does not cancel
    /// replication.
    pub fn persist(&self, changes: &ChangeLog) -> Option<JoinHandle<()>> {
        let attempt = self.begin_attempt();
        let value = match changes.to_value() {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Failed to serialize change log");
                self.publish(attempt, SyncState::ReplicationFailed);
                return None;
            }
        };

        self.state.send_replace(SyncState::PersistingLocal);
        self.write_local(&value.to_string());

        self.replicate(attempt, value)
    }

    /// Drop the local copy and replicate an empty change log.
    pub fn reset(&self) -> Option<JoinHandle<()>> {
        let attempt = self.begin_attempt();

        self.state.send_replace(SyncState::PersistingLocal);
        if let Err(e) = self.cache.remove(&self.changes_key) {
            error!(key = %self.changes_key, error = %e, "Failed to remove cached change log");
        }

        let value = match ChangeLog::new().to_value() {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Failed to serialize change log");
                self.publish(attempt, SyncState::ReplicationFailed);
                return None;
            }
        };
        self.replicate(attempt, value)
    }

    fn begin_attempt(&self) -> u64 {
        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(SyncState::Dirty);
        attempt
    }

    fn settle(&self, state: SyncState) {
        self.attempt.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(state);
    }

    fn write_local(&self, json: &str) {
        // A failed write leaves the in-memory change log authoritative
        if let Err(e) = self.cache.set(&self.changes_key, json) {
            error!(key = %self.changes_key, error = %e, "Failed to write change log to local cache");
        }
    }

    fn replicate(&self, attempt: u64, value: Value) -> Option<JoinHandle<()>> {
        self.state.send_replace(SyncState::PersistingRemote);

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, change log not replicated");
                self.publish(attempt, SyncState::ReplicationFailed);
                return None;
            }
        };

        let this = self.clone();
        Some(handle.spawn(async move {
            match this.remote.upsert(&this.changes_key, value).await {
                Ok(()) => {
                    debug!(attempt, "Change log replicated");
                    this.publish(attempt, SyncState::Synced);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Failed to replicate change log");
                    this.publish(attempt, SyncState::ReplicationFailed);
                }
            }
        }))
    }

    /// Publish a terminal state unless a newer attempt has started.
    fn publish(&self, attempt: u64, state: SyncState) {
        let published = self.state.send_if_modified(|current| {
            if self.attempt.load(Ordering::SeqCst) != attempt {
                return false;
            }
            *current = state;
            true
        });
        if !published {
            info!(attempt, %state, "Superseded replication result dropped");
        }
    }
}
