//! Category CRUD service over the engine store, wired to the coordinator.

use crate::cache::{FileCache, LocalCache};
use crate::config::SyncConfig;
use crate::coordinator::{Coordinator, SyncState};
use crate::error::{Result, SyncError};
use crate::provider::{BaseDatasetProvider, LoadOutcome, PublishOutcome};
use crate::remote::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};
use masterdata_engine::{
    ApplyResult, Backup, BackupMetadata, BaseDataset, EffectiveDataset, Fields, Record, Revision,
    Store, Timestamp,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Snapshot of the service for a status panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub state: SyncState,
    pub revision: Revision,
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// A startup fetch running in the background.
#[derive(Debug)]
pub struct PendingHydration(JoinHandle<LoadOutcome>);

/// The master-data service.
///
/// Owns the store; every mutation recomputes the effective dataset,
/// notifies subscribers and hands the change log to the coordinator.
#[derive(Debug)]
pub struct MasterDataService {
    store: Store,
    coordinator: Coordinator,
    provider: BaseDatasetProvider,
    effective: watch::Sender<Arc<EffectiveDataset>>,
}

impl MasterDataService {
    /// Build a service over the bundled dataset, restoring the cached change log.
    pub fn new(
        config: &SyncConfig,
        bundled: BaseDataset,
        cache: Arc<dyn LocalCache>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        let coordinator = Coordinator::new(cache, remote.clone(), config.changes_key.clone());
        let provider = BaseDatasetProvider::new(bundled.clone(), remote, config);

        let mut store = Store::new(bundled);
        store.replace_changes(coordinator.restore_local());
        let (effective, _) = watch::channel(store.effective_shared());

        Self {
            store,
            coordinator,
            provider,
            effective,
        }
    }

    /// Build a service from configuration: file cache, bundled dataset file
    /// and HTTP remote (or an in-memory one when no URL is set).
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let bundled = config.load_bundled()?;
        let cache: Arc<dyn LocalCache> = Arc::new(FileCache::new(config.cache_dir.clone()));
        let remote: Arc<dyn RemoteStore> = match &config.remote_url {
            Some(url) => Arc::new(HttpRemoteStore::new(url, config.auth_token.clone())?),
            None => {
                info!("No remote URL configured, running offline");
                Arc::new(MemoryRemoteStore::new())
            }
        };
        Ok(Self::new(config, bundled, cache, remote))
    }

    // ---- queries ----

    pub fn get_by_category(&self, category: &str) -> &[Record] {
        self.store.get_by_category(category)
    }

    pub fn effective(&self) -> Arc<EffectiveDataset> {
        self.store.effective_shared()
    }

    /// Receive every new effective dataset.
    pub fn subscribe(&self) -> watch::Receiver<Arc<EffectiveDataset>> {
        self.effective.subscribe()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> SyncState {
        self.coordinator.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.coordinator.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        let changes = self.store.changes();
        SyncStatus {
            state: self.coordinator.state(),
            revision: self.store.revision(),
            added: changes.added_count(),
            updated: changes.updated_count(),
            deleted: changes.deleted_count(),
        }
    }

    // ---- mutations ----

    pub fn add(&mut self, category: &str, fields: Fields) -> ApplyResult {
        let result = self.store.add(category, fields);
        self.changed();
        result
    }

    pub fn update(&mut self, category: &str, id: &str, partial: Fields) -> ApplyResult {
        let result = self.store.update(category, id, partial);
        self.changed();
        result
    }

    pub fn delete(&mut self, category: &str, id: &str) -> ApplyResult {
        let result = self.store.delete(category, id);
        self.changed();
        result
    }

    /// Discard every local edit, locally and remotely.
    pub fn reset_changes(&mut self) -> Revision {
        let revision = self.store.clear_changes();
        self.coordinator.reset();
        self.notify();
        info!(revision, "Local changes reset");
        revision
    }

    // ---- hydration ----

    /// Start the remote fetch and return immediately. Must be called within
    /// a Tokio runtime.
    ///
    /// Mutations applied before [`finish_hydration`](Self::finish_hydration)
    /// are overwritten if the remote holds a change log.
    pub fn begin_hydration(&self) -> PendingHydration {
        self.coordinator.begin_fetch();
        let provider = self.provider.clone();
        PendingHydration(tokio::spawn(async move { provider.load().await }))
    }

    /// Wait for the background fetch and adopt its result. If the task
    /// panicked or was cancelled the service keeps its current data and
    /// settles in offline fallback.
    pub async fn finish_hydration(&mut self, pending: PendingHydration) -> Result<SyncState> {
        match pending.0.await {
            Ok(outcome) => Ok(self.apply_outcome(outcome)),
            Err(e) => {
                error!(error = %e, "Hydration task failed");
                self.coordinator.finish_fetch(SyncState::OfflineFallback);
                Err(SyncError::Task(e.to_string()))
            }
        }
    }

    /// Fetch and adopt the remote state in one step.
    pub async fn hydrate(&mut self) -> SyncState {
        self.coordinator.begin_fetch();
        let outcome = self.provider.load().await;
        self.apply_outcome(outcome)
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) -> SyncState {
        let state = if outcome.is_complete() {
            SyncState::Synced
        } else {
            SyncState::OfflineFallback
        };

        self.store.replace_base(outcome.base);
        if let Some(changes) = outcome.changes {
            // full replace; concurrent local edits are lost
            self.store.replace_changes(changes);
            self.coordinator.store_local(self.store.changes());
        }
        self.coordinator.finish_fetch(state);
        self.notify();

        info!(
            %state,
            revision = self.store.revision(),
            records = self.store.effective().record_count(),
            "Hydrated master data"
        );
        state
    }

    // ---- backup / base publishing ----

    pub fn export_backup(&self) -> Backup {
        Backup::new(self.store.changes().clone(), now_millis())
    }

    /// Replace the change log with a backup's, then persist and replicate it.
    pub fn restore_backup(&mut self, json: &str) -> Result<BackupMetadata> {
        let backup = Backup::from_json(json)?;
        let metadata = BackupMetadata::from(&backup);
        self.store.replace_changes(backup.changes);
        self.changed();
        info!(
            added = metadata.added_count,
            updated = metadata.updated_count,
            deleted = metadata.deleted_count,
            "Restored backup"
        );
        Ok(metadata)
    }

    /// Upload `base` as per-category chunks. Takes effect for clients on
    /// their next hydration.
    pub async fn publish_base(&self, base: &BaseDataset) -> Vec<PublishOutcome> {
        self.provider.publish(base).await
    }

    fn changed(&self) {
        self.notify();
        self.coordinator.persist(self.store.changes());
    }

    fn notify(&self) {
        self.effective.send_replace(self.store.effective_shared());
    }
}

fn now_millis() -> Timestamp {
    Timestamp::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn offline_service() -> MasterDataService {
        MasterDataService::new(
            &SyncConfig::default(),
            BaseDataset::new(),
            Arc::new(MemoryCache::new()),
            Arc::new(MemoryRemoteStore::new()),
        )
    }

    #[tokio::test]
    async fn failed_hydration_task_settles_offline() {
        let mut service = offline_service();
        service.coordinator.begin_fetch();
        assert_eq!(service.state(), SyncState::Fetching);

        let pending = PendingHydration(tokio::spawn(async {
            panic!("fetch aborted");
        }));
        let result = service.finish_hydration(pending).await;

        assert!(matches!(result, Err(SyncError::Task(_))));
        assert_eq!(service.state(), SyncState::OfflineFallback);
    }
}
