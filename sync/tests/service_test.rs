//! Integration tests for the master-data service.
//!
//! Everything runs against in-process caches and remote stores; the file
//! cache tests use temporary directories.

use masterdata_engine::{fields_from_value, BaseDataset, ChangeLog, Fields, Record};
use masterdata_sync::{
    FileCache, LocalCache, MasterDataService, MemoryCache, MemoryRemoteStore, SyncConfig,
    SyncError, SyncState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const CHANGES_KEY: &str = "master_data_changes_v1";

fn fields(value: Value) -> Fields {
    fields_from_value(value).unwrap()
}

fn bundled() -> BaseDataset {
    BaseDataset::new()
        .with_category(
            "SUPPLIERS",
            vec![Record::from_value(json!({"id": "S1", "name": "Acme"})).unwrap()],
        )
        .with_category("PURCHASE_ORDERS", vec![])
}

struct Harness {
    service: MasterDataService,
    cache: Arc<MemoryCache>,
    remote: Arc<MemoryRemoteStore>,
}

fn harness_with(cache: Arc<MemoryCache>, remote: Arc<MemoryRemoteStore>) -> Harness {
    let service = MasterDataService::new(
        &SyncConfig::default(),
        bundled(),
        cache.clone(),
        remote.clone(),
    );
    Harness {
        service,
        cache,
        remote,
    }
}

fn harness() -> Harness {
    harness_with(
        Arc::new(MemoryCache::new()),
        Arc::new(MemoryRemoteStore::new()),
    )
}

fn names(service: &MasterDataService, category: &str) -> Vec<String> {
    service
        .get_by_category(category)
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}

async fn wait_for_state(service: &MasterDataService, state: SyncState) {
    let mut rx = service.subscribe_state();
    timeout(Duration::from_secs(2), rx.wait_for(|s| *s == state))
        .await
        .expect("timed out waiting for sync state")
        .expect("state channel closed");
}

fn cached_changes(cache: &MemoryCache) -> Option<ChangeLog> {
    cache
        .get(CHANGES_KEY)
        .unwrap()
        .map(|json| ChangeLog::from_json(&json).unwrap())
}

#[cfg(test)]
mod crud_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_persists_locally_and_replicates() {
        let mut h = harness();

        let result = h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));

        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme", "Globex"]);
        let cached = cached_changes(&h.cache).unwrap();
        assert!(cached.is_added("SUPPLIERS", &result.record_id));

        wait_for_state(&h.service, SyncState::Synced).await;
        let remote = ChangeLog::from_value(h.remote.value(CHANGES_KEY).unwrap()).unwrap();
        assert_eq!(remote, cached);
    }

    #[tokio::test]
    async fn test_supplier_scenario() {
        let mut h = harness();

        h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));
        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme", "Globex"]);

        h.service
            .update("SUPPLIERS", "S1", fields(json!({"name": "Acme Corp"})));
        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme Corp", "Globex"]);

        h.service.delete("SUPPLIERS", "S1");
        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Globex"]);

        // the baseline is untouched
        assert_eq!(h.service.store().base().get("SUPPLIERS").len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_mutation() {
        let mut h = harness();
        let mut rx = h.service.subscribe();
        assert_eq!(rx.borrow_and_update().get("SUPPLIERS").len(), 1);

        h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().get("SUPPLIERS").len(), 2);

        h.service.delete("SUPPLIERS", "S1");
        assert_eq!(rx.borrow_and_update().get("SUPPLIERS").len(), 1);
    }

    #[tokio::test]
    async fn test_local_write_failure_keeps_mutation() {
        let mut h = harness();
        h.cache.set_fail_writes(true);

        h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));

        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme", "Globex"]);
        assert!(cached_changes(&h.cache).is_none());
        wait_for_state(&h.service, SyncState::Synced).await;
    }

    #[tokio::test]
    async fn test_remote_failure_is_not_retried() {
        let mut h = harness();
        h.remote.set_fail_writes(true);

        h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));
        wait_for_state(&h.service, SyncState::ReplicationFailed).await;

        h.remote.set_fail_writes(false);
        tokio::task::yield_now().await;

        assert_eq!(h.service.state(), SyncState::ReplicationFailed);
        assert_eq!(h.remote.upsert_count(), 0);
        assert!(cached_changes(&h.cache).is_some());
    }

    #[tokio::test]
    async fn test_status_counts() {
        let mut h = harness();
        h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));
        h.service
            .update("SUPPLIERS", "S1", fields(json!({"name": "Acme Corp"})));
        h.service.delete("PURCHASE_ORDERS", "PO-1");

        let status = h.service.status();

        assert_eq!(status.added, 1);
        assert_eq!(status.updated, 1);
        assert_eq!(status.deleted, 1);
        assert_eq!(status.revision, h.service.store().revision());
    }
}

#[cfg(test)]
mod hydration_tests {
    use super::*;

    fn seeded_cache() -> Arc<MemoryCache> {
        let mut local = ChangeLog::new();
        local.add(
            "SUPPLIERS",
            Record::new("local-1", fields(json!({"name": "Local Co"}))),
        );
        let cache = Arc::new(MemoryCache::new());
        cache.set(CHANGES_KEY, &local.to_json().unwrap()).unwrap();
        cache
    }

    #[tokio::test]
    async fn test_restores_cached_changes_on_startup() {
        let h = harness_with(seeded_cache(), Arc::new(MemoryRemoteStore::new()));

        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme", "Local Co"]);
        assert_eq!(h.service.state(), SyncState::Init);
    }

    #[tokio::test]
    async fn test_corrupt_cache_starts_empty() {
        let cache = Arc::new(MemoryCache::new());
        cache.set(CHANGES_KEY, "{\"added\": [").unwrap();

        let h = harness_with(cache, Arc::new(MemoryRemoteStore::new()));

        assert!(h.service.store().changes().is_empty());
        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme"]);
    }

    #[tokio::test]
    async fn test_remote_change_log_replaces_local() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.insert(CHANGES_KEY, json!({"deleted": {"SUPPLIERS": ["S1"]}}));
        let mut h = harness_with(seeded_cache(), remote);

        let state = h.service.hydrate().await;

        assert_eq!(state, SyncState::Synced);
        assert!(names(&h.service, "SUPPLIERS").is_empty());
        let cached = cached_changes(&h.cache).unwrap();
        assert!(cached.is_deleted("SUPPLIERS", "S1"));
        assert_eq!(cached.added_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_remote_row_keeps_local() {
        let mut h = harness_with(seeded_cache(), Arc::new(MemoryRemoteStore::new()));

        let state = h.service.hydrate().await;

        assert_eq!(state, SyncState::Synced);
        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme", "Local Co"]);
    }

    #[tokio::test]
    async fn test_offline_hydration_falls_back() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.set_fail_reads(true);
        let mut h = harness_with(seeded_cache(), remote);

        let state = h.service.hydrate().await;

        assert_eq!(state, SyncState::OfflineFallback);
        assert_eq!(h.service.state(), SyncState::OfflineFallback);
        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme", "Local Co"]);
        // CRUD keeps working
        h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));
        assert_eq!(names(&h.service, "SUPPLIERS").len(), 3);
    }

    #[tokio::test]
    async fn test_remote_base_chunks_are_adopted() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.insert(
            "master_data_base_v1_SUPPLIERS",
            json!([{"id": "S1", "name": "Acme"}, {"id": "S2", "name": "Initech"}]),
        );
        let mut h = harness_with(Arc::new(MemoryCache::new()), remote);
        h.service
            .update("SUPPLIERS", "S2", fields(json!({"name": "Initech Ltd"})));

        h.service.hydrate().await;

        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme", "Initech Ltd"]);
        assert!(h.service.get_by_category("PURCHASE_ORDERS").is_empty());
    }

    #[tokio::test]
    async fn test_edits_during_hydration_are_discarded() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.insert(CHANGES_KEY, json!({"deleted": {"SUPPLIERS": ["S1"]}}));
        // keep the racing edit from reaching the remote row first
        remote.set_fail_writes(true);
        let mut h = harness_with(Arc::new(MemoryCache::new()), remote);

        let pending = h.service.begin_hydration();
        assert_eq!(h.service.state(), SyncState::Fetching);
        h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));
        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme", "Globex"]);

        let state = h.service.finish_hydration(pending).await.unwrap();

        assert_eq!(state, SyncState::Synced);
        assert!(names(&h.service, "SUPPLIERS").is_empty());
        assert_eq!(h.service.store().changes().added_count(), 0);
        assert_eq!(h.service.state(), SyncState::Synced);
    }
}

#[cfg(test)]
mod maintenance_tests {
    use super::*;

    #[tokio::test]
    async fn test_reset_changes() {
        let mut h = harness();
        h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));
        wait_for_state(&h.service, SyncState::Synced).await;

        h.service.reset_changes();

        assert!(h.service.store().changes().is_empty());
        assert_eq!(names(&h.service, "SUPPLIERS"), vec!["Acme"]);
        assert!(h.cache.get(CHANGES_KEY).unwrap().is_none());

        wait_for_state(&h.service, SyncState::Synced).await;
        let remote = ChangeLog::from_value(h.remote.value(CHANGES_KEY).unwrap()).unwrap();
        assert!(remote.is_empty());
    }

    #[tokio::test]
    async fn test_backup_roundtrip_between_services() {
        let mut source = harness();
        source
            .service
            .add("SUPPLIERS", fields(json!({"name": "Globex"})));
        source
            .service
            .update("SUPPLIERS", "S1", fields(json!({"name": "Acme Corp"})));
        let json = source.service.export_backup().to_json_pretty().unwrap();

        let mut target = harness();
        target
            .service
            .add("SUPPLIERS", fields(json!({"name": "Discarded"})));
        let metadata = target.service.restore_backup(&json).unwrap();

        assert_eq!(metadata.added_count, 1);
        assert_eq!(metadata.updated_count, 1);
        assert_eq!(metadata.deleted_count, 0);
        assert_eq!(target.service.effective(), source.service.effective());

        wait_for_state(&target.service, SyncState::Synced).await;
        assert_eq!(
            cached_changes(&target.cache).unwrap(),
            source.service.store().changes().clone()
        );
    }

    #[tokio::test]
    async fn test_restore_rejects_foreign_backup() {
        let mut h = harness();
        h.service.add("SUPPLIERS", fields(json!({"name": "Globex"})));
        let foreign = r#"{"formatVersion": 1, "app": "other", "exportedAt": 0, "changes": {}}"#;

        let err = h.service.restore_backup(foreign).unwrap_err();

        assert!(matches!(
            err,
            SyncError::Engine(masterdata_engine::Error::ForeignBackup(_))
        ));
        assert_eq!(h.service.store().changes().added_count(), 1);
    }

    #[tokio::test]
    async fn test_published_base_reaches_other_clients() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let publisher = harness_with(Arc::new(MemoryCache::new()), remote.clone());
        let new_base = BaseDataset::new().with_category(
            "SUPPLIERS",
            vec![Record::from_value(json!({"id": "S7", "name": "Umbrella"})).unwrap()],
        );

        let outcomes = publisher.service.publish_base(&new_base).await;
        assert!(outcomes.iter().all(|o| o.is_ok()));

        let mut reader = harness_with(Arc::new(MemoryCache::new()), remote);
        reader.service.hydrate().await;

        assert_eq!(names(&reader.service, "SUPPLIERS"), vec!["Umbrella"]);
    }
}

#[cfg(test)]
mod file_cache_tests {
    use super::*;

    #[tokio::test]
    async fn test_changes_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryRemoteStore::new());
        let config = SyncConfig::default();

        let mut first = MasterDataService::new(
            &config,
            bundled(),
            Arc::new(FileCache::new(dir.path())),
            remote.clone(),
        );
        first.add("SUPPLIERS", fields(json!({"name": "Globex"})));
        first.delete("SUPPLIERS", "S1");
        let before = first.effective();
        drop(first);

        let second = MasterDataService::new(
            &config,
            bundled(),
            Arc::new(FileCache::new(dir.path())),
            remote,
        );

        assert_eq!(second.effective(), before);
    }

    #[tokio::test]
    async fn test_from_config_runs_offline() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            cache_dir: dir.path().join("cache"),
            ..SyncConfig::default()
        };

        let mut service = MasterDataService::from_config(&config).unwrap();

        assert!(service.get_by_category("SUPPLIERS").is_empty());
        assert!(service.effective().categories().any(|c| c == "PURCHASE_ORDERS"));

        service.add("SUPPLIERS", fields(json!({"name": "Globex"})));
        assert!(dir.path().join("cache").join("master_data_changes_v1.json").exists());
    }
}
