use super::RemoteStore;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// In-process remote store.
///
/// Used when no remote URL is configured, and by tests through its failure
/// switches and upsert counter.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    rows: Mutex<BTreeMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    upserts: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row without counting it as an upsert.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.rows().insert(key.into(), value);
    }

    /// Current value of a row.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.rows().get(key).cloned()
    }

    /// Number of successful upserts so far.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(SyncError::Remote(format!("{} unavailable", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.check(&self.fail_reads, "read")?;
        Ok(self.value(key))
    }

    async fn upsert(&self, key: &str, value: Value) -> Result<()> {
        self.check(&self.fail_writes, "write")?;
        self.rows().insert(key.to_string(), value);
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        self.check(&self.fail_reads, "read")?;
        Ok(self
            .rows()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_and_upsert() {
        let store = MemoryRemoteStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.upsert("k", json!({"a": 1})).await.unwrap();
        store.upsert("k", json!({"a": 2})).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 2})));
        assert_eq!(store.upsert_count(), 2);
    }

    #[tokio::test]
    async fn query_prefix_is_literal_and_ordered() {
        let store = MemoryRemoteStore::new();
        store.insert("master_data_base_v1_SUPPLIERS", json!([]));
        store.insert("master_data_base_v1_CUSTOMERS", json!([]));
        store.insert("master_data_changes_v1", json!({}));
        store.insert("master_data_base_v1%", json!([]));

        let keys: Vec<_> = store
            .query_prefix("master_data_base_v1_")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();

        assert_eq!(
            keys,
            vec![
                "master_data_base_v1_CUSTOMERS",
                "master_data_base_v1_SUPPLIERS"
            ]
        );
    }

    #[tokio::test]
    async fn failure_switches() {
        let store = MemoryRemoteStore::new();
        store.set_fail_writes(true);
        assert!(store.upsert("k", json!(1)).await.is_err());
        assert_eq!(store.upsert_count(), 0);

        store.set_fail_reads(true);
        assert!(store.get("k").await.is_err());
        assert!(store.query_prefix("").await.is_err());
    }
}
