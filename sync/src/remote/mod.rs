//! Remote key-value store the change log and base chunks replicate to.
//!
//! Rows are `key -> JSON value`; writes are whole-value upserts and the last
//! writer wins.

mod http;
mod memory;

pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

#[async_trait]
pub trait RemoteStore: Debug + Send + Sync {
    /// Fetch one row. A missing row is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or overwrite one row.
    async fn upsert(&self, key: &str, value: Value) -> Result<()>;

    /// All rows whose key starts with `prefix`, ordered by key.
    async fn query_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>>;
}
