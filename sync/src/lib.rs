//! # Master-Data Sync
//!
//! Runtime around [`masterdata_engine`]: a durable local cache, a remote
//! key-value store the change log replicates to, and the
//! [`MasterDataService`] that ties them to the engine's store.
//!
//! ## Startup
//!
//! 1. The service restores the cached change log and merges it over the
//!    bundled dataset, so reads work offline immediately.
//! 2. [`MasterDataService::begin_hydration`] fetches the remote change log
//!    and base chunks in the background.
//! 3. [`MasterDataService::finish_hydration`] adopts the remote base chunks
//!    and, if present, replaces the change log wholesale.
//!
//! ## Mutations
//!
//! Each CRUD call updates the effective dataset, writes the whole change log
//! to the local cache and spawns a remote upsert. Progress is visible through
//! [`SyncState`].
//!
//! ```rust,no_run
//! use masterdata_sync::{MasterDataService, SyncConfig};
//! use serde_json::json;
//!
//! # async fn run() -> masterdata_sync::Result<()> {
//! let config = SyncConfig::from_env()?;
//! let mut service = MasterDataService::from_config(&config)?;
//! let state = service.hydrate().await;
//! println!("hydrated: {}", state);
//!
//! let fields = json!({"name": "Globex"}).as_object().cloned().unwrap_or_default();
//! service.add("SUPPLIERS", fields);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod provider;
pub mod remote;
pub mod service;

pub use cache::{FileCache, LocalCache, MemoryCache};
pub use config::{ConfigError, SyncConfig};
pub use coordinator::{Coordinator, SyncState};
pub use error::{Result, SyncError};
pub use provider::{BaseDatasetProvider, LoadOutcome, PublishOutcome};
pub use remote::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};
pub use service::{MasterDataService, PendingHydration, SyncStatus};
