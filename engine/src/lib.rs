//! # Master-Data Engine
//!
//! A deterministic reconciliation engine for reference data ("master data")
//! organised in named categories such as `SUPPLIERS` or `RAW_MATERIALS`.
//!
//! Users add, edit and delete records without ever mutating the baseline
//! dataset: every edit lands in a [`ChangeLog`] overlay, and the view that
//! modules read is recomputed by [`merge`].
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, or platform
//! - **Deterministic**: Same inputs always produce same outputs
//! - **Testable**: Pure logic, no mocks needed
//! - **Portable**: Runs anywhere Rust runs (native, WASM, embedded)
//!
//! ## Core Concepts
//!
//! ### Base dataset
//!
//! [`BaseDataset`] holds the baseline records per category, bundled with the
//! application or replaced wholesale by remote per-category chunks. It is
//! never written by user edits.
//!
//! ### Change log
//!
//! [`ChangeLog`] holds three overlays per category:
//! - `added` - records created by the user, in insertion order
//! - `updated` - partial field overlays for base records
//! - `deleted` - tombstones for base records
//!
//! ### Merge
//!
//! [`merge::merge`] combines the two: base order minus tombstones, with
//! partial overlays applied in place, followed by added records.
//!
//! ## Quick Start
//!
//! ```rust
//! use masterdata_engine::{BaseDataset, Record, Store};
//! use serde_json::json;
//!
//! // 1. Describe the baseline
//! let base = BaseDataset::new().with_category(
//!     "SUPPLIERS",
//!     vec![Record::from_value(json!({"id": "S1", "name": "Acme"})).unwrap()],
//! );
//!
//! // 2. Create a store
//! let mut store = Store::new(base);
//!
//! // 3. Edit
//! let fields = json!({"name": "Globex"}).as_object().cloned().unwrap();
//! let added = store.add("SUPPLIERS", fields);
//! let rename = json!({"name": "Acme Corp"}).as_object().cloned().unwrap();
//! store.update("SUPPLIERS", "S1", rename);
//!
//! // 4. Read the effective view
//! let suppliers = store.get_by_category("SUPPLIERS");
//! assert_eq!(suppliers.len(), 2);
//! assert_eq!(suppliers[0].get("name"), Some(&json!("Acme Corp")));
//! assert_eq!(suppliers[1].id(), Some(added.record_id.as_str()));
//!
//! // The baseline is untouched
//! assert_eq!(store.base().get("SUPPLIERS")[0].get("name"), Some(&json!("Acme")));
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for use from other
//! languages. All data is exchanged as JSON strings.
//!
//! ## Persistence
//!
//! The engine only serializes. Use [`ChangeLog::to_json`] /
//! [`ChangeLog::from_json`] for the persisted change log and [`Backup`] for
//! user-facing exports. Caching and replication live in `masterdata-sync`.

pub mod backup;
pub mod changelog;
pub mod dataset;
pub mod error;
pub mod ffi;
pub mod id;
pub mod merge;
pub mod record;
pub mod store;

// Re-export main types at crate root
pub use backup::{Backup, BackupMetadata, BACKUP_APP, BACKUP_FORMAT_VERSION};
pub use changelog::{ChangeLog, ChangeTarget};
pub use dataset::{parse_chunk, BaseDataset, EffectiveDataset, DEFAULT_CATEGORIES};
pub use error::Error;
pub use id::{IdGenerator, SequentialIds, UuidIds};
pub use merge::merge;
pub use record::{fields_from_value, Fields, Record, ID_FIELD};
pub use store::{ApplyResult, Store};

/// Type aliases for clarity
pub type Category = String;
pub type RecordId = String;
pub type Revision = u64;
pub type Timestamp = u64;
