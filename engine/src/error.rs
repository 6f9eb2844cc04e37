//! Error types for the master-data engine.

use thiserror::Error;

/// All possible errors from the master-data engine.
///
/// CRUD mutations never fail: the engine performs no validation of record
/// contents. Errors only arise at the serialization boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Decoding errors
    #[error("invalid change log: {0}")]
    InvalidChangeLog(String),

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("invalid record: expected a JSON object, got {0}")]
    InvalidRecord(String),

    #[error("invalid fields: expected a JSON object, got {0}")]
    InvalidFields(String),

    // Backup errors
    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    #[error("unsupported backup format version: {found} (max supported: {supported})")]
    UnsupportedBackupVersion { found: u32, supported: u32 },

    #[error("backup was produced by '{0}', not by this application")]
    ForeignBackup(String),

    // Encoding errors
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Short description of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
