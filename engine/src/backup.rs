//! Backup documents for exporting and restoring user edits.
//!
//! A backup wraps the change log with enough metadata to refuse files from
//! other applications or from a newer format. Restoring a backup is a full
//! replace of the change log, never a merge.

use crate::{error::Result, ChangeLog, Error, Timestamp};
use serde::{Deserialize, Serialize};

/// Version of the backup format for future compatibility.
pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// Application tag written into every backup.
pub const BACKUP_APP: &str = "masterdata";

/// A point-in-time export of the change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// Backup format version
    pub format_version: u32,
    /// Producing application
    pub app: String,
    /// When the backup was taken (milliseconds since epoch)
    pub exported_at: Timestamp,
    /// The exported edits
    pub changes: ChangeLog,
}

impl Backup {
    pub fn new(changes: ChangeLog, exported_at: Timestamp) -> Self {
        Self {
            format_version: BACKUP_FORMAT_VERSION,
            app: BACKUP_APP.to_string(),
            exported_at,
            changes,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize and check the format version and the app tag.
    pub fn from_json(json: &str) -> Result<Self> {
        let backup: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidBackup(e.to_string()))?;

        if backup.format_version > BACKUP_FORMAT_VERSION {
            return Err(Error::UnsupportedBackupVersion {
                found: backup.format_version,
                supported: BACKUP_FORMAT_VERSION,
            });
        }
        if backup.app != BACKUP_APP {
            return Err(Error::ForeignBackup(backup.app));
        }

        Ok(backup)
    }
}

/// Summary of a backup (without the full data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub format_version: u32,
    pub exported_at: Timestamp,
    pub added_count: usize,
    pub updated_count: usize,
    pub deleted_count: usize,
    pub category_count: usize,
}

impl From<&Backup> for BackupMetadata {
    fn from(backup: &Backup) -> Self {
        Self {
            format_version: backup.format_version,
            exported_at: backup.exported_at,
            added_count: backup.changes.added_count(),
            updated_count: backup.changes.updated_count(),
            deleted_count: backup.changes.deleted_count(),
            category_count: backup.changes.categories().len(),
        }
    }
}
