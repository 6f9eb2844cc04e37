//! The change log: every user edit, kept as overlays on the base dataset.
//!
//! Three overlays per category:
//! - `added`: records created by the user, in insertion order
//! - `updated`: partial field overlays for base records, keyed by id
//! - `deleted`: tombstones for base records
//!
//! Invariant: an id present in `added[c]` is never a key of `updated[c]`.
//! Edits to an added record are applied to the added entry itself.
//!
//! The serialized form is `{"added": {..}, "updated": {..}, "deleted": {..}}`
//! and is what gets written to the local cache and the remote row.

use crate::{error::Result, Category, Error, Fields, Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Which overlay a mutation ended up touching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeTarget {
    /// The `added` list (append, in-place edit, or removal)
    Added,
    /// The `updated` map (partial overlay on a base record)
    Updated,
    /// The `deleted` set (tombstone against a base record)
    Deleted,
}

/// All user edits, versionless.
///
/// Uses BTreeMap so serialization is deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeLog {
    added: BTreeMap<Category, Vec<Record>>,
    updated: BTreeMap<Category, BTreeMap<RecordId, Fields>>,
    deleted: BTreeMap<Category, BTreeSet<RecordId>>,
}

impl ChangeLog {
    /// Create an empty change log.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no overlay holds anything.
    pub fn is_empty(&self) -> bool {
        self.added.values().all(Vec::is_empty)
            && self.updated.values().all(BTreeMap::is_empty)
            && self.deleted.values().all(BTreeSet::is_empty)
    }

    /// Append a freshly created record to `added[category]`.
    ///
    /// The caller is responsible for giving it a unique id.
    pub fn add(&mut self, category: impl Into<Category>, record: Record) {
        self.added.entry(category.into()).or_default().push(record);
    }

    /// Apply a partial update.
    ///
    /// Added records are edited in place (position kept). Anything else gets
    /// `updated[category][id] = partial`, replacing any earlier partial for
    /// the same id.
    pub fn update(&mut self, category: &str, id: &str, partial: Fields) -> ChangeTarget {
        if let Some(record) = self
            .added
            .get_mut(category)
            .and_then(|records| records.iter_mut().find(|r| r.has_id(id)))
        {
            record.apply_partial(&partial);
            return ChangeTarget::Added;
        }

        self.updated
            .entry(category.to_string())
            .or_default()
            .insert(id.to_string(), partial);
        ChangeTarget::Updated
    }

    /// Delete a record.
    ///
    /// Added records are simply dropped from `added` with no tombstone, so
    /// the id may be reused. Anything else gets a tombstone.
    pub fn delete(&mut self, category: &str, id: &str) -> ChangeTarget {
        if let Some(records) = self.added.get_mut(category) {
            if let Some(pos) = records.iter().position(|r| r.has_id(id)) {
                records.remove(pos);
                if records.is_empty() {
                    self.added.remove(category);
                }
                return ChangeTarget::Added;
            }
        }

        self.deleted
            .entry(category.to_string())
            .or_default()
            .insert(id.to_string());
        ChangeTarget::Deleted
    }

    /// Whether `id` is a user-added record of `category`.
    pub fn is_added(&self, category: &str, id: &str) -> bool {
        self.added(category).iter().any(|r| r.has_id(id))
    }

    /// Whether `id` carries a tombstone in `category`.
    pub fn is_deleted(&self, category: &str, id: &str) -> bool {
        self.deleted
            .get(category)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Added records of a category, in insertion order.
    pub fn added(&self, category: &str) -> &[Record] {
        self.added.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Partial overlays of a category.
    pub fn updated(&self, category: &str) -> Option<&BTreeMap<RecordId, Fields>> {
        self.updated.get(category)
    }

    /// Tombstones of a category.
    pub fn deleted(&self, category: &str) -> Option<&BTreeSet<RecordId>> {
        self.deleted.get(category)
    }

    /// Every category mentioned by any overlay.
    pub fn categories(&self) -> BTreeSet<&Category> {
        self.added
            .keys()
            .chain(self.updated.keys())
            .chain(self.deleted.keys())
            .collect()
    }

    /// Whether any overlay mentions `category`.
    pub fn touches(&self, category: &str) -> bool {
        self.added.contains_key(category)
            || self.updated.contains_key(category)
            || self.deleted.contains_key(category)
    }

    pub fn added_count(&self) -> usize {
        self.added.values().map(Vec::len).sum()
    }

    pub fn updated_count(&self) -> usize {
        self.updated.values().map(BTreeMap::len).sum()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.values().map(BTreeSet::len).sum()
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidChangeLog(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidChangeLog(e.to_string()))
    }
}
