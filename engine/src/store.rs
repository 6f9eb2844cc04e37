//! Store - the in-memory state container.
//!
//! The Store owns the base dataset, the change log and the id generator, and
//! keeps the effective dataset up to date. Its CRUD methods are the only way
//! to mutate the change log.

use crate::{
    id::{IdGenerator, UuidIds},
    merge, BaseDataset, Category, ChangeLog, ChangeTarget, EffectiveDataset, Fields, Record,
    RecordId, Revision,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of applying a CRUD mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// Category that was touched
    pub category: Category,
    /// The record id affected
    pub record_id: RecordId,
    /// Which change-log overlay absorbed the mutation
    pub target: ChangeTarget,
    /// Store revision after the mutation
    pub revision: Revision,
}

/// The main store holding all state.
#[derive(Debug)]
pub struct Store {
    /// Immutable baseline
    base: BaseDataset,
    /// User edits
    changes: ChangeLog,
    /// Cached merge of the two, shared with readers
    effective: Arc<EffectiveDataset>,
    /// Fresh ids for `add`
    ids: Box<dyn IdGenerator>,
    /// Bumped on every change to base or change log
    revision: Revision,
}

impl Store {
    /// Create a store over `base` with an empty change log and UUID ids.
    pub fn new(base: BaseDataset) -> Self {
        Self::with_id_generator(base, Box::new(UuidIds))
    }

    /// Create a store with a custom id generator.
    pub fn with_id_generator(base: BaseDataset, ids: Box<dyn IdGenerator>) -> Self {
        let changes = ChangeLog::new();
        let effective = Arc::new(merge::merge(&base, &changes));
        Self {
            base,
            changes,
            effective,
            ids,
            revision: 0,
        }
    }

    pub fn base(&self) -> &BaseDataset {
        &self.base
    }

    pub fn changes(&self) -> &ChangeLog {
        &self.changes
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// The current effective dataset.
    pub fn effective(&self) -> &EffectiveDataset {
        &self.effective
    }

    /// A shared handle to the current effective dataset. Cheap to clone and
    /// unaffected by later mutations.
    pub fn effective_shared(&self) -> Arc<EffectiveDataset> {
        Arc::clone(&self.effective)
    }

    /// Effective records of a category.
    pub fn get_by_category(&self, category: &str) -> &[Record] {
        self.effective.get(category)
    }

    /// Add a record. The generated id overrides any `id` in `fields`.
    pub fn add(&mut self, category: &str, fields: Fields) -> ApplyResult {
        let id = self.fresh_id(category);
        self.changes.add(category, Record::new(id.clone(), fields));
        self.finish(category, id, ChangeTarget::Added)
    }

    /// Apply a partial update to a record.
    pub fn update(&mut self, category: &str, id: &str, partial: Fields) -> ApplyResult {
        let target = self.changes.update(category, id, partial);
        self.finish(category, id.to_string(), target)
    }

    /// Delete a record.
    pub fn delete(&mut self, category: &str, id: &str) -> ApplyResult {
        let target = self.changes.delete(category, id);
        self.finish(category, id.to_string(), target)
    }

    /// Replace the whole change log (restore from cache, remote or backup).
    pub fn replace_changes(&mut self, changes: ChangeLog) -> Revision {
        self.changes = changes;
        self.refresh()
    }

    /// Swap in a new base dataset. The change log is kept as-is.
    pub fn replace_base(&mut self, base: BaseDataset) -> Revision {
        self.base = base;
        self.refresh()
    }

    /// Drop every user edit.
    pub fn clear_changes(&mut self) -> Revision {
        self.replace_changes(ChangeLog::new())
    }

    fn fresh_id(&mut self, category: &str) -> RecordId {
        loop {
            let id = self.ids.next_id();
            // a tombstoned id stays taken even after the base record is gone
            let taken = self.base.get(category).iter().any(|r| r.has_id(&id))
                || self.changes.is_added(category, &id)
                || self.changes.is_deleted(category, &id);
            if !taken {
                return id;
            }
        }
    }

    /// Re-merge only the mutated category; the others are shared unchanged.
    fn finish(&mut self, category: &str, record_id: RecordId, target: ChangeTarget) -> ApplyResult {
        let records = (self.base.contains_category(category) || self.changes.touches(category))
            .then(|| merge::merge_category(&self.base, &self.changes, category));
        self.effective = Arc::new(self.effective.with_category(category, records));
        let revision = self.bump();
        ApplyResult {
            category: category.to_string(),
            record_id,
            target,
            revision,
        }
    }

    fn refresh(&mut self) -> Revision {
        self.effective = Arc::new(merge::merge(&self.base, &self.changes));
        self.bump()
    }

    fn bump(&mut self) -> Revision {
        self.revision += 1;
        self.revision
    }
}
