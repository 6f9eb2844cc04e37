//! Merge engine: base dataset + change log -> effective dataset.
//!
//! # Algorithm
//!
//! For every category mentioned by the base dataset or by any overlay:
//!
//! 1. Start from the base records (empty if the category is absent)
//! 2. Drop records whose id carries a tombstone
//! 3. Shallow-merge the partial overlay into matching records, in place
//! 4. Append the added records, in insertion order
//!
//! The merge is pure and deterministic. After a single mutation the store
//! only re-runs [`merge_category`] for the touched category.

use crate::{BaseDataset, Category, ChangeLog, EffectiveDataset, Record};
use std::collections::BTreeMap;

/// Merge every category of `base` and `changes`.
pub fn merge(base: &BaseDataset, changes: &ChangeLog) -> EffectiveDataset {
    let mut categories: BTreeMap<Category, Vec<Record>> = BTreeMap::new();

    for category in base.categories() {
        categories.insert(category.clone(), merge_category(base, changes, category));
    }
    for category in changes.categories() {
        if !categories.contains_key(category) {
            categories.insert(category.clone(), merge_category(base, changes, category));
        }
    }

    EffectiveDataset::from_categories(categories)
}

/// Merge a single category.
pub fn merge_category(base: &BaseDataset, changes: &ChangeLog, category: &str) -> Vec<Record> {
    let deleted = changes.deleted(category);
    let updated = changes.updated(category);
    let is_deleted = |record: &Record| {
        matches!((deleted, record.id()), (Some(ids), Some(id)) if ids.contains(id))
    };

    let base_records = base.get(category);
    let added = changes.added(category);
    let mut merged = Vec::with_capacity(base_records.len() + added.len());

    for record in base_records.iter().filter(|r| !is_deleted(r)) {
        let partial = match (updated, record.id()) {
            (Some(overlays), Some(id)) => overlays.get(id),
            _ => None,
        };
        match partial {
            Some(partial) => merged.push(record.merged_with(partial)),
            None => merged.push(record.clone()),
        }
    }

    merged.extend(added.iter().filter(|r| !is_deleted(r)).cloned());
    merged
}
