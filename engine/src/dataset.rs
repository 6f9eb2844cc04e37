//! Base and effective datasets.
//!
//! A [`BaseDataset`] is the immutable baseline catalog: bundled with the
//! application or assembled from remote per-category chunks. An
//! [`EffectiveDataset`] is what modules actually read; it is only ever
//! produced by [`crate::merge`].

use crate::{
    error::{json_kind, Result},
    Category, Error, Record,
};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Categories that always exist in the bundled dataset, even when empty.
pub const DEFAULT_CATEGORIES: [&str; 2] = ["SUPPLIERS", "PURCHASE_ORDERS"];

/// Baseline records per category, in their original order.
///
/// Uses BTreeMap so serialization order is deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseDataset {
    categories: BTreeMap<Category, Vec<Record>>,
}

impl BaseDataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a whole category.
    pub fn with_category(mut self, category: impl Into<Category>, records: Vec<Record>) -> Self {
        self.categories.insert(category.into(), records);
        self
    }

    /// Make sure each named category exists, leaving existing ones alone.
    pub fn ensure_categories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Category>,
    {
        for name in names {
            self.categories.entry(name.into()).or_default();
        }
        self
    }

    /// Records of a category, or an empty slice if the category is absent.
    pub fn get(&self, category: &str) -> &[Record] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, &Vec<Record>)> {
        self.categories.iter()
    }

    /// Total number of records across all categories.
    pub fn record_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Produce a new dataset where every category present in `chunks`
    /// replaces this dataset's entry wholesale. Categories absent from
    /// `chunks` keep their current records.
    pub fn with_remote_chunks<I>(&self, chunks: I) -> Self
    where
        I: IntoIterator<Item = (Category, Vec<Record>)>,
    {
        let mut categories = self.categories.clone();
        for (category, records) in chunks {
            categories.insert(category, records);
        }
        Self { categories }
    }

    /// Parse a dataset from a JSON object of `category -> [record]`.
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidDataset(format!(
                    "expected an object of categories, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut categories = BTreeMap::new();
        for (category, records) in map {
            let records = parse_chunk(records)
                .map_err(|e| Error::InvalidDataset(format!("category '{category}': {e}")))?;
            categories.insert(category, records);
        }
        Ok(Self { categories })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidDataset(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl FromIterator<(Category, Vec<Record>)> for BaseDataset {
    fn from_iter<T: IntoIterator<Item = (Category, Vec<Record>)>>(iter: T) -> Self {
        Self {
            categories: iter.into_iter().collect(),
        }
    }
}

/// Parse a single category chunk: a JSON array of record objects.
pub fn parse_chunk(value: Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(items) => items.into_iter().map(Record::from_value).collect(),
        other => Err(Error::InvalidDataset(format!(
            "expected an array of records, got {}",
            json_kind(&other)
        ))),
    }
}

/// The merged, read-only view of base data plus user changes.
///
/// Categories are shared behind `Arc`, so re-merging one category after a
/// mutation leaves the others untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectiveDataset {
    categories: BTreeMap<Category, Arc<Vec<Record>>>,
}

impl EffectiveDataset {
    pub(crate) fn from_categories(categories: BTreeMap<Category, Vec<Record>>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|(category, records)| (category, Arc::new(records)))
                .collect(),
        }
    }

    /// Copy of this view with one category replaced, or dropped on `None`.
    pub(crate) fn with_category(&self, category: &str, records: Option<Vec<Record>>) -> Self {
        let mut categories = self.categories.clone();
        match records {
            Some(records) => {
                categories.insert(category.to_string(), Arc::new(records));
            }
            None => {
                categories.remove(category);
            }
        }
        Self { categories }
    }

    /// Records of a category, or an empty slice if the category is unknown.
    pub fn get(&self, category: &str) -> &[Record] {
        self.categories
            .get(category)
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }

    /// Look up one record by id.
    pub fn find(&self, category: &str, id: &str) -> Option<&Record> {
        self.get(category).iter().find(|r| r.has_id(id))
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, &Vec<Record>)> {
        self.categories
            .iter()
            .map(|(category, records)| (category, &**records))
    }

    pub fn record_count(&self) -> usize {
        self.categories.values().map(|records| records.len()).sum()
    }
}

impl Serialize for EffectiveDataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, records) in self.iter() {
            map.serialize_entry(category, records)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn missing_category_is_empty() {
        let base = BaseDataset::new();
        assert!(base.get("SUPPLIERS").is_empty());
        assert!(!base.contains_category("SUPPLIERS"));
    }

    #[test]
    fn ensure_categories_keeps_existing() {
        let base = BaseDataset::new()
            .with_category("SUPPLIERS", vec![record(json!({"id": "S1"}))])
            .ensure_categories(DEFAULT_CATEGORIES);

        assert_eq!(base.get("SUPPLIERS").len(), 1);
        assert!(base.contains_category("PURCHASE_ORDERS"));
        assert!(base.get("PURCHASE_ORDERS").is_empty());
    }

    #[test]
    fn remote_chunks_replace_whole_categories() {
        let bundled = BaseDataset::new()
            .with_category(
                "SUPPLIERS",
                vec![
                    record(json!({"id": "S1", "name": "Acme"})),
                    record(json!({"id": "S2", "name": "Initech"})),
                ],
            )
            .with_category("RAW_MATERIALS", vec![record(json!({"id": "RM1"}))]);

        let remote = bundled.with_remote_chunks(vec![(
            "SUPPLIERS".to_string(),
            vec![record(json!({"id": "S1", "city": "Pune"}))],
        )]);

        // no field-level merge with the bundled entry
        assert_eq!(remote.get("SUPPLIERS"), &[record(json!({"id": "S1", "city": "Pune"}))]);
        assert_eq!(remote.get("RAW_MATERIALS").len(), 1);
        // bundled dataset is untouched
        assert_eq!(bundled.get("SUPPLIERS").len(), 2);
    }

    #[test]
    fn parse_dataset_json() {
        let base = BaseDataset::from_json(
            r#"{"SUPPLIERS": [{"id": "S1", "name": "Acme"}], "PACKING": []}"#,
        )
        .unwrap();
        assert_eq!(base.record_count(), 1);
        assert!(base.contains_category("PACKING"));

        let json = base.to_json().unwrap();
        assert_eq!(BaseDataset::from_json(&json).unwrap(), base);
    }

    #[test]
    fn reject_malformed_dataset() {
        assert!(matches!(
            BaseDataset::from_json("[1, 2]"),
            Err(Error::InvalidDataset(_))
        ));
        assert!(matches!(
            BaseDataset::from_json(r#"{"SUPPLIERS": {"id": "S1"}}"#),
            Err(Error::InvalidDataset(_))
        ));
        assert!(matches!(
            BaseDataset::from_json(r#"{"SUPPLIERS": ["S1"]}"#),
            Err(Error::InvalidDataset(_))
        ));
    }

    #[test]
    fn parse_chunk_requires_array() {
        assert_eq!(parse_chunk(json!([])).unwrap(), Vec::<Record>::new());
        assert!(parse_chunk(json!({"id": "S1"})).is_err());
    }

    #[test]
    fn effective_dataset_serializes_as_category_map() {
        let effective = EffectiveDataset::from_categories(BTreeMap::from([(
            "SUPPLIERS".to_string(),
            vec![record(json!({"id": "S1", "name": "Acme"}))],
        )]))
        .with_category("PACKING", Some(Vec::new()));

        assert_eq!(
            serde_json::to_value(&effective).unwrap(),
            json!({"PACKING": [], "SUPPLIERS": [{"id": "S1", "name": "Acme"}]})
        );
        assert_eq!(effective.with_category("PACKING", None).record_count(), 1);
    }
}
