//! Record types for master data.

use crate::{
    error::{json_kind, Result},
    Error, RecordId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A bag of fields: the input to `add` and the shape of a partial update.
pub type Fields = serde_json::Map<String, Value>;

/// Name of the one field every record is expected to carry.
pub const ID_FIELD: &str = "id";

/// A master-data record: a JSON object with a string `id`.
///
/// Records are not validated. A record without a string `id` is kept as-is
/// and flows through the merge untouched, but no update or tombstone can
/// ever address it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Fields);

impl Record {
    /// Build a record from `fields`, forcing its id to `id`.
    pub fn new(id: impl Into<RecordId>, mut fields: Fields) -> Self {
        fields.insert(ID_FIELD.to_string(), Value::String(id.into()));
        Self(fields)
    }

    /// Wrap an existing field map without touching it.
    pub fn from_fields(fields: Fields) -> Self {
        Self(fields)
    }

    /// Convert a JSON value into a record. Only objects are accepted.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(Error::InvalidRecord(json_kind(&other).to_string())),
        }
    }

    /// The record id, if present and a string.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Whether this record is addressed by `id`.
    pub fn has_id(&self, id: &str) -> bool {
        self.id() == Some(id)
    }

    /// Get a single field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// All fields, including `id`.
    pub fn fields(&self) -> &Fields {
        &self.0
    }

    pub fn into_fields(self) -> Fields {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Shallow-merge `partial` into this record. Partial fields win, except
    /// `id`, which is never rewritten by an update.
    pub fn apply_partial(&mut self, partial: &Fields) {
        for (key, value) in partial {
            if key == ID_FIELD {
                continue;
            }
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Non-mutating variant of [`Record::apply_partial`].
    pub fn merged_with(&self, partial: &Fields) -> Self {
        let mut merged = self.clone();
        merged.apply_partial(partial);
        merged
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

/// Convert a JSON value into a field map. Only objects are accepted.
pub fn fields_from_value(value: Value) -> Result<Fields> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::InvalidFields(json_kind(&other).to_string())),
    }
}
