//! Record id generation.

use crate::RecordId;
use std::fmt::Debug;

/// Source of fresh record ids for `add`.
pub trait IdGenerator: Debug + Send + Sync {
    /// Produce the next id. Implementations should not repeat themselves;
    /// the store still skips ids already present in the target category.
    fn next_id(&mut self) -> RecordId;
}

/// Random v4 UUIDs. The default generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> RecordId {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Monotonic `<prefix><n>` ids, starting at 1. Handy for fixtures and
/// deterministic tests.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> RecordId {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
