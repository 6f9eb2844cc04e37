//! Database module for PostgreSQL persistence.

mod entries;
mod pool;

pub use entries::*;
pub use pool::*;
