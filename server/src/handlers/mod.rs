//! Request handlers for the key-value store.

mod kv;

pub use kv::*;
