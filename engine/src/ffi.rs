//! FFI layer for UI shells written in other languages.
//!
//! This module provides C-compatible functions over an opaque [`Store`]
//! pointer. All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `masterdata_*` functions are allocated by Rust
//! - Caller must free them with `masterdata_string_free`
//! - Store pointers must be freed with `masterdata_store_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{record::fields_from_value, BaseDataset, ChangeLog, Fields, Store};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `masterdata_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // String contained null bytes
        Err(_) => CString::from(c"{\"error\":\"string contained null bytes\"}").into_raw(),
    }
}

fn ok_json<T: serde::Serialize>(value: T) -> *mut c_char {
    to_c_string(FfiResult::ok(value).to_json())
}

fn err_json(message: impl Into<String>) -> *mut c_char {
    to_c_string(
        FfiResult::<()>::Err {
            error: message.into(),
        }
        .to_json(),
    )
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Parse a C string holding a JSON object into a field map.
unsafe fn fields_from_c_string(ptr: *const c_char) -> Result<Fields, String> {
    let json = from_c_string(ptr).ok_or_else(|| "invalid fields JSON".to_string())?;
    let value: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| format!("parse error: {}", e))?;
    fields_from_value(value).map_err(|e| e.to_string())
}

// ============================================================================
// Store Lifecycle
// ============================================================================

/// Create a new store over a base dataset.
///
/// # Arguments
/// - `base_json`: JSON object of `category -> [record]`
///
/// # Returns
/// Pointer to Store, or null on failure.
///
/// # Safety
/// - `base_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `masterdata_store_free`
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_new(base_json: *const c_char) -> *mut Store {
    let base_str = match from_c_string(base_json) {
        Some(s) => s,
        None => return ptr::null_mut(),
    };

    let base = match BaseDataset::from_json(&base_str) {
        Ok(b) => b,
        Err(_) => return ptr::null_mut(),
    };

    Box::into_raw(Box::new(Store::new(base)))
}

/// Free a store.
///
/// # Safety
/// - `store` must be a valid pointer from `masterdata_store_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_free(store: *mut Store) {
    if !store.is_null() {
        drop(Box::from_raw(store));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `masterdata_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn masterdata_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Category CRUD
// ============================================================================

/// Effective records of a category.
///
/// # Returns
/// JSON string: `{"ok": [Record, ...]}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `masterdata_store_new` or null
/// - `category` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `masterdata_string_free`
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_get_by_category(
    store: *const Store,
    category: *const c_char,
) -> *mut c_char {
    let store = match store.as_ref() {
        Some(s) => s,
        None => return err_json("null store pointer"),
    };

    let category = match from_c_string(category) {
        Some(s) => s,
        None => return err_json("invalid category"),
    };

    ok_json(store.get_by_category(&category))
}

/// Add a record to a category.
///
/// # Arguments
/// - `fields_json`: JSON object of the new record's fields
///
/// # Returns
/// JSON string: `{"ok": ApplyResult}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `masterdata_store_new` or null
/// - `category` and `fields_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `masterdata_string_free`
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_add(
    store: *mut Store,
    category: *const c_char,
    fields_json: *const c_char,
) -> *mut c_char {
    let store = match store.as_mut() {
        Some(s) => s,
        None => return err_json("null store pointer"),
    };

    let category = match from_c_string(category) {
        Some(s) => s,
        None => return err_json("invalid category"),
    };

    let fields = match fields_from_c_string(fields_json) {
        Ok(f) => f,
        Err(e) => return err_json(e),
    };

    ok_json(store.add(&category, fields))
}

/// Apply a partial update to a record.
///
/// # Returns
/// JSON string: `{"ok": ApplyResult}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `masterdata_store_new` or null
/// - `category`, `id` and `partial_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `masterdata_string_free`
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_update(
    store: *mut Store,
    category: *const c_char,
    id: *const c_char,
    partial_json: *const c_char,
) -> *mut c_char {
    let store = match store.as_mut() {
        Some(s) => s,
        None => return err_json("null store pointer"),
    };

    let category = match from_c_string(category) {
        Some(s) => s,
        None => return err_json("invalid category"),
    };

    let id = match from_c_string(id) {
        Some(s) => s,
        None => return err_json("invalid id"),
    };

    let partial = match fields_from_c_string(partial_json) {
        Ok(f) => f,
        Err(e) => return err_json(e),
    };

    ok_json(store.update(&category, &id, partial))
}

/// Delete a record.
///
/// # Returns
/// JSON string: `{"ok": ApplyResult}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `masterdata_store_new` or null
/// - `category` and `id` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `masterdata_string_free`
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_delete(
    store: *mut Store,
    category: *const c_char,
    id: *const c_char,
) -> *mut c_char {
    let store = match store.as_mut() {
        Some(s) => s,
        None => return err_json("null store pointer"),
    };

    let category = match from_c_string(category) {
        Some(s) => s,
        None => return err_json("invalid category"),
    };

    let id = match from_c_string(id) {
        Some(s) => s,
        None => return err_json("invalid id"),
    };

    ok_json(store.delete(&category, &id))
}

/// Current store revision, or -1 for a null pointer.
///
/// # Safety
/// - `store` must be a valid pointer from `masterdata_store_new` or null
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_revision(store: *const Store) -> i64 {
    match store.as_ref() {
        Some(s) => s.revision() as i64,
        None => -1,
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Export the change log for persistence by the host.
///
/// # Returns
/// JSON string: `{"ok": ChangeLog}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `masterdata_store_new` or null
/// - Caller must free the returned string with `masterdata_string_free`
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_export_changes(store: *const Store) -> *mut c_char {
    match store.as_ref() {
        Some(s) => ok_json(s.changes()),
        None => err_json("null store pointer"),
    }
}

/// Replace the change log wholesale.
///
/// # Returns
/// JSON string: `{"ok": revision}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `masterdata_store_new` or null
/// - `changes_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `masterdata_string_free`
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_import_changes(
    store: *mut Store,
    changes_json: *const c_char,
) -> *mut c_char {
    let store = match store.as_mut() {
        Some(s) => s,
        None => return err_json("null store pointer"),
    };

    let changes_str = match from_c_string(changes_json) {
        Some(s) => s,
        None => return err_json("invalid change log JSON"),
    };

    match ChangeLog::from_json(&changes_str) {
        Ok(changes) => ok_json(store.replace_changes(changes)),
        Err(e) => err_json(e.to_string()),
    }
}

/// Swap in a new base dataset.
///
/// # Returns
/// JSON string: `{"ok": revision}` or `{"error": "message"}`
///
/// # Safety
/// - `store` must be a valid pointer from `masterdata_store_new` or null
/// - `base_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `masterdata_string_free`
#[no_mangle]
pub unsafe extern "C" fn masterdata_store_replace_base(
    store: *mut Store,
    base_json: *const c_char,
) -> *mut c_char {
    let store = match store.as_mut() {
        Some(s) => s,
        None => return err_json("null store pointer"),
    };

    let base_str = match from_c_string(base_json) {
        Some(s) => s,
        None => return err_json("invalid dataset JSON"),
    };

    match BaseDataset::from_json(&base_str) {
        Ok(base) => ok_json(store.replace_base(base)),
        Err(e) => err_json(e.to_string()),
    }
}

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn masterdata_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the backup format version.
#[no_mangle]
pub extern "C" fn masterdata_backup_format_version() -> u32 {
    crate::BACKUP_FORMAT_VERSION
}
