//! Key-value handlers: whole-value reads, upserts and prefix listings.

use crate::db;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Longest key accepted on writes.
pub const MAX_KEY_LEN: usize = 512;

/// One stored row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl From<db::StoredEntry> for EntryResponse {
    fn from(entry: db::StoredEntry) -> Self {
        Self {
            key: entry.key,
            value: entry.value,
            updated_at: entry.updated_at,
        }
    }
}

/// Body of `PUT /kv/{key}`.
#[derive(Debug, Deserialize)]
pub struct PutRequest {
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutResponse {
    pub key: String,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for `GET /kv`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Literal key prefix; absent lists every row
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub entries: Vec<EntryResponse>,
}

pub async fn handle_get(pool: &PgPool, key: &str) -> Result<EntryResponse> {
    db::get_entry(pool, key)
        .await?
        .map(EntryResponse::from)
        .ok_or_else(|| AppError::NotFound(key.to_string()))
}

pub async fn handle_put(pool: &PgPool, key: &str, request: PutRequest) -> Result<PutResponse> {
    validate_key(key)?;
    let updated_at = db::upsert_entry(pool, key, &request.value).await?;
    tracing::debug!(%key, "Upserted entry");
    Ok(PutResponse {
        key: key.to_string(),
        updated_at,
    })
}

pub async fn handle_list(pool: &PgPool, query: ListQuery) -> Result<ListResponse> {
    let prefix = query.prefix.unwrap_or_default();
    let entries = db::entries_with_prefix(pool, &prefix).await?;
    tracing::debug!(%prefix, count = entries.len(), "Listed entries");
    Ok(ListResponse {
        entries: entries.into_iter().map(EntryResponse::from).collect(),
    })
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(AppError::BadRequest("key must not be blank".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(AppError::BadRequest(format!(
            "key exceeds {} bytes",
            MAX_KEY_LEN
        )));
    }
    Ok(())
}
