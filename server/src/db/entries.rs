//! Database operations for the master_data table.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// A stored key-value row.
#[derive(Debug)]
pub struct StoredEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredEntry {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredEntry {
            key: row.try_get("key")?,
            value: row.try_get("value")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Fetch one row by key.
pub async fn get_entry(pool: &PgPool, key: &str) -> Result<Option<StoredEntry>, sqlx::Error> {
    sqlx::query_as::<_, StoredEntry>(
        r#"
        SELECT key, value, updated_at
        FROM master_data
        WHERE key = $1
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await
}

/// Insert or overwrite a row, returning its new timestamp.
pub async fn upsert_entry(
    pool: &PgPool,
    key: &str,
    value: &serde_json::Value,
) -> Result<DateTime<Utc>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO master_data (key, value, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (key) DO UPDATE SET
            value = EXCLUDED.value,
            updated_at = EXCLUDED.updated_at
        RETURNING updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .fetch_one(pool)
    .await?;

    row.try_get("updated_at")
}

/// All rows whose key starts with `prefix`, ordered by key.
///
/// The prefix is compared literally, so `%` and `_` carry no wildcard meaning.
pub async fn entries_with_prefix(
    pool: &PgPool,
    prefix: &str,
) -> Result<Vec<StoredEntry>, sqlx::Error> {
    sqlx::query_as::<_, StoredEntry>(
        r#"
        SELECT key, value, updated_at
        FROM master_data
        WHERE left(key, length($1::text)) = $1::text
        ORDER BY key ASC
        "#,
    )
    .bind(prefix)
    .fetch_all(pool)
    .await
}
