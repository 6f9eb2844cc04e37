//! Base dataset provider: bundled defaults overlaid with remote chunks.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::remote::RemoteStore;
use futures::future::join_all;
use masterdata_engine::{parse_chunk, BaseDataset, Category, ChangeLog, Record};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a startup fetch produced.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Bundled defaults with remote chunks applied where they were fetched
    pub base: BaseDataset,
    /// The remote change log, if the row exists and parses
    pub changes: Option<ChangeLog>,
    /// Whether the change log fetch succeeded (a missing row counts as success)
    pub changes_fetched: bool,
    /// Whether the base chunk query succeeded
    pub base_fetched: bool,
}

impl LoadOutcome {
    /// True when both fetches succeeded.
    pub fn is_complete(&self) -> bool {
        self.changes_fetched && self.base_fetched
    }
}

/// Result of publishing one category chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub category: Category,
    pub key: String,
    pub record_count: usize,
    /// `None` on success
    pub error: Option<String>,
}

impl PublishOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct BaseDatasetProvider {
    bundled: Arc<BaseDataset>,
    remote: Arc<dyn RemoteStore>,
    changes_key: String,
    base_prefix: String,
}

impl BaseDatasetProvider {
    pub fn new(bundled: BaseDataset, remote: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        Self {
            bundled: Arc::new(bundled),
            remote,
            changes_key: config.changes_key.clone(),
            base_prefix: config.base_prefix.clone(),
        }
    }

    pub fn bundled(&self) -> &BaseDataset {
        &self.bundled
    }

    pub fn base_prefix(&self) -> &str {
        &self.base_prefix
    }

    /// Fetch the remote change log and base chunks in parallel.
    ///
    /// Never fails: each fetch falls back independently and the outcome
    /// records which ones succeeded.
    pub async fn load(&self) -> LoadOutcome {
        let (changes, chunks) = tokio::join!(
            self.remote.get(&self.changes_key),
            self.remote.query_prefix(&self.base_prefix),
        );

        let (changes, changes_fetched) = match changes {
            Ok(Some(value)) => match ChangeLog::from_value(value) {
                Ok(log) => (Some(log), true),
                Err(e) => {
                    warn!(key = %self.changes_key, error = %e, "Remote change log is unreadable, keeping local copy");
                    (None, false)
                }
            },
            Ok(None) => {
                debug!(key = %self.changes_key, "No remote change log yet");
                (None, true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch remote change log, using cached copy");
                (None, false)
            }
        };

        let (base, base_fetched) = match chunks {
            Ok(rows) => {
                let chunks = self.parse_chunks(rows);
                info!(categories = chunks.len(), "Loaded remote base chunks");
                (self.bundled.with_remote_chunks(chunks), true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch remote base dataset, using bundled defaults");
                (self.bundled.as_ref().clone(), false)
            }
        };

        LoadOutcome {
            base,
            changes,
            changes_fetched,
            base_fetched,
        }
    }

    fn parse_chunks(&self, rows: Vec<(String, serde_json::Value)>) -> Vec<(Category, Vec<Record>)> {
        rows.into_iter()
            .filter_map(|(key, value)| {
                let category = key.strip_prefix(&self.base_prefix)?;
                if category.is_empty() {
                    warn!(%key, "Skipping base chunk without a category");
                    return None;
                }
                match parse_chunk(value) {
                    Ok(records) => Some((category.to_string(), records)),
                    Err(e) => {
                        warn!(%key, error = %e, "Skipping malformed base chunk");
                        None
                    }
                }
            })
            .collect()
    }

    /// Upload every category of `base` as its own chunk, concurrently.
    pub async fn publish(&self, base: &BaseDataset) -> Vec<PublishOutcome> {
        let uploads = base.iter().map(|(category, records)| {
            let key = format!("{}{}", self.base_prefix, category);
            async move {
                let error = match self.upload(&key, records).await {
                    Ok(()) => None,
                    Err(e) => {
                        warn!(%key, error = %e, "Failed to publish base chunk");
                        Some(e.to_string())
                    }
                };
                PublishOutcome {
                    category: category.clone(),
                    key,
                    record_count: records.len(),
                    error,
                }
            }
        });

        let outcomes = join_all(uploads).await;
        info!(
            published = outcomes.iter().filter(|o| o.is_ok()).count(),
            failed = outcomes.iter().filter(|o| !o.is_ok()).count(),
            "Published base dataset"
        );
        outcomes
    }

    async fn upload(&self, key: &str, records: &[Record]) -> Result<()> {
        let value = serde_json::to_value(records)?;
        self.remote.upsert(key, value).await
    }
}
