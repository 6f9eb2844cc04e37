use super::RemoteStore;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Deserialize)]
struct EntryBody {
    key: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct EntriesBody {
    entries: Vec<EntryBody>,
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    value: &'a Value,
}

/// Client for the `masterdata-server` key-value API.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpRemoteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRemoteStore")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(client: Client, base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// `<base>/kv` or `<base>/kv/<key>` with the key percent-encoded as one segment.
    fn kv_url(&self, key: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().push("kv");
            if let Some(key) = key {
                segments.push(key);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Remote(format!("{} returned {}: {}", what, status, body)))
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let url = self.kv_url(Some(key))?;
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let entry: EntryBody = Self::check(response, "GET").await?.json().await?;
        tracing::debug!(key = %entry.key, "Fetched remote row");
        Ok(Some(entry.value))
    }

    async fn upsert(&self, key: &str, value: Value) -> Result<()> {
        let url = self.kv_url(Some(key))?;
        let response = self
            .authorize(self.client.put(url))
            .json(&UpsertBody { value: &value })
            .send()
            .await?;
        Self::check(response, "PUT").await?;
        Ok(())
    }

    async fn query_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        let mut url = self.kv_url(None)?;
        url.query_pairs_mut().append_pair("prefix", prefix);
        let response = self.authorize(self.client.get(url)).send().await?;
        let body: EntriesBody = Self::check(response, "GET").await?.json().await?;
        Ok(body
            .entries
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect())
    }
}
