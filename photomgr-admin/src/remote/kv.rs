//! Cloudflare Workers KV client (REST API)

use super::KvCache;
use async_trait::async_trait;
use photomgr_common::config::KvCacheConfig;
use photomgr_common::{Error, Result};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// Workers KV namespace accessed through the Cloudflare v4 API
pub struct CloudflareKv {
    client: reqwest::Client,
    /// `.../accounts/{account}/storage/kv/namespaces/{namespace}/values`
    values_url: Url,
    api_token: String,
}

impl CloudflareKv {
    pub fn new(config: &KvCacheConfig) -> Result<Self> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "KV cache settings incomplete, missing: {}",
                missing.join(", ")
            )));
        }

        let account_id = config.account_id.as_deref().unwrap_or_default();
        let namespace_id = config.namespace_id.as_deref().unwrap_or_default();
        let values_url = Url::parse(&format!(
            "{}/accounts/{}/storage/kv/namespaces/{}/values",
            config.api_base_url.trim_end_matches('/'),
            account_id,
            namespace_id
        ))
        .map_err(|e| Error::Config(format!("KV api_base_url: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("KV http client: {}", e)))?;

        Ok(Self {
            client,
            values_url,
            api_token: config.api_token.clone().unwrap_or_default(),
        })
    }

    /// URL of one value, with the key percent-encoded as a single segment
    fn value_url(&self, key: &str) -> Result<Url> {
        let mut url = self.values_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Internal("KV base URL cannot hold a path".to_string()))?
            .push(key);
        Ok(url)
    }
}

async fn failure(key: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Error::Remote(format!("KV[{}] returned {}: {}", key, status, body))
}

#[async_trait]
impl KvCache for CloudflareKv {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let response = self
            .client
            .put(self.value_url(key)?)
            .query(&[("expiration_ttl", ttl.as_secs())])
            .bearer_auth(&self.api_token)
            .body(value)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("KV[{}] request failed: {}", key, e)))?;

        if !response.status().is_success() {
            return Err(failure(key, response).await);
        }

        debug!(key = %key, ttl_secs = ttl.as_secs(), "KV value stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(self.value_url(key)?)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("KV[{}] request failed: {}", key, e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| Error::Remote(format!("KV[{}] body: {}", key, e)))?;
                Ok(Some(bytes.to_vec()))
            }
            _ => Err(failure(key, response).await),
        }
    }
}
