//! Remote tier clients
//!
//! The object store and the key-value cache are secondary tiers: they mirror
//! the local manifest and media, and every call against them is best-effort.
//! Components hold them as `Option<Arc<dyn ...>>`; `None` means the tier is
//! not configured.

use async_trait::async_trait;
use photomgr_common::Result;
use std::sync::Arc;
use std::time::Duration;

pub mod kv;
pub mod r2;

pub use kv::CloudflareKv;
pub use r2::R2ObjectStore;

/// Object store tier (S3-compatible bucket)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` under `key` with the given content type and
    /// `Cache-Control` hint
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()>;

    /// Delete all `keys` in one logical call
    async fn delete(&self, keys: &[String]) -> Result<()>;

    /// Fetch an object, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Key-value cache tier (edge cache with expiring entries)
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

pub type SharedObjectStore = Option<Arc<dyn ObjectStore>>;
pub type SharedKvCache = Option<Arc<dyn KvCache>>;
