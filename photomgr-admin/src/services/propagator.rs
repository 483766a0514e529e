//! Remote propagation of the persisted manifest
//!
//! After every successful local write the manifest bytes are pushed to the
//! object store (never cached by intermediaries) and to the key-value cache
//! (expiring copy for edge readers). The two pushes run concurrently and fail
//! independently; nothing here is ever reported back to the caller as an
//! error.

use crate::remote::{SharedKvCache, SharedObjectStore};
use photomgr_common::layout::MANIFEST_CACHE_KEY;
use photomgr_common::KeyLayout;
use std::time::Duration;
use tracing::{error, info};

/// Content type of the manifest object
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";
/// Cache hint of the manifest object
pub const MANIFEST_CACHE_CONTROL: &str = "no-cache";
/// Default expiry of the cached manifest copy
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Outcome of pushing to one secondary tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    /// Tier not configured
    Skipped,
    Stored,
    Failed(String),
}

/// Per-tier outcome of one propagation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationReport {
    pub object_store: TierOutcome,
    pub cache: TierOutcome,
}

pub struct RemotePropagator {
    object_store: SharedObjectStore,
    cache: SharedKvCache,
    layout: KeyLayout,
    cache_ttl: Duration,
}

impl RemotePropagator {
    pub fn new(
        object_store: SharedObjectStore,
        cache: SharedKvCache,
        layout: KeyLayout,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            object_store,
            cache,
            layout,
            cache_ttl,
        }
    }

    /// Propagator with no remote tiers, for local-only operation
    pub fn disabled() -> Self {
        Self::new(None, None, KeyLayout::default(), DEFAULT_CACHE_TTL)
    }

    /// Push manifest bytes to both tiers, logging every failure
    pub async fn propagate(&self, manifest: &[u8]) -> PropagationReport {
        let (object_store, cache) =
            tokio::join!(self.push_object(manifest), self.push_cache(manifest));
        PropagationReport {
            object_store,
            cache,
        }
    }

    async fn push_object(&self, manifest: &[u8]) -> TierOutcome {
        let Some(store) = &self.object_store else {
            return TierOutcome::Skipped;
        };

        let key = self.layout.manifest_key();
        match store
            .put(
                &key,
                manifest.to_vec(),
                MANIFEST_CONTENT_TYPE,
                MANIFEST_CACHE_CONTROL,
            )
            .await
        {
            Ok(()) => {
                info!(key = %key, "✓ Uploaded manifest to object store");
                TierOutcome::Stored
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to upload manifest to object store");
                TierOutcome::Failed(e.to_string())
            }
        }
    }

    async fn push_cache(&self, manifest: &[u8]) -> TierOutcome {
        let Some(cache) = &self.cache else {
            return TierOutcome::Skipped;
        };

        match cache
            .put(MANIFEST_CACHE_KEY, manifest.to_vec(), self.cache_ttl)
            .await
        {
            Ok(()) => {
                info!(key = MANIFEST_CACHE_KEY, "✓ Stored manifest in KV cache");
                TierOutcome::Stored
            }
            Err(e) => {
                error!(key = MANIFEST_CACHE_KEY, error = %e, "Failed to store manifest in KV cache");
                TierOutcome::Failed(e.to_string())
            }
        }
    }
}
