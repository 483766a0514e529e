//! Cleanup of derived artifacts after a record leaves the catalog
//!
//! Runs after the manifest write has committed. Each step is independent:
//! a failing remote delete never prevents the local delete, and nothing here
//! rolls back the catalog. Dangling objects are logged for manual cleanup.

use crate::remote::SharedObjectStore;
use photomgr_common::{KeyLayout, PhotoRecord};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Outcome of one cleanup step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStep {
    /// Step not applicable (tier absent, year unknown)
    Skipped,
    Done,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Object keys the remote delete was asked to remove
    pub remote_keys: Vec<String>,
    pub remote: CleanupStep,
    /// Local media path considered for removal
    pub local_path: Option<PathBuf>,
    pub local: CleanupStep,
}

pub struct DeletionCoordinator {
    object_store: SharedObjectStore,
    layout: KeyLayout,
    images_root: PathBuf,
}

impl DeletionCoordinator {
    pub fn new(object_store: SharedObjectStore, layout: KeyLayout, images_root: PathBuf) -> Self {
        Self {
            object_store,
            layout,
            images_root,
        }
    }

    /// Remove the remote original/thumbnail and the local file of `record`
    pub async fn cleanup(&self, record: &PhotoRecord) -> CleanupReport {
        let filename = record.filename();

        let remote_keys = vec![
            self.layout.original_key(filename),
            self.layout.thumbnail_key(filename),
        ];
        let remote = self.delete_remote(filename, &remote_keys).await;

        let (local_path, local) = match record.year() {
            Some(year) => {
                let path = self.images_root.join(year).join(filename);
                let step = delete_local(&path).await;
                (Some(path), step)
            }
            None => {
                warn!(filename = %filename, "Photo year unknown, skipping local delete");
                (None, CleanupStep::Skipped)
            }
        };

        CleanupReport {
            remote_keys,
            remote,
            local_path,
            local,
        }
    }

    async fn delete_remote(&self, filename: &str, keys: &[String]) -> CleanupStep {
        let Some(store) = &self.object_store else {
            return CleanupStep::Skipped;
        };

        info!(filename = %filename, "Deleting objects from object store");
        match store.delete(keys).await {
            Ok(()) => {
                info!(filename = %filename, keys = ?keys, "✓ Deleted objects from object store");
                CleanupStep::Done
            }
            Err(e) => {
                error!(
                    filename = %filename,
                    keys = ?keys,
                    error = %e,
                    "Failed to delete objects from object store"
                );
                CleanupStep::Failed(e.to_string())
            }
        }
    }
}

async fn delete_local(path: &Path) -> CleanupStep {
    info!(path = %path.display(), "Deleting local file");
    match tokio::fs::remove_file(path).await {
        Ok(()) => CleanupStep::Done,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to delete local file");
            CleanupStep::Failed(e.to_string())
        }
    }
}
