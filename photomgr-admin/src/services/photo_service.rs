//! Record edit operations: single update, batch update, delete

use super::deletion::{CleanupReport, DeletionCoordinator};
use super::manifest_store::ManifestStore;
use photomgr_common::mutator::{delete_record, update_record, RecordPatch};
use photomgr_common::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a batch update; failures are per filename
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub updated: usize,
    pub failed: Vec<(String, String)>,
}

pub struct PhotoService {
    store: Arc<ManifestStore>,
    deletion: DeletionCoordinator,
}

impl PhotoService {
    pub fn new(store: Arc<ManifestStore>, deletion: DeletionCoordinator) -> Self {
        Self { store, deletion }
    }

    pub fn store(&self) -> &Arc<ManifestStore> {
        &self.store
    }

    /// Raw persisted manifest
    pub async fn manifest(&self) -> Result<Vec<u8>> {
        self.store.read_all().await
    }

    /// Patch one record and persist
    pub async fn update(&self, filename: &str, patch: &RecordPatch) -> Result<()> {
        self.store
            .mutate(|catalog| update_record(catalog, filename, patch))
            .await?;
        info!(filename = %filename, "Photo metadata updated");
        Ok(())
    }

    /// Apply the same patch to many records
    ///
    /// Each filename is its own exclusive section; a failing item is logged
    /// and does not stop the others.
    pub async fn batch_update(&self, filenames: &[String], patch: &RecordPatch) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for filename in filenames {
            match self.update(filename, patch).await {
                Ok(()) => outcome.updated += 1,
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Batch update failed for photo");
                    outcome.failed.push((filename.clone(), e.to_string()));
                }
            }
        }

        info!(
            updated = outcome.updated,
            failed = outcome.failed.len(),
            "Batch update finished"
        );
        outcome
    }

    /// Drop a record from the catalog, then clean up its media
    ///
    /// Only the catalog write can fail the call; cleanup is best-effort.
    pub async fn delete(&self, filename: &str) -> Result<CleanupReport> {
        let removed = self
            .store
            .mutate(|catalog| delete_record(catalog, filename))
            .await?;
        info!(filename = %filename, "Photo removed from manifest");

        Ok(self.deletion.cleanup(&removed).await)
    }
}
