//! Manifest store: sole owner of the local manifest file
//!
//! Readers share a read lock; a mutation holds the write lock for the whole
//! read → decode → mutate → encode → write → propagate cycle, so a caller never
//! observes a half-applied edit and two edits never interleave.

use super::propagator::{PropagationReport, RemotePropagator};
use photomgr_common::{Catalog, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

pub struct ManifestStore {
    path: PathBuf,
    lock: RwLock<()>,
    propagator: RemotePropagator,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>, propagator: RemotePropagator) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
            propagator,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw manifest bytes, read under the shared lock
    pub async fn read_all(&self) -> Result<Vec<u8>> {
        let _guard = self.lock.read().await;
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Decoded copy of the catalog
    pub async fn read_catalog(&self) -> Result<Catalog> {
        let bytes = self.read_all().await?;
        Catalog::decode(&bytes)
    }

    /// Apply `mutation` to the catalog as one exclusive section
    ///
    /// If `mutation` fails nothing is written. Remote propagation runs inline
    /// before the lock is released; its failures are logged only.
    pub async fn mutate<T, F>(&self, mutation: F) -> Result<T>
    where
        F: FnOnce(&mut Catalog) -> Result<T>,
    {
        let _guard = self.lock.write().await;

        let bytes = tokio::fs::read(&self.path).await?;
        let mut catalog = Catalog::decode(&bytes)?;
        let value = mutation(&mut catalog)?;

        self.write_locked(&catalog).await?;
        Ok(value)
    }

    /// Replace the whole catalog
    pub async fn persist(&self, catalog: &Catalog) -> Result<PropagationReport> {
        let _guard = self.lock.write().await;
        self.write_locked(catalog).await
    }

    /// Caller must hold the write lock
    async fn write_locked(&self, catalog: &Catalog) -> Result<PropagationReport> {
        let bytes = catalog.encode()?;
        write_atomic(&self.path, &bytes).await?;
        debug!(
            path = %self.path.display(),
            records = catalog.record_count(),
            "Manifest written"
        );

        Ok(self.propagator.propagate(&bytes).await)
    }
}

/// Write to `<path>.tmp` then rename over `path`
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}
