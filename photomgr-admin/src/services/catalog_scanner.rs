//! Default catalog builder: re-derive the catalog from the local media tree
//!
//! Media lives at `<images>/<year>/<filename>`. A rebuild scans that tree,
//! merges it with the persisted catalog, uploads newly discovered originals
//! and persists the result through the manifest store.

use super::manifest_store::ManifestStore;
use super::rebuild::{CatalogBuilder, RebuildSink};
use crate::remote::SharedObjectStore;
use async_trait::async_trait;
use photomgr_common::catalog::keys;
use photomgr_common::{Catalog, Error, KeyLayout, PhotoRecord, Result, YearAlbum};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Extensions treated as media during a scan
pub const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "heic", "tif", "tiff"];

/// Cache hint of uploaded originals
const MEDIA_CACHE_CONTROL: &str = "public, max-age=86400";

/// Image re-encode pipeline
///
/// `None` means the file should not be uploaded.
#[async_trait]
pub trait MediaCompressor: Send + Sync {
    async fn compress(&self, path: &Path) -> Result<Option<(Vec<u8>, String)>>;
}

/// Uploads originals as-is
pub struct NoCompression;

#[async_trait]
impl MediaCompressor for NoCompression {
    async fn compress(&self, path: &Path) -> Result<Option<(Vec<u8>, String)>> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Some((bytes, content_type_for(path).to_string())))
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// One media file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub year: String,
    pub filename: String,
    pub path: PathBuf,
}

/// Enumerate `<root>/<year>/<file>` media, ordered by year descending then filename
pub fn scan_media(root: &Path) -> Vec<MediaFile> {
    let mut found = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(2)
        .max_depth(2)
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error accessing entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_media(entry.path()) {
            continue;
        }

        let year = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        let filename = entry.file_name().to_str();
        if let (Some(year), Some(filename)) = (year, filename) {
            found.push(MediaFile {
                year: year.to_string(),
                filename: filename.to_string(),
                path: entry.path().to_path_buf(),
            });
        } else {
            warn!(path = %entry.path().display(), "Skipping non UTF-8 media path");
        }
    }

    found.sort_by(|a, b| b.year.cmp(&a.year).then_with(|| a.filename.cmp(&b.filename)));
    found
}

fn is_media(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MEDIA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Result of merging a scan into the current catalog
#[derive(Debug)]
pub struct MergeOutcome {
    pub catalog: Catalog,
    pub kept: usize,
    pub added: Vec<MediaFile>,
    pub dropped: Vec<String>,
    /// Same filename found under more than one year; first one wins
    pub duplicates: Vec<MediaFile>,
}

/// Merge scanned media into `current`
///
/// Existing records keep every field (moved to the album of the year they
/// were found under). Records without a file are dropped. New files get a
/// fresh record.
pub fn merge(current: &Catalog, media: &[MediaFile], layout: &KeyLayout) -> MergeOutcome {
    let mut existing: HashMap<&str, &PhotoRecord> = HashMap::new();
    for record in current.records() {
        existing.entry(record.filename()).or_insert(record);
    }
    let album_extras: HashMap<&str, &Map<String, Value>> = current
        .albums
        .iter()
        .map(|a| (a.year.as_str(), &a.extra))
        .collect();

    let mut by_year: BTreeMap<String, Vec<PhotoRecord>> = BTreeMap::new();
    let mut seen = HashSet::new();
    let mut kept = 0;
    let mut added = Vec::new();
    let mut duplicates = Vec::new();

    for file in media {
        if !seen.insert(file.filename.as_str()) {
            duplicates.push(file.clone());
            continue;
        }

        let record = match existing.get(file.filename.as_str()) {
            Some(record) => {
                kept += 1;
                let mut record = (*record).clone();
                if record.year() != Some(file.year.as_str()) {
                    record.set_year(&file.year);
                }
                record
            }
            None => {
                added.push(file.clone());
                new_record(file, layout)
            }
        };
        by_year.entry(file.year.clone()).or_default().push(record);
    }

    let dropped = current
        .records()
        .map(|r| r.filename())
        .filter(|f| !seen.contains(f))
        .map(str::to_string)
        .collect();

    let albums = by_year
        .into_iter()
        .rev()
        .map(|(year, mut photos)| {
            photos.sort_by(|a, b| a.filename().cmp(b.filename()));
            let mut album = YearAlbum::new(year);
            if let Some(extra) = album_extras.get(album.year.as_str()) {
                album.extra = (*extra).clone();
            }
            album.photos = photos;
            album
        })
        .collect();

    MergeOutcome {
        catalog: Catalog::new(albums),
        kept,
        added,
        dropped,
        duplicates,
    }
}

fn new_record(file: &MediaFile, layout: &KeyLayout) -> PhotoRecord {
    let mut record = PhotoRecord::new(&file.filename, &file.year);
    if let Some(url) = layout.public_url(&layout.original_key(&file.filename)) {
        record.set_field(keys::PATH, Value::String(url));
    }
    if let Some(url) = layout.public_url(&layout.thumbnail_key(&file.filename)) {
        record.set_field(keys::THUMBNAIL, Value::String(url));
    }
    record
}

pub struct ScanningCatalogBuilder {
    images_root: PathBuf,
    store: Arc<ManifestStore>,
    layout: KeyLayout,
    object_store: SharedObjectStore,
    compressor: Arc<dyn MediaCompressor>,
}

impl ScanningCatalogBuilder {
    pub fn new(
        images_root: PathBuf,
        store: Arc<ManifestStore>,
        layout: KeyLayout,
        object_store: SharedObjectStore,
    ) -> Self {
        Self {
            images_root,
            store,
            layout,
            object_store,
            compressor: Arc::new(NoCompression),
        }
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn MediaCompressor>) -> Self {
        self.compressor = compressor;
        self
    }

    async fn current_catalog(&self, sink: &RebuildSink) -> Result<Catalog> {
        match self.store.read_catalog().await {
            Ok(catalog) => Ok(catalog),
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                sink.log("No existing manifest, starting from an empty catalog")
                    .await;
                Ok(Catalog::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Upload new originals; returns the number of failures
    async fn upload_new(&self, added: &[MediaFile], sink: &RebuildSink) -> usize {
        let Some(store) = &self.object_store else {
            if !added.is_empty() {
                sink.log("Object store not configured, skipping media upload")
                    .await;
            }
            return 0;
        };

        let mut failures = 0;
        for (i, file) in added.iter().enumerate() {
            let key = self.layout.original_key(&file.filename);
            let result = match self.compressor.compress(&file.path).await {
                Ok(Some((bytes, content_type))) => store
                    .put(&key, bytes, &content_type, MEDIA_CACHE_CONTROL)
                    .await
                    .map(|()| true),
                Ok(None) => Ok(false),
                Err(e) => Err(e),
            };

            match result {
                Ok(true) => sink.log(format!("Uploaded {}", key)).await,
                Ok(false) => sink.log(format!("Skipped upload of {}", file.filename)).await,
                Err(e) => {
                    failures += 1;
                    error!(key = %key, error = %e, "Failed to upload media");
                    sink.log(format!("Failed to upload {}: {}", key, e)).await;
                }
            }

            let percent = 40 + (50 * (i + 1) / added.len()) as u8;
            sink.progress(percent, format!("Uploading media ({}/{})", i + 1, added.len()))
                .await;
        }
        failures
    }
}

#[async_trait]
impl CatalogBuilder for ScanningCatalogBuilder {
    async fn rebuild(&self, sink: RebuildSink) -> Result<()> {
        sink.progress(20, "Scanning media...").await;
        sink.log(format!("Scanning {}", self.images_root.display()))
            .await;

        let root = self.images_root.clone();
        let media = tokio::task::spawn_blocking(move || scan_media(&root))
            .await
            .map_err(|e| Error::Internal(format!("media scan task: {}", e)))?;
        sink.log(format!("Found {} media files", media.len())).await;

        let current = self.current_catalog(&sink).await?;
        let outcome = merge(&current, &media, &self.layout);

        for filename in &outcome.dropped {
            sink.log(format!("Dropped {} (file no longer present)", filename))
                .await;
        }
        for file in &outcome.duplicates {
            warn!(filename = %file.filename, year = %file.year, "Duplicate filename, skipping");
            sink.log(format!(
                "Skipped duplicate {} under {}",
                file.filename, file.year
            ))
            .await;
        }
        sink.log(format!(
            "Catalog merged: {} kept, {} new, {} dropped",
            outcome.kept,
            outcome.added.len(),
            outcome.dropped.len()
        ))
        .await;
        sink.progress(40, "Uploading media...").await;

        let failures = self.upload_new(&outcome.added, &sink).await;
        if failures > 0 {
            sink.log(format!("{} media uploads failed", failures)).await;
        }

        sink.progress(95, "Writing manifest...").await;
        let report = self.store.persist(&outcome.catalog).await?;
        sink.log(format!(
            "Manifest written with {} photos in {} albums",
            outcome.catalog.record_count(),
            outcome.catalog.albums.len()
        ))
        .await;
        sink.log(format!(
            "Propagation: object store {:?}, cache {:?}",
            report.object_store, report.cache
        ))
        .await;

        info!(
            records = outcome.catalog.record_count(),
            added = outcome.added.len(),
            dropped = outcome.dropped.len(),
            "Catalog rebuilt from media"
        );
        Ok(())
    }
}
