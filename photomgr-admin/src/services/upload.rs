//! Upload intake: place an uploaded file under `<images>/<year>/`
//!
//! The file only becomes part of the catalog on the next rebuild.

use chrono::{Datelike, Utc};
use photomgr_common::{Error, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredUpload {
    pub year: String,
    pub filename: String,
}

/// Reject names that could escape the year directory
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(Error::InvalidInput("filename is empty".to_string()));
    }
    if filename.contains('/') || filename.contains('\\') {
        return Err(Error::InvalidInput(format!(
            "filename must not contain path separators: {}",
            filename
        )));
    }
    let single_normal = matches!(
        Path::new(filename).components().collect::<Vec<_>>().as_slice(),
        [Component::Normal(_)]
    );
    if filename.contains("..") || !single_normal {
        return Err(Error::InvalidInput(format!("invalid filename: {}", filename)));
    }
    Ok(())
}

/// Year a file belongs to: `DSC_YYYY...` prefix, else the current year
pub fn infer_year(filename: &str) -> String {
    filename
        .strip_prefix("DSC_")
        .and_then(|rest| rest.get(..4))
        .filter(|digits| digits.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().year().to_string())
}

/// Write `bytes` to `<images_root>/<year>/<filename>`
pub async fn store_upload(images_root: &Path, filename: &str, bytes: &[u8]) -> Result<StoredUpload> {
    validate_filename(filename)?;
    let year = infer_year(filename);

    let dir: PathBuf = images_root.join(&year);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes).await?;

    info!(
        path = %path.display(),
        bytes = bytes.len(),
        year = %year,
        "Upload stored"
    );
    Ok(StoredUpload {
        year,
        filename: filename.to_string(),
    })
}
