//! Remote key layout
//!
//! Naming contract shared by the manifest propagator, the deletion cleanup and
//! the catalog scanner:
//! - manifest: `<base>photos.json`
//! - original: `<base><original><filename>`
//! - thumbnail: `<base><thumbnail><stem><thumbnail_ext>`

use serde::Deserialize;
use std::path::Path;

/// Cache tier key holding the serialized manifest
pub const MANIFEST_CACHE_KEY: &str = "cache:photos:jsonValue";

/// Object name of the manifest below the base prefix
pub const MANIFEST_OBJECT_NAME: &str = "photos.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyLayout {
    pub base_prefix: String,
    pub original_prefix: String,
    pub thumbnail_prefix: String,
    /// Extension of generated thumbnails, dot included
    pub thumbnail_ext: String,
    /// Public URL under which object keys are served, if any
    pub public_base_url: Option<String>,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self {
            base_prefix: String::new(),
            original_prefix: "original/".to_string(),
            thumbnail_prefix: "thumbnail/".to_string(),
            thumbnail_ext: ".webp".to_string(),
            public_base_url: None,
        }
    }
}

impl KeyLayout {
    pub fn manifest_key(&self) -> String {
        format!("{}{}", self.base_prefix, MANIFEST_OBJECT_NAME)
    }

    pub fn original_key(&self, filename: &str) -> String {
        format!("{}{}{}", self.base_prefix, self.original_prefix, filename)
    }

    /// Thumbnail key: filename with its extension replaced by `thumbnail_ext`
    pub fn thumbnail_key(&self, filename: &str) -> String {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        format!(
            "{}{}{}{}",
            self.base_prefix, self.thumbnail_prefix, stem, self.thumbnail_ext
        )
    }

    /// Public URL of an object key, when a public base URL is configured
    pub fn public_url(&self, key: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), key))
    }
}
