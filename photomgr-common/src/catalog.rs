//! Photo catalog model and manifest codec
//!
//! The manifest is a JSON array of year albums, each holding an ordered list of
//! photo records. Records are kept as ordered JSON objects so that fields this
//! crate does not know about (dimensions, dates, public URLs, ...) survive a
//! read-modify-write cycle in their original position.

use crate::{Error, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Field names with a meaning to the catalog services
pub mod keys {
    pub const FILENAME: &str = "filename";
    pub const YEAR: &str = "year";
    pub const ALT: &str = "alt";
    pub const IS_HIDDEN: &str = "is_hidden";
    pub const SUBJECT: &str = "Subject";
    pub const PATH: &str = "path";
    pub const THUMBNAIL: &str = "thumbnail";
}

/// One media item in the catalog
///
/// `filename` is the catalog-wide unique key. All other fields are optional and
/// stored as-is.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct PhotoRecord {
    fields: Map<String, Value>,
}

impl PhotoRecord {
    /// Create a fresh record for a newly discovered media file
    pub fn new(filename: impl Into<String>, year: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(keys::FILENAME.to_string(), Value::String(filename.into()));
        fields.insert(keys::YEAR.to_string(), Value::String(year.into()));
        fields.insert(keys::ALT.to_string(), Value::String(String::new()));
        fields.insert(keys::IS_HIDDEN.to_string(), Value::Bool(false));
        Self { fields }
    }

    pub fn filename(&self) -> &str {
        self.fields
            .get(keys::FILENAME)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Album year, `None` when absent or empty
    pub fn year(&self) -> Option<&str> {
        self.fields
            .get(keys::YEAR)
            .and_then(Value::as_str)
            .filter(|y| !y.trim().is_empty())
    }

    pub fn alt(&self) -> Option<&str> {
        self.fields.get(keys::ALT).and_then(Value::as_str)
    }

    pub fn is_hidden(&self) -> bool {
        self.fields
            .get(keys::IS_HIDDEN)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Subject tags in stored order
    pub fn subject(&self) -> Vec<String> {
        match self.fields.get(keys::SUBJECT) {
            Some(Value::Array(tags)) => tags
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Raw access to any field, known or not
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Overwrite a field in place, appending it when not yet present
    pub fn set_field(&mut self, key: &str, value: Value) {
        match self.fields.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                self.fields.insert(key.to_string(), value);
            }
        }
    }

    pub fn set_year(&mut self, year: &str) {
        self.set_field(keys::YEAR, Value::String(year.to_string()));
    }
}

impl TryFrom<Map<String, Value>> for PhotoRecord {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        match fields.get(keys::FILENAME) {
            Some(Value::String(name)) if !name.is_empty() => Ok(Self { fields }),
            Some(_) => Err("photo record has a non-string or empty filename".to_string()),
            None => Err("photo record is missing its filename".to_string()),
        }
    }
}

impl Serialize for PhotoRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// A year label plus its ordered records
///
/// Encodes as `year`, `photos`, then any extra album keys in their original
/// order, whatever order the keys were read in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearAlbum {
    pub year: String,
    #[serde(default)]
    pub photos: Vec<PhotoRecord>,
    /// Album-level fields carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl YearAlbum {
    pub fn new(year: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            photos: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// The whole catalog: a sequence of year albums in persisted order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub albums: Vec<YearAlbum>,
}

impl Catalog {
    pub fn new(albums: Vec<YearAlbum>) -> Self {
        Self { albums }
    }

    /// Decode manifest bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Encode deterministically: insertion-ordered keys, 2-space indentation
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Internal(format!("Failed to encode manifest: {}", e)))
    }

    /// Position (album index, record index) of the first record with `filename`
    ///
    /// Albums are scanned in order, then records in order; the scan stops at
    /// the first match.
    pub fn position(&self, filename: &str) -> Option<(usize, usize)> {
        self.albums.iter().enumerate().find_map(|(a, album)| {
            album
                .photos
                .iter()
                .position(|p| p.filename() == filename)
                .map(|r| (a, r))
        })
    }

    pub fn find(&self, filename: &str) -> Option<&PhotoRecord> {
        self.position(filename)
            .map(|(a, r)| &self.albums[a].photos[r])
    }

    pub fn records(&self) -> impl Iterator<Item = &PhotoRecord> {
        self.albums.iter().flat_map(|a| a.photos.iter())
    }

    pub fn record_count(&self) -> usize {
        self.albums.iter().map(|a| a.photos.len()).sum()
    }
}
