//! Record mutator: find / update / delete photo records by filename
//!
//! Both operations work on an owned catalog copy handed in by the manifest
//! store; neither touches storage.

use crate::catalog::{keys, Catalog, PhotoRecord};
use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Partial update of a photo record
///
/// Each field is doubly optional: the outer `None` means "not supplied, leave
/// untouched", `Some(None)` means "supplied as null, clear the field" and
/// `Some(Some(v))` overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordPatch {
    #[serde(default, deserialize_with = "supplied")]
    pub alt: Option<Option<String>>,

    #[serde(default, deserialize_with = "supplied")]
    pub is_hidden: Option<Option<bool>>,

    #[serde(rename = "Subject", default, deserialize_with = "supplied")]
    pub subject: Option<Option<Vec<String>>>,
}

/// Marks a key as present, whatever its value (including null)
fn supplied<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl RecordPatch {
    pub fn hidden(is_hidden: bool) -> Self {
        Self {
            is_hidden: Some(Some(is_hidden)),
            ..Self::default()
        }
    }

    /// True when no field was supplied
    pub fn is_empty(&self) -> bool {
        self.alt.is_none() && self.is_hidden.is_none() && self.subject.is_none()
    }

    /// Overwrite exactly the supplied fields of `record`
    pub fn apply_to(&self, record: &mut PhotoRecord) {
        if let Some(alt) = &self.alt {
            record.set_field(keys::ALT, Value::from(alt.clone()));
        }
        if let Some(is_hidden) = self.is_hidden {
            record.set_field(keys::IS_HIDDEN, Value::from(is_hidden));
        }
        if let Some(subject) = &self.subject {
            record.set_field(keys::SUBJECT, Value::from(subject.clone()));
        }
    }
}

/// Apply `patch` to the first record named `filename`
///
/// Fails with `NotFound` when no record in the whole catalog has that name;
/// the catalog is left untouched in that case.
pub fn update_record(catalog: &mut Catalog, filename: &str, patch: &RecordPatch) -> Result<()> {
    let (album, index) = catalog
        .position(filename)
        .ok_or_else(|| Error::NotFound(format!("photo not found: {}", filename)))?;

    patch.apply_to(&mut catalog.albums[album].photos[index]);
    Ok(())
}

/// Remove the first record named `filename` and hand it back
///
/// The remaining records of the album keep their order; an album left empty is
/// retained.
pub fn delete_record(catalog: &mut Catalog, filename: &str) -> Result<PhotoRecord> {
    let (album, index) = catalog
        .position(filename)
        .ok_or_else(|| Error::NotFound(format!("photo not found: {}", filename)))?;

    Ok(catalog.albums[album].photos.remove(index))
}
