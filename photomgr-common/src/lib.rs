//! # photomgr common library
//!
//! Shared code for the photo catalog services:
//! - Catalog model (year albums and photo records) and its manifest codec
//! - Record mutator (find / update / delete by filename)
//! - Remote key layout for the object store and cache tiers
//! - Bootstrap configuration loading
//! - SSE helpers

pub mod catalog;
pub mod config;
pub mod error;
pub mod layout;
pub mod mutator;
pub mod sse;

pub use catalog::{Catalog, PhotoRecord, YearAlbum};
pub use error::{Error, Result};
pub use layout::KeyLayout;
pub use mutator::RecordPatch;
