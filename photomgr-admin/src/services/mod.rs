//! Core services of the admin server

pub mod catalog_scanner;
pub mod deletion;
pub mod manifest_store;
pub mod photo_service;
pub mod propagator;
pub mod rebuild;
pub mod upload;

pub use catalog_scanner::{MediaCompressor, NoCompression, ScanningCatalogBuilder};
pub use deletion::{CleanupReport, CleanupStep, DeletionCoordinator};
pub use manifest_store::ManifestStore;
pub use photo_service::{BatchOutcome, PhotoService};
pub use propagator::{PropagationReport, RemotePropagator, TierOutcome};
pub use rebuild::{
    CatalogBuilder, RebuildEvent, RebuildManager, RebuildMessage, RebuildSink, RebuildStatus,
    RebuildTask, StartOutcome,
};
pub use upload::{store_upload, StoredUpload};
