//! photomgr-admin library interface
//!
//! Exposes the services and the router for the binary and for integration
//! tests.

pub mod api;
pub mod config;
pub mod error;
pub mod remote;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, HeaderValue};
use axum::Router;
use chrono::{DateTime, Utc};
use services::{
    CatalogBuilder, DeletionCoordinator, ManifestStore, PhotoService, RebuildManager,
    RemotePropagator, ScanningCatalogBuilder,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Cache hint for locally served media
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub photos: Arc<PhotoService>,
    pub rebuild: Arc<RebuildManager>,
    /// Root of the `<year>/<filename>` media tree
    pub images_root: PathBuf,
    /// Admin UI assets, served as the router fallback
    pub static_assets: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        photos: Arc<PhotoService>,
        rebuild: Arc<RebuildManager>,
        images_root: PathBuf,
        static_assets: Option<PathBuf>,
    ) -> Self {
        Self {
            photos,
            rebuild,
            images_root,
            static_assets,
            startup_time: Utc::now(),
        }
    }

    /// Wire all services from resolved configuration
    pub fn from_config(config: &config::AdminConfig) -> Self {
        let object_store = config.build_object_store();
        let kv_cache = config.build_kv_cache();

        let propagator = RemotePropagator::new(
            object_store.clone(),
            kv_cache,
            config.layout.clone(),
            config.cache_ttl(),
        );
        let store = Arc::new(ManifestStore::new(&config.manifest_path, propagator));

        let deletion = DeletionCoordinator::new(
            object_store.clone(),
            config.layout.clone(),
            config.images_root.clone(),
        );
        let photos = Arc::new(PhotoService::new(Arc::clone(&store), deletion));

        let builder: Arc<dyn CatalogBuilder> = Arc::new(ScanningCatalogBuilder::new(
            config.images_root.clone(),
            store,
            config.layout.clone(),
            object_store,
        ));
        let rebuild = Arc::new(RebuildManager::new(builder));

        Self::new(
            photos,
            rebuild,
            config.images_root.clone(),
            config.static_assets.clone(),
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let images = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(IMAGE_CACHE_CONTROL),
        ))
        .service(ServeDir::new(&state.images_root));

    let mut router = Router::new()
        .merge(api::photo_routes())
        .merge(api::rebuild_routes())
        .merge(api::health_routes())
        .nest_service("/api/images", images);

    if let Some(assets) = &state.static_assets {
        router = router.fallback_service(ServeDir::new(assets));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
