//! photomgr-admin - Photo catalog admin server
//!
//! Serves the admin API over the photo manifest: record edits, deletes,
//! uploads and background catalog rebuilds. The local manifest is
//! authoritative; the object store and the KV cache are mirrored on every
//! write when configured.

use anyhow::{Context, Result};
use clap::Parser;
use photomgr_admin::config::{AdminConfig, Cli};
use photomgr_admin::{build_router, AppState};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used until the config file has been read
const BOOTSTRAP_FILTER: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter_handle = init_tracing();

    info!(
        "Starting photomgr-admin v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = AdminConfig::resolve(&cli).context("Failed to resolve configuration")?;
    apply_log_level(&filter_handle, &config.log_level);

    info!("Root folder: {}", config.root_folder.display());
    info!("Manifest: {}", config.manifest_path.display());
    info!("Images: {}", config.images_root.display());
    if !config.manifest_path.exists() {
        warn!(
            path = %config.manifest_path.display(),
            "Manifest not found; run a rebuild to create it"
        );
    }

    let addr = config
        .socket_addr()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, config.port))?;

    let state = AppState::from_config(&config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` wins; otherwise start at `info` until the config is known
fn init_tracing() -> Option<reload::Handle<EnvFilter, Registry>> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
        return None;
    }

    let (filter, handle) = reload::Layer::new(EnvFilter::new(BOOTSTRAP_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    Some(handle)
}

fn apply_log_level(handle: &Option<reload::Handle<EnvFilter, Registry>>, level: &str) {
    let Some(handle) = handle else {
        return;
    };

    let directives = format!(
        "photomgr_admin={0},photomgr_common={0},tower_http={0}",
        level
    );
    match EnvFilter::try_new(&directives) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                warn!("Failed to apply log level {}: {}", level, e);
            }
        }
        Err(e) => warn!("Invalid log level '{}' in config: {}", level, e),
    }
}
