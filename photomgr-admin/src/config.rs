//! Admin server configuration
//!
//! Resolves command-line flags, environment and the TOML bootstrap file into
//! one [`AdminConfig`], and builds the remote tier clients it describes.

use crate::remote::{CloudflareKv, R2ObjectStore, SharedKvCache, SharedObjectStore};
use clap::Parser;
use photomgr_common::config::{self, KvCacheConfig, ObjectStoreConfig, TomlConfig};
use photomgr_common::{KeyLayout, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3002;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_MANIFEST_FILE: &str = "photos.json";
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Command-line arguments
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "photomgr-admin", version, about = "Photo catalog admin server")]
pub struct Cli {
    /// Root folder holding the manifest and media
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP port
    #[arg(long)]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long)]
    pub bind: Option<String>,
}

/// Fully resolved server settings
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub manifest_path: PathBuf,
    pub images_root: PathBuf,
    pub static_assets: Option<PathBuf>,
    pub log_level: String,
    pub layout: KeyLayout,
    pub object_store: Option<ObjectStoreConfig>,
    pub kv_cache: Option<KvCacheConfig>,
}

impl AdminConfig {
    /// Resolve settings: CLI flags win over the environment, which wins over TOML
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config_path = config::resolve_config_path(cli.config.as_deref());
        let mut toml = config::load_or_default(config_path.as_deref());
        toml.apply_env_overrides();
        Self::from_parts(cli, toml)
    }

    pub fn from_parts(cli: &Cli, toml: TomlConfig) -> Result<Self> {
        let root_folder = config::resolve_root_folder(cli.root.as_deref(), &toml)?;

        let manifest_path = under_root(
            &root_folder,
            toml.manifest_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_FILE)),
        );
        let images_root = under_root(
            &root_folder,
            toml.images_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGES_DIR)),
        );
        let static_assets = toml.static_assets.map(|p| under_root(&root_folder, p));

        let layout = toml
            .object_store
            .as_ref()
            .map(|s| s.layout.clone())
            .unwrap_or_default();

        Ok(Self {
            bind_address: cli
                .bind
                .clone()
                .or(toml.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: cli.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            manifest_path,
            images_root,
            static_assets,
            log_level: toml.logging.level,
            layout,
            object_store: toml.object_store,
            kv_cache: toml.kv_cache,
            root_folder,
        })
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind_address, self.port).parse()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.kv_cache
            .as_ref()
            .map(|c| Duration::from_secs(c.ttl_seconds))
            .unwrap_or(crate::services::propagator::DEFAULT_CACHE_TTL)
    }

    /// Object store client, or `None` when unconfigured or incomplete
    pub fn build_object_store(&self) -> SharedObjectStore {
        let settings = self.object_store.as_ref()?;
        let missing = settings.missing_fields();
        if !missing.is_empty() {
            warn!(
                missing = ?missing,
                "Object store settings incomplete, remote media and manifest mirror disabled"
            );
            return None;
        }

        match R2ObjectStore::new(settings) {
            Ok(store) => {
                info!(
                    bucket = settings.bucket.as_deref().unwrap_or_default(),
                    "Object store client initialized"
                );
                Some(Arc::new(store))
            }
            Err(e) => {
                warn!(error = %e, "Object store client unavailable");
                None
            }
        }
    }

    /// KV cache client, or `None` when unconfigured or incomplete
    pub fn build_kv_cache(&self) -> SharedKvCache {
        let settings = self.kv_cache.as_ref()?;
        match CloudflareKv::new(settings) {
            Ok(kv) => {
                info!("KV cache client initialized");
                Some(Arc::new(kv))
            }
            Err(e) => {
                warn!(error = %e, "KV cache disabled");
                None
            }
        }
    }
}

fn under_root(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
