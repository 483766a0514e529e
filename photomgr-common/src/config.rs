//! Bootstrap configuration loading and root folder resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing or malformed TOML file never stops startup: the caller logs a
//! warning and continues with defaults.

use crate::layout::KeyLayout;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ENV_ROOT: &str = "PHOTOMGR_ROOT";
/// Environment variable overriding the config file location
pub const ENV_CONFIG: &str = "PHOTOMGR_CONFIG";

pub const ENV_R2_ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
pub const ENV_R2_ENDPOINT: &str = "R2_ENDPOINT";
pub const ENV_R2_BUCKET: &str = "R2_BUCKET";
pub const ENV_R2_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
pub const ENV_R2_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
pub const ENV_R2_BASE_PREFIX: &str = "R2_BASE_PREFIX";
pub const ENV_CF_ACCOUNT_ID: &str = "CF_ACCOUNT_ID";
pub const ENV_CF_API_TOKEN: &str = "CF_API_TOKEN";
pub const ENV_CF_KV_NAMESPACE_ID: &str = "CF_KV_DATABASE_ID";

/// Bootstrap configuration loaded from TOML
///
/// Read once at startup; the process must restart to pick up changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Project root holding the manifest and the media tree
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port (default 3002)
    #[serde(default)]
    pub port: Option<u16>,

    /// Listen address (default 127.0.0.1)
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Manifest path, relative to the root folder (default `photos.json`)
    #[serde(default)]
    pub manifest_file: Option<PathBuf>,

    /// Media tree, relative to the root folder (default `images`)
    #[serde(default)]
    pub images_dir: Option<PathBuf>,

    /// Admin UI assets directory (optional)
    #[serde(default)]
    pub static_assets: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// S3-compatible object store tier (optional)
    #[serde(default)]
    pub object_store: Option<ObjectStoreConfig>,

    /// Key-value cache tier (optional)
    #[serde(default)]
    pub kv_cache: Option<KvCacheConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Object store tier settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectStoreConfig {
    /// Explicit endpoint URL; derived from `account_id` when absent
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(flatten)]
    pub layout: KeyLayout,
}

fn default_region() -> String {
    "auto".to_string()
}

impl ObjectStoreConfig {
    /// Endpoint URL, explicit or derived from the account id
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| {
            self.account_id
                .as_ref()
                .map(|id| format!("https://{}.r2.cloudflarestorage.com", id))
        })
    }

    /// Names of settings still missing for a usable tier
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.endpoint_url().is_none() {
            missing.push("endpoint/account_id");
        }
        if is_blank(&self.bucket) {
            missing.push("bucket");
        }
        if is_blank(&self.access_key_id) {
            missing.push("access_key_id");
        }
        if is_blank(&self.secret_access_key) {
            missing.push("secret_access_key");
        }
        missing
    }
}

/// Key-value cache tier settings
#[derive(Debug, Clone, Deserialize)]
pub struct KvCacheConfig {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub namespace_id: Option<String>,
    #[serde(default = "default_kv_api_base")]
    pub api_base_url: String,
    /// Expiry of cached manifest copies (default 24 hours)
    #[serde(default = "default_kv_ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for KvCacheConfig {
    fn default() -> Self {
        Self {
            account_id: None,
            api_token: None,
            namespace_id: None,
            api_base_url: default_kv_api_base(),
            ttl_seconds: default_kv_ttl(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_kv_api_base() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_kv_ttl() -> u64 {
    86_400
}

fn default_request_timeout() -> u64 {
    30
}

impl KvCacheConfig {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.account_id) {
            missing.push("account_id");
        }
        if is_blank(&self.api_token) {
            missing.push("api_token");
        }
        if is_blank(&self.namespace_id) {
            missing.push("namespace_id");
        }
        missing
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl TomlConfig {
    /// Overlay remote tier credentials from the environment
    ///
    /// A tier section is created when any of its variables is set.
    pub fn apply_env_overrides(&mut self) {
        let r2 = [
            ENV_R2_ACCOUNT_ID,
            ENV_R2_ENDPOINT,
            ENV_R2_BUCKET,
            ENV_R2_ACCESS_KEY_ID,
            ENV_R2_SECRET_ACCESS_KEY,
            ENV_R2_BASE_PREFIX,
        ];
        if r2.iter().any(|name| env_value(name).is_some()) {
            let store = self.object_store.get_or_insert_with(|| ObjectStoreConfig {
                region: default_region(),
                ..ObjectStoreConfig::default()
            });
            if let Some(v) = env_value(ENV_R2_ACCOUNT_ID) {
                store.account_id = Some(v);
            }
            if let Some(v) = env_value(ENV_R2_ENDPOINT) {
                store.endpoint = Some(v);
            }
            if let Some(v) = env_value(ENV_R2_BUCKET) {
                store.bucket = Some(v);
            }
            if let Some(v) = env_value(ENV_R2_ACCESS_KEY_ID) {
                store.access_key_id = Some(v);
            }
            if let Some(v) = env_value(ENV_R2_SECRET_ACCESS_KEY) {
                store.secret_access_key = Some(v);
            }
            if let Some(v) = env_value(ENV_R2_BASE_PREFIX) {
                store.layout.base_prefix = v;
            }
        }

        let kv = [ENV_CF_ACCOUNT_ID, ENV_CF_API_TOKEN, ENV_CF_KV_NAMESPACE_ID];
        if kv.iter().any(|name| env_value(name).is_some()) {
            let cache = self.kv_cache.get_or_insert_with(KvCacheConfig::default);
            if let Some(v) = env_value(ENV_CF_ACCOUNT_ID) {
                cache.account_id = Some(v);
            }
            if let Some(v) = env_value(ENV_CF_API_TOKEN) {
                cache.api_token = Some(v);
            }
            if let Some(v) = env_value(ENV_CF_KV_NAMESPACE_ID) {
                cache.namespace_id = Some(v);
            }
        }
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Locate the config file: CLI argument, then `PHOTOMGR_CONFIG`, then the
/// platform config directory (only if that file exists)
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_value(ENV_CONFIG) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|d| d.join("photomgr").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load the TOML config, degrading to defaults with a warning on any failure
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    match path {
        Some(path) => match load_toml_config(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{} - continuing with built-in defaults", e);
                TomlConfig::default()
            }
        },
        None => TomlConfig::default(),
    }
}

/// Root folder resolution:
/// 1. Command-line argument (highest priority)
/// 2. `PHOTOMGR_ROOT` environment variable
/// 3. TOML `root_folder`
/// 4. Current working directory (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = env_value(ENV_ROOT) {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = &config.root_folder {
        return Ok(path.clone());
    }

    Ok(std::env::current_dir()?)
}
