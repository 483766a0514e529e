//! Shared fixtures for photomgr-admin integration tests
//!
//! In-memory object store and KV cache with failure injection, a scratch
//! root with manifest and media tree, and scripted catalog builders.

#![allow(dead_code)]

use async_trait::async_trait;
use photomgr_admin::remote::{KvCache, ObjectStore, SharedObjectStore};
use photomgr_admin::services::{
    CatalogBuilder, DeletionCoordinator, ManifestStore, PhotoService, RebuildManager,
    RebuildSink, RebuildTask, RemotePropagator, ScanningCatalogBuilder,
};
use photomgr_admin::AppState;
use photomgr_common::{Catalog, Error, KeyLayout, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

/// One album, one record
pub const SINGLE_PHOTO: &str = r#"[
  {
    "year": "2024",
    "photos": [
      {
        "filename": "DSC_0001.jpg",
        "year": "2024",
        "alt": "sunset",
        "is_hidden": false,
        "Subject": ["sky"],
        "width": 4000
      }
    ]
  }
]"#;

/// Two albums, one record each
pub const TWO_YEARS: &str = r#"[
  {"year": "2023", "photos": [{"filename": "a.jpg", "year": "2023", "alt": "", "is_hidden": false}]},
  {"year": "2024", "photos": [{"filename": "b.jpg", "year": "2024", "alt": "", "is_hidden": false}]}
]"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    delete_calls: Mutex<Vec<Vec<String>>>,
    failing: AtomicBool,
}

impl MemoryObjectStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.delete_calls.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::Remote("injected object store failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        self.check()?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                cache_control: cache_control.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        self.delete_calls.lock().unwrap().push(keys.to_vec());
        self.check()?;
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.object(key).map(|o| o.bytes))
    }
}

#[derive(Default)]
pub struct MemoryKv {
    values: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
    failing: AtomicBool,
}

impl MemoryKv {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn value(&self, key: &str) -> Option<(Vec<u8>, Duration)> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl KvCache for MemoryKv {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Remote("injected KV failure".to_string()));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.value(key).map(|(v, _)| v))
    }
}

/// Builder that waits for `release()` before logging and returning
#[derive(Default)]
pub struct GatedBuilder {
    gate: Notify,
}

impl GatedBuilder {
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl CatalogBuilder for GatedBuilder {
    async fn rebuild(&self, sink: RebuildSink) -> Result<()> {
        self.gate.notified().await;
        sink.log("gated run released").await;
        Ok(())
    }
}

/// Scratch root with a manifest, a media tree and in-memory remote tiers
pub struct TestEnv {
    pub dir: TempDir,
    pub manifest_path: PathBuf,
    pub images_root: PathBuf,
    pub layout: KeyLayout,
    pub object_store: Arc<MemoryObjectStore>,
    pub kv: Arc<MemoryKv>,
    pub store: Arc<ManifestStore>,
}

impl TestEnv {
    pub fn new(manifest: &str) -> Self {
        let env = Self::empty();
        std::fs::write(&env.manifest_path, manifest).unwrap();
        env
    }

    /// No manifest file yet
    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("photos.json");
        let images_root = dir.path().join("images");
        std::fs::create_dir_all(&images_root).unwrap();

        let layout = KeyLayout {
            base_prefix: "site/".to_string(),
            ..KeyLayout::default()
        };
        let object_store = Arc::new(MemoryObjectStore::default());
        let kv = Arc::new(MemoryKv::default());

        let propagator = RemotePropagator::new(
            Some(object_store.clone() as Arc<dyn ObjectStore>),
            Some(kv.clone() as Arc<dyn KvCache>),
            layout.clone(),
            Duration::from_secs(86_400),
        );
        let store = Arc::new(ManifestStore::new(&manifest_path, propagator));

        Self {
            dir,
            manifest_path,
            images_root,
            layout,
            object_store,
            kv,
            store,
        }
    }

    pub fn shared_object_store(&self) -> SharedObjectStore {
        Some(self.object_store.clone() as Arc<dyn ObjectStore>)
    }

    pub fn photo_service(&self) -> Arc<PhotoService> {
        let deletion = DeletionCoordinator::new(
            self.shared_object_store(),
            self.layout.clone(),
            self.images_root.clone(),
        );
        Arc::new(PhotoService::new(Arc::clone(&self.store), deletion))
    }

    pub fn scanning_builder(&self) -> Arc<dyn CatalogBuilder> {
        Arc::new(ScanningCatalogBuilder::new(
            self.images_root.clone(),
            Arc::clone(&self.store),
            self.layout.clone(),
            self.shared_object_store(),
        ))
    }

    pub fn app_state(&self, builder: Arc<dyn CatalogBuilder>) -> AppState {
        AppState::new(
            self.photo_service(),
            Arc::new(RebuildManager::new(builder)),
            self.images_root.clone(),
            None,
        )
    }

    pub fn add_image(&self, year: &str, filename: &str, bytes: &[u8]) -> PathBuf {
        let dir = self.images_root.join(year);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(filename);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn manifest_text(&self) -> String {
        std::fs::read_to_string(&self.manifest_path).unwrap()
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::decode(&std::fs::read(&self.manifest_path).unwrap()).unwrap()
    }
}

/// Poll until the rebuild reaches `completed` or `failed`
pub async fn wait_for_terminal(manager: &RebuildManager) -> RebuildTask {
    for _ in 0..500 {
        let snapshot = manager.status().await;
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("rebuild did not finish in time");
}
