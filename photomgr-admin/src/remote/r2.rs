//! S3-compatible object store client (Cloudflare R2, MinIO, AWS S3)

use super::ObjectStore;
use async_trait::async_trait;
use photomgr_common::config::ObjectStoreConfig;
use photomgr_common::{Error, Result};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use tracing::debug;

/// Object store backed by a path-style bucket on a custom endpoint
pub struct R2ObjectStore {
    bucket: Box<Bucket>,
}

impl R2ObjectStore {
    /// Build a client from configuration
    ///
    /// No request is made here; connectivity problems surface on first use.
    pub fn new(config: &ObjectStoreConfig) -> Result<Self> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "object store settings incomplete, missing: {}",
                missing.join(", ")
            )));
        }

        let endpoint = config
            .endpoint_url()
            .ok_or_else(|| Error::Config("object store endpoint not set".to_string()))?;
        let bucket_name = config
            .bucket
            .as_deref()
            .ok_or_else(|| Error::Config("object store bucket not set".to_string()))?;

        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| Error::Config(format!("object store credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint,
        };

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(remote_error)?
            .with_path_style();

        Ok(Self { bucket })
    }
}

fn remote_error(e: S3Error) -> Error {
    Error::Remote(e.to_string())
}

#[async_trait]
impl ObjectStore for R2ObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        let mut bucket = self.bucket.clone();
        bucket.add_header("Cache-Control", cache_control);

        bucket
            .put_object_with_content_type(key, &bytes, content_type)
            .await
            .map_err(remote_error)?;

        debug!(key = %key, size = bytes.len(), "Object uploaded");
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        let mut failures = Vec::new();

        for key in keys {
            match self.bucket.delete_object(key).await {
                Ok(_) => debug!(key = %key, "Object deleted"),
                Err(e) => failures.push(format!("{}: {}", key, e)),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Remote(format!(
                "failed to delete {} of {} objects ({})",
                failures.len(),
                keys.len(),
                failures.join("; ")
            )))
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.bucket.get_object(key).await {
            Ok(response) => Ok(Some(response.bytes().to_vec())),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(None),
            Err(e) => Err(remote_error(e)),
        }
    }
}
