//! In-process object store.
//!
//! Objects live in a `RwLock<HashMap>`; upload URLs use a `memory://`
//! scheme and are never dereferenced. Used when `STORAGE_BACKEND=memory`
//! and throughout the test suites.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;

use crate::{
    clamp_upload_ttl, expiry_from_now, validate_object_name, ObjectReader, ObjectStore,
    StorageError, UploadUrl,
};

/// Size of the chunks a read stream yields.
pub const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: Option<String>,
    data: Bytes,
}

/// Object store held entirely in memory.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct MemoryObjectStore {
    bucket: String,
    upload_url_ttl: Duration,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>, upload_url_ttl: Duration) -> Self {
        Self {
            bucket: bucket.into(),
            upload_url_ttl: clamp_upload_ttl(upload_url_ttl),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store an object, replacing any previous one under the same name.
    pub fn put(
        &self,
        object_name: &str,
        content_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Result<(), StorageError> {
        validate_object_name(object_name)?;
        self.objects.write().insert(
            object_name.to_string(),
            StoredObject {
                content_type: content_type.map(str::to_string),
                data: data.into(),
            },
        );
        Ok(())
    }

    pub fn contains(&self, object_name: &str) -> bool {
        self.objects.read().contains_key(object_name)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn generate_upload_url(
        &self,
        object_name: &str,
        content_type: &str,
    ) -> Result<UploadUrl, StorageError> {
        validate_object_name(object_name)?;
        let expires_at = expiry_from_now(self.upload_url_ttl);
        let url = format!(
            "memory://{}/{}?method=PUT&contentType={}&expires={}",
            self.bucket,
            object_name,
            content_type,
            expires_at.timestamp()
        );
        Ok(UploadUrl { url, expires_at })
    }

    async fn open_read_stream(&self, object_name: &str) -> Result<ObjectReader, StorageError> {
        validate_object_name(object_name)?;
        let object = self
            .objects
            .read()
            .get(object_name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(object_name.to_string()))?;

        let len = object.data.len();
        let chunks: Vec<Result<Bytes, StorageError>> = (0..len)
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(object.data.slice(start..(start + CHUNK_SIZE).min(len))))
            .collect();

        Ok(ObjectReader {
            content_type: object.content_type,
            content_length: Some(len as u64),
            body: stream::iter(chunks).boxed(),
        })
    }
}
