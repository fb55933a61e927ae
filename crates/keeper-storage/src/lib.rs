//! # keeper-storage — Object Store Gateway
//!
//! Thin adapter between the HTTP handlers and an external blob store. The
//! gateway exposes exactly two operations:
//!
//! | Operation | Result |
//! |-----------|--------|
//! | [`ObjectStore::generate_upload_url`] | short-lived signed `PUT` URL bound to a content type |
//! | [`ObjectStore::open_read_stream`] | byte stream plus content metadata, or [`StorageError::NotFound`] |
//!
//! ## Backends
//!
//! - [`GcsObjectStore`]: Google Cloud Storage, V4 signed URLs.
//! - [`MemoryObjectStore`]: in-process map for development and tests.
//!
//! Each backend owns one long-lived client handle. Handlers share the store
//! read-only across concurrent requests; the gateway adds no locking of its
//! own beyond what the in-memory map needs. No operation retries.

pub mod error;
pub mod gcs;
pub mod memory;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

pub use error::StorageError;
pub use gcs::{GcsConfig, GcsObjectStore};
pub use memory::MemoryObjectStore;

/// Upper bound on upload URL lifetime.
pub const MAX_UPLOAD_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// GCS limit on object name length, in bytes.
pub const MAX_OBJECT_NAME_LEN: usize = 1024;

/// Stream of object bytes.
pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// A signed upload URL and the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// An open object: metadata plus the body stream.
pub struct ObjectReader {
    /// Stored `Content-Type`, when the object has one.
    pub content_type: Option<String>,
    /// Object size in bytes, when known up front.
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl fmt::Debug for ObjectReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectReader")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// The gateway contract consumed by the request handlers.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend identifier for logs ("gcs", "memory").
    fn backend_name(&self) -> &'static str;

    /// Issue a signed `PUT` URL for `object_name`, restricted to
    /// `content_type`, expiring within [`MAX_UPLOAD_URL_TTL`].
    ///
    /// The URL is intended for a single upload but nothing server-side
    /// enforces that.
    async fn generate_upload_url(
        &self,
        object_name: &str,
        content_type: &str,
    ) -> Result<UploadUrl, StorageError>;

    /// Open `object_name` for reading.
    async fn open_read_stream(&self, object_name: &str) -> Result<ObjectReader, StorageError>;
}

/// Check an object name against the store's naming rules: 1..=1024 bytes,
/// no CR/LF, not `.` or `..`.
pub fn validate_object_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() {
        return Err(StorageError::InvalidObjectName("name is empty".into()));
    }
    if name.len() > MAX_OBJECT_NAME_LEN {
        return Err(StorageError::InvalidObjectName(format!(
            "name is {} bytes, limit is {MAX_OBJECT_NAME_LEN}",
            name.len()
        )));
    }
    if name.contains(['\r', '\n']) {
        return Err(StorageError::InvalidObjectName(
            "name contains a line break".into(),
        ));
    }
    if name == "." || name == ".." {
        return Err(StorageError::InvalidObjectName(format!("'{name}' is reserved")));
    }
    Ok(())
}

/// Clamp a requested upload URL lifetime to `(0, MAX_UPLOAD_URL_TTL]`.
pub fn clamp_upload_ttl(requested: Duration) -> Duration {
    if requested.is_zero() || requested > MAX_UPLOAD_URL_TTL {
        MAX_UPLOAD_URL_TTL
    } else {
        requested
    }
}

/// `now + ttl` as a UTC timestamp.
pub(crate) fn expiry_from_now(ttl: Duration) -> DateTime<Utc> {
    // ttl is clamped to 15 minutes, so the conversion cannot overflow.
    Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64)
}
