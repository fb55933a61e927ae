//! # Google Cloud Storage Backend
//!
//! One [`Client`] per process, built at startup from either an explicit
//! service-account file or ambient credentials (metadata server,
//! `GOOGLE_APPLICATION_CREDENTIALS`).
//!
//! Reads are two calls: a metadata lookup (which is where a missing object
//! surfaces as [`StorageError::NotFound`]) followed by a streamed download.
//! The download runs in its own task and feeds a small bounded channel, so
//! the response body owns no borrows of the client and stops pulling from
//! GCS as soon as the caller goes away.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use google_cloud_storage::client::google_cloud_auth::credentials::CredentialsFile;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::Error as GcsError;
use google_cloud_storage::sign::{SignedURLMethod, SignedURLOptions};

use crate::{
    clamp_upload_ttl, expiry_from_now, validate_object_name, ObjectReader, ObjectStore,
    StorageError, UploadUrl,
};

/// Chunks buffered between the download task and the response body.
const STREAM_BUFFER_CHUNKS: usize = 4;

/// Connection settings for [`GcsObjectStore`].
#[derive(Debug, Clone)]
pub struct GcsConfig {
    pub bucket: String,
    /// Informational only; the bucket name is globally unique.
    pub project_id: Option<String>,
    /// Service-account JSON. `None` means ambient credentials.
    pub service_account_file: Option<PathBuf>,
    pub upload_url_ttl: Duration,
}

/// Object store backed by a single GCS bucket.
pub struct GcsObjectStore {
    client: Client,
    bucket: String,
    upload_url_ttl: Duration,
}

impl fmt::Debug for GcsObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsObjectStore")
            .field("bucket", &self.bucket)
            .field("upload_url_ttl", &self.upload_url_ttl)
            .finish_non_exhaustive()
    }
}

impl GcsObjectStore {
    /// Build the client and authenticate.
    ///
    /// # Errors
    ///
    /// [`StorageError::Init`] if the bucket name is empty or credentials
    /// cannot be loaded.
    pub async fn connect(config: &GcsConfig) -> Result<Self, StorageError> {
        if config.bucket.is_empty() {
            return Err(StorageError::Init("bucket name is empty".into()));
        }

        let client_config = match &config.service_account_file {
            Some(path) => {
                let credentials = CredentialsFile::new_from_file(path.display().to_string())
                    .await
                    .map_err(|e| {
                        StorageError::Init(format!(
                            "failed to read credentials file {}: {e}",
                            path.display()
                        ))
                    })?;
                ClientConfig::default()
                    .with_credentials(credentials)
                    .await
                    .map_err(|e| StorageError::Init(e.to_string()))?
            }
            None => ClientConfig::default()
                .with_auth()
                .await
                .map_err(|e| StorageError::Init(e.to_string()))?,
        };

        tracing::info!(
            bucket = %config.bucket,
            project_id = config.project_id.as_deref().unwrap_or(""),
            explicit_credentials = config.service_account_file.is_some(),
            "GCS client initialized"
        );

        Ok(Self {
            client: Client::new(client_config),
            bucket: config.bucket.clone(),
            upload_url_ttl: clamp_upload_ttl(config.upload_url_ttl),
        })
    }

    fn object_request(&self, object_name: &str) -> GetObjectRequest {
        GetObjectRequest {
            bucket: self.bucket.clone(),
            object: object_name.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    fn backend_name(&self) -> &'static str {
        "gcs"
    }

    async fn generate_upload_url(
        &self,
        object_name: &str,
        content_type: &str,
    ) -> Result<UploadUrl, StorageError> {
        validate_object_name(object_name)?;

        // Computed before signing so the reported expiry is never later
        // than the real one.
        let expires_at = expiry_from_now(self.upload_url_ttl);
        let options = SignedURLOptions {
            method: SignedURLMethod::PUT,
            expires: self.upload_url_ttl,
            content_type: Some(content_type.to_string()),
            ..Default::default()
        };

        let url = self
            .client
            .signed_url(&self.bucket, object_name, None, None, options)
            .await
            .map_err(|e| StorageError::Signing {
                object: object_name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(UploadUrl { url, expires_at })
    }

    async fn open_read_stream(&self, object_name: &str) -> Result<ObjectReader, StorageError> {
        validate_object_name(object_name)?;

        let request = self.object_request(object_name);
        let metadata = self
            .client
            .get_object(&request)
            .await
            .map_err(|e| map_gcs_error(object_name, e))?;

        let client = self.client.clone();
        let object = object_name.to_string();
        let (mut tx, rx) = mpsc::channel::<Result<Bytes, StorageError>>(STREAM_BUFFER_CHUNKS);

        tokio::spawn(async move {
            let stream = match client
                .download_streamed_object(&request, &Range::default())
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = tx.send(Err(map_gcs_error(&object, e))).await;
                    return;
                }
            };
            futures::pin_mut!(stream);
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| StorageError::Backend(e.to_string()));
                let failed = chunk.is_err();
                // Receiver dropped: the client disconnected.
                if tx.send(chunk).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(ObjectReader {
            content_type: metadata.content_type,
            content_length: u64::try_from(metadata.size).ok(),
            body: rx.boxed(),
        })
    }
}

fn map_gcs_error(object_name: &str, err: GcsError) -> StorageError {
    match err {
        GcsError::Response(ref response) if response.code == 404 => {
            StorageError::NotFound(object_name.to_string())
        }
        other => StorageError::Backend(other.to_string()),
    }
}
