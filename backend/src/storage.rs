use async_trait::async_trait;
use aws_sdk_s3 as s3;
use axum::body::Bytes;
use s3::primitives::ByteStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::StorageError;

// 1. BlobStore Contract
/// BlobStore
///
/// Persists the raw bytes of an uploaded image and returns the reference string that is
/// stored on the image record. Implementations:
/// - `LocalBlobStore`: files under a media directory, referenced as `/images/<name>`.
/// - `S3BlobStore`: objects in an S3-compatible bucket.
/// - `MockBlobStore`: records saves in memory for tests.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Prepares the backing location (directory or bucket). Safe to call repeatedly.
    async fn ensure_ready(&self) -> Result<(), StorageError>;

    /// Saves `bytes` under the client-supplied `filename` and returns the media
    /// reference. Saving the same name twice overwrites the first blob and yields the
    /// same reference.
    async fn save(&self, filename: &str, bytes: Bytes) -> Result<String, StorageError>;
}

/// BlobState
///
/// The concrete type used to share the blob store across the application state.
pub type BlobState = Arc<dyn BlobStore>;

/// sanitize_filename
///
/// Reduces a client-supplied file name to its final path component so an upload can
/// never escape the media directory. Rejects names that are empty after stripping.
pub fn sanitize_filename(filename: &str) -> Result<String, StorageError> {
    let name = filename
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("");

    if name.is_empty() || name == "." || name == ".." {
        return Err(StorageError::InvalidName(filename.to_string()));
    }
    Ok(name.to_string())
}

// 2. Local filesystem implementation
/// LocalBlobStore
///
/// Writes uploads to `{dir}/{filename}`.
#[derive(Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        tracing::info!("Media directory: {}", self.dir.display());
        Ok(())
    }

    /// save
    ///
    /// The file handle lives only inside `write_file`; it is closed when that scope ends,
    /// whether the write succeeded or not. A failed write also removes the partial file
    /// so no record can ever point at a truncated blob. Blobs are keyed by file name
    /// alone, so an upload overwrites any blob of the same name, whichever record uses it.
    async fn save(&self, filename: &str, bytes: Bytes) -> Result<String, StorageError> {
        let name = sanitize_filename(filename)?;
        let path = self.dir.join(&name);

        if let Err(e) = write_file(&path, &bytes).await {
            tracing::warn!("upload of {} failed, removing partial file: {}", name, e);
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        tracing::debug!("stored {} bytes at {}", bytes.len(), path.display());
        Ok(format!("/images/{}", name))
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

// 3. S3-compatible implementation
/// S3BlobStore
///
/// Uploads objects with `PutObject` under the `images/` prefix. `force_path_style(true)`
/// keeps it compatible with MinIO and other S3-compatible gateways.
#[derive(Clone)]
pub struct S3BlobStore {
    client: s3::Client,
    bucket_name: String,
    endpoint: String,
}

impl S3BlobStore {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// The public reference stored for an object key.
    pub fn object_ref(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket_name, key)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    /// ensure_bucket_exists
    ///
    /// An existing bucket is not a failure. Anything else (bad credentials, unreachable
    /// endpoint) is returned so startup can abort.
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!("Created bucket {}", self.bucket_name);
                Ok(())
            }
            Err(e)
                if e.as_service_error().is_some_and(|se| {
                    se.is_bucket_already_owned_by_you() || se.is_bucket_already_exists()
                }) =>
            {
                tracing::debug!("bucket {} already exists", self.bucket_name);
                Ok(())
            }
            Err(e) => Err(StorageError::Remote(format!(
                "create_bucket {}: {}",
                self.bucket_name, e
            ))),
        }
    }

    async fn save(&self, filename: &str, bytes: Bytes) -> Result<String, StorageError> {
        let name = sanitize_filename(filename)?;
        let key = format!("images/{}", name);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;

        Ok(self.object_ref(&key))
    }
}

// 4. The Mock Implementation (For Tests)
/// MockBlobStore
///
/// Keeps every save in memory so tests can assert on what was uploaded without touching
/// disk or network.
#[derive(Default)]
pub struct MockBlobStore {
    /// When true, all saves return a simulated failure.
    pub should_fail: bool,
    saved: Mutex<Vec<(String, usize)>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Names and sizes of every successful save, in order.
    pub async fn saved(&self) -> Vec<(String, usize)> {
        self.saved.lock().await.clone()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn save(&self, filename: &str, bytes: Bytes) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Remote(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        let name = sanitize_filename(filename)?;
        self.saved.lock().await.push((name.clone(), bytes.len()));
        Ok(format!("/images/{}", name))
    }
}
