//! Blob storage: pluggable byte backends behind a bucket-style URL scheme.
//!
//! Every stored blob is addressed by a public URL of the form
//!
//! ```text
//! {public_url}/v0/b/{bucket}/o/{percent-encoded object name}?alt=media
//! ```
//!
//! Records keep only that URL, so deleting a blob means recovering the
//! object name from it. [`blob_path_from_url`] is the one place that does
//! this; the format is versioned by [`ADDRESS_SCHEME_VERSION`] and must not
//! change without migrating stored URLs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use biodesk_db::blob_storage::{BucketBlobStore, FilesystemBackend};
//!
//! let store = BucketBlobStore::new(
//!     FilesystemBackend::new("/var/biodesk/blobs"),
//!     "biodesk",
//!     "https://files.example.com",
//! );
//! let url = store.put("face.jpg", &bytes, "image/jpeg").await?;
//! store.delete(&url).await?;
//! ```

use async_trait::async_trait;
use biodesk_core::{sanitize_filename, BlobStore, Error, Result};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Version of the URL ⇄ object-name contract.
pub const ADDRESS_SCHEME_VERSION: u32 = 1;

/// Path segment that precedes the encoded object name.
pub const OBJECT_MARKER: &str = "/o/";

/// Query string appended to every blob URL.
pub const MEDIA_QUERY: &str = "alt=media";

/// Build the public URL of an object.
pub fn object_url(public_url: &str, bucket: &str, object_name: &str) -> String {
    format!(
        "{}/v0/b/{}/o/{}?{}",
        public_url.trim_end_matches('/'),
        bucket,
        urlencoding::encode(object_name),
        MEDIA_QUERY
    )
}

/// Recover the store-relative object name from a blob URL.
///
/// Takes the segment after the last `/o/` marker and before the first `?`,
/// then percent-decodes it. Encoded object names never contain a raw `/`,
/// so the last marker is the object marker even when the bucket is named
/// `o`.
///
/// # Errors
///
/// `Error::Validation` when the marker is missing, the encoded segment is
/// empty or contains `/`, the encoding is not valid UTF-8, or the decoded
/// name would escape the bucket (`..`, path separators).
pub fn blob_path_from_url(url: &str) -> Result<String> {
    let without_query = url.split('?').next().unwrap_or(url);

    let start = without_query
        .rfind(OBJECT_MARKER)
        .ok_or_else(|| Error::Validation(format!("Not a blob URL (no object marker): {}", url)))?;
    let encoded = &without_query[start + OBJECT_MARKER.len()..];

    if encoded.is_empty() || encoded.contains('/') {
        return Err(Error::Validation(format!(
            "Not a blob URL (malformed object segment): {}",
            url
        )));
    }

    let decoded = urlencoding::decode(encoded)
        .map_err(|e| Error::Validation(format!("Invalid blob URL encoding: {}", e)))?
        .into_owned();

    validate_object_name(&decoded)?;
    Ok(decoded)
}

/// Reject object names that are empty or could address outside the bucket.
pub fn validate_object_name(name: &str) -> Result<()> {
    if name.trim().is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name == "."
        || name == ".."
    {
        return Err(Error::Validation(format!("Invalid object name: {:?}", name)));
    }
    Ok(())
}

/// Fresh object name for an upload: `{uuid v4}-{sanitized filename}`.
pub fn new_object_name(filename: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), sanitize_filename(filename))
}

// =============================================================================
// BACKENDS
// =============================================================================

/// Storage backend trait for different storage implementations.
///
/// Paths are flat object names already checked by [`validate_object_name`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data to the specified path.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete data at the specified path. Deleting a missing path succeeds.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at the specified path.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Filesystem storage backend.
///
/// Objects are stored as `{base_path}/objects/{object name}`.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> Result<PathBuf> {
        validate_object_name(path)?;
        Ok(self.base_path.join("objects").join(path))
    }

    /// Round-trip a probe file to catch permission and mount problems at startup.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let probe = ".health-check.bin";
        let data = b"storage-health-check";

        self.write(probe, data)
            .await
            .map_err(|e| format!("write probe: {}", e))?;
        let read_back = self
            .read(probe)
            .await
            .map_err(|e| format!("read probe: {}", e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }
        self.delete(probe)
            .await
            .map_err(|e| format!("delete probe: {}", e))?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path)?;
        debug!(storage_path = %path, size = data.len(), "blob_storage: write");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), error = %e, "blob_storage: rename failed");
            e
        })?;

        // rw-r--r--, no execute
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path)?;
        match fs::read(full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound("Blob not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path)?;
        match fs::remove_file(full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.full_path(path)?;
        Ok(fs::try_exists(full_path).await?)
    }
}

// =============================================================================
// BUCKET BLOB STORE
// =============================================================================

/// [`BlobStore`] that maps the bucket URL scheme onto a [`StorageBackend`].
pub struct BucketBlobStore<B> {
    backend: B,
    bucket: String,
    public_url: String,
}

impl<B: StorageBackend> BucketBlobStore<B> {
    pub fn new(backend: B, bucket: impl Into<String>, public_url: impl Into<String>) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
            public_url: public_url.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Wrap backend I/O failures as storage errors, keeping caller-facing kinds.
fn storage_error(op: &str, err: Error) -> Error {
    match err {
        Error::Validation(_) | Error::NotFound(_) => err,
        other => Error::Storage(format!("{} failed: {}", op, other)),
    }
}

#[async_trait]
impl<B: StorageBackend> BlobStore for BucketBlobStore<B> {
    async fn put(&self, filename: &str, data: &[u8], content_type: &str) -> Result<String> {
        let name = new_object_name(filename);
        self.backend
            .write(&name, data)
            .await
            .map_err(|e| storage_error("put", e))?;

        let url = object_url(&self.public_url, &self.bucket, &name);
        debug!(
            subsystem = "storage",
            op = "put",
            blob_url = %url,
            content_type,
            size = data.len(),
            "Blob stored"
        );
        Ok(url)
    }

    async fn read(&self, url: &str) -> Result<Vec<u8>> {
        let path = blob_path_from_url(url)?;
        self.backend
            .read(&path)
            .await
            .map_err(|e| storage_error("read", e))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let path = blob_path_from_url(url)?;
        self.backend
            .delete(&path)
            .await
            .map_err(|e| storage_error("delete", e))?;
        debug!(subsystem = "storage", op = "delete", blob_url = %url, "Blob deleted");
        Ok(())
    }

    fn object_url(&self, object_name: &str) -> String {
        object_url(&self.public_url, &self.bucket, object_name)
    }
}
