//! Durable blob storage for materialized generation results.
//!
//! A [`BlobStore`] takes bytes under a caller-chosen key and returns a
//! permanent public URL. Two backends are provided: [`LocalBlobStore`] for
//! single-node deployments and tests, and [`S3BlobStore`] for production.

mod local;
mod s3;

pub use local::LocalBlobStore;
pub use s3::S3BlobStore;

/// Errors from blob storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key is empty, absolute, or escapes the store root.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote object store rejected or failed the request.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Key/value blob storage with public URLs.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object, and return
    /// the permanent URL it is served from.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StorageError>;
}

/// Reject keys that could escape the store's namespace.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Join a base URL and a key with exactly one slash.
pub(crate) fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}
