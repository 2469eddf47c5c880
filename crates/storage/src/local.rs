use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::{public_url, validate_key, BlobStore, StorageError};

/// Filesystem blob store.
///
/// Objects land at `{root}/{key}` and are written to a temp file in the
/// same directory first, then renamed into place, so readers never see a
/// partial file.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |path, seg| path.join(seg))
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let final_path = self.path_for(key);
        let dir = final_path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?
            .to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let temp = tempfile::NamedTempFile::new_in(&dir)?;
        let mut file = tokio::fs::File::from_std(temp.reopen()?);
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        temp.persist(&final_path).map_err(|e| StorageError::Io(e.error))?;

        tracing::debug!(
            key = %key,
            size_bytes = bytes.len(),
            content_type = %content_type,
            "Blob written to local store",
        );
        Ok(public_url(&self.public_base_url, key))
    }
}
