//! Asset store
//!
//! Final home of uploaded images. Files are named by the SHA-256 of their
//! contents, so storing the same bytes twice yields the same URL.

use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::error::MediaError;

/// A stored asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// File name inside the media root
    pub key: String,
    /// Public URL path
    pub url: String,
    pub size: usize,
}

/// Content-addressed media directory
#[derive(Clone)]
pub struct AssetStore {
    inner: Arc<AssetStoreInner>,
}

struct AssetStoreInner {
    root: PathBuf,
    public_prefix: String,
}

impl AssetStore {
    pub fn new(root: PathBuf, public_prefix: impl Into<String>) -> Self {
        let public_prefix = normalize_prefix(&public_prefix.into());
        Self {
            inner: Arc::new(AssetStoreInner {
                root,
                public_prefix,
            }),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.inner.root
    }

    /// URL path assets are served under, e.g. `/media`
    pub fn public_prefix(&self) -> &str {
        &self.inner.public_prefix
    }

    /// Store `data`, keeping the extension of `original_name`
    pub async fn store(&self, data: &[u8], original_name: &str) -> Result<StoredAsset, MediaError> {
        let key = match extension_of(original_name) {
            Some(ext) => format!("{}.{}", compute_hash(data), ext),
            None => compute_hash(data),
        };
        let path = self.inner.root.join(&key);

        if tokio::fs::metadata(&path).await.is_err() {
            tokio::fs::create_dir_all(&self.inner.root).await?;
            let tmp = self
                .inner
                .root
                .join(format!(".{}.part-{}", key, uuid::Uuid::new_v4().simple()));
            tokio::fs::write(&tmp, data).await?;
            tokio::fs::rename(&tmp, &path).await?;

            tracing::info!(key = %key, size = data.len(), "Stored asset");
        } else {
            tracing::debug!(key = %key, "Asset already stored");
        }

        Ok(StoredAsset {
            url: format!("{}/{}", self.inner.public_prefix, key),
            key,
            size: data.len(),
        })
    }
}

/// Hex SHA-256 of data
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// `/media/` -> `/media`; an empty prefix falls back to `/media`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/media".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Lowercased extension if it is short and alphanumeric
fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ok = !ext.is_empty() && ext.len() <= 8 && ext.bytes().all(|b| b.is_ascii_alphanumeric());
    ok.then(|| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_is_content_addressed() {
        let temp_dir = TempDir::new().unwrap();
        let store = AssetStore::new(temp_dir.path().to_path_buf(), "/media/");

        let a = store.store(b"pixels", "Photo.PNG").await.unwrap();
        let b = store.store(b"pixels", "other.png").await.unwrap();
        assert_eq!(a, b);
        assert!(a.url.starts_with("/media/"));
        assert!(a.key.ends_with(".png"));
        assert_eq!(a.key.len(), 64 + 4);

        let on_disk = tokio::fs::read(temp_dir.path().join(&a.key)).await.unwrap();
        assert_eq!(on_disk, b"pixels");
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/media/"), "/media");
        assert_eq!(normalize_prefix("static/img"), "/static/img");
        assert_eq!(normalize_prefix("/"), "/media");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.JPG").as_deref(), Some("jpg"));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("weird.p/ng"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}
