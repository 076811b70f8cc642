//! Chunk Store
//!
//! Temporary on-disk storage for uploaded chunks before merge. Chunks are
//! keyed by `(identifier, chunk_number)`; their MD5 is recomputed on verify
//! so a truncated or corrupted chunk is reported as invalid and re-sent.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::upload::{md5_hex, ChunkStatus};

use super::error::MediaError;

/// Upper bound on chunks per identifier
pub const MAX_CHUNKS: u32 = 10_000;

/// Longest accepted identifier
pub const MAX_IDENTIFIER_LEN: usize = 200;

// ============================================================================
// Chunk Metadata
// ============================================================================

/// Metadata for a stored chunk
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub identifier: String,
    pub chunk_number: u32,
    /// MD5 of the chunk
    pub hash: String,
    pub size: usize,
    pub stored_at: DateTime<Utc>,
}

// ============================================================================
// Chunk Store
// ============================================================================

/// Local filesystem chunk store
#[derive(Clone)]
pub struct ChunkStore {
    inner: Arc<ChunkStoreInner>,
}

struct ChunkStoreInner {
    base_path: PathBuf,
}

impl ChunkStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            inner: Arc::new(ChunkStoreInner { base_path }),
        }
    }

    fn identifier_dir(&self, identifier: &str) -> PathBuf {
        self.inner.base_path.join("chunks").join(identifier)
    }

    fn chunk_path(&self, identifier: &str, chunk_number: u32) -> PathBuf {
        self.identifier_dir(identifier)
            .join(format!("{:08}.chunk", chunk_number))
    }

    /// Check whether a chunk is stored and matches `expected_md5`
    pub async fn verify(
        &self,
        identifier: &str,
        chunk_number: u32,
        expected_md5: &str,
    ) -> Result<ChunkStatus, MediaError> {
        validate_identifier(identifier)?;
        validate_chunk_number(chunk_number, MAX_CHUNKS)?;

        let path = self.chunk_path(identifier, chunk_number);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ChunkStatus::default());
            }
            Err(e) => return Err(e.into()),
        };

        let valid = md5_hex(&data).eq_ignore_ascii_case(expected_md5);
        if !valid {
            tracing::debug!(
                identifier = %identifier,
                chunk = chunk_number,
                "Stored chunk hash differs from client hash"
            );
        }

        Ok(ChunkStatus {
            exists: true,
            valid,
        })
    }

    /// Store a chunk, replacing any previous copy atomically
    pub async fn store_chunk(
        &self,
        identifier: &str,
        chunk_number: u32,
        total_chunks: u32,
        data: &[u8],
    ) -> Result<ChunkMetadata, MediaError> {
        validate_identifier(identifier)?;
        validate_total(total_chunks)?;
        validate_chunk_number(chunk_number, total_chunks)?;

        let path = self.chunk_path(identifier, chunk_number);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so verify never sees a half-written chunk
        let tmp = path.with_extension(format!("part-{}", uuid::Uuid::new_v4().simple()));
        let written = match tokio::fs::write(&tmp, data).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        let metadata = ChunkMetadata {
            identifier: identifier.to_string(),
            chunk_number,
            hash: md5_hex(data),
            size: data.len(),
            stored_at: Utc::now(),
        };

        tracing::debug!(
            identifier = %identifier,
            chunk = chunk_number,
            total_chunks = total_chunks,
            size = data.len(),
            "Stored chunk"
        );

        Ok(metadata)
    }

    /// Chunk numbers in `1..=total_chunks` that are not stored
    pub async fn missing_chunks(&self, identifier: &str, total_chunks: u32) -> Vec<u32> {
        let mut missing = Vec::new();
        for n in 1..=total_chunks {
            if tokio::fs::metadata(self.chunk_path(identifier, n)).await.is_err() {
                missing.push(n);
            }
        }
        missing
    }

    /// Concatenate chunks `1..=total_chunks`
    pub async fn assemble(&self, identifier: &str, total_chunks: u32) -> Result<Vec<u8>, MediaError> {
        validate_identifier(identifier)?;
        validate_total(total_chunks)?;

        let missing = self.missing_chunks(identifier, total_chunks).await;
        if !missing.is_empty() {
            return Err(MediaError::MissingChunks(missing));
        }

        let mut result = Vec::new();
        for n in 1..=total_chunks {
            let chunk = tokio::fs::read(self.chunk_path(identifier, n)).await?;
            result.extend_from_slice(&chunk);
        }

        Ok(result)
    }

    /// Delete all chunks of an identifier, returning how many were removed
    pub async fn delete_chunks(&self, identifier: &str) -> Result<usize, MediaError> {
        validate_identifier(identifier)?;

        let dir = self.identifier_dir(identifier);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            tokio::fs::remove_file(entry.path()).await?;
            count += 1;
        }

        let _ = tokio::fs::remove_dir(&dir).await;

        Ok(count)
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Identifiers become directory names: ASCII alphanumerics, `_` and `-` only
pub fn validate_identifier(identifier: &str) -> Result<(), MediaError> {
    let ok = !identifier.is_empty()
        && identifier.len() <= MAX_IDENTIFIER_LEN
        && identifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

    if ok {
        Ok(())
    } else {
        Err(MediaError::InvalidIdentifier(identifier.to_string()))
    }
}

fn validate_total(total_chunks: u32) -> Result<(), MediaError> {
    if total_chunks == 0 || total_chunks > MAX_CHUNKS {
        return Err(MediaError::InvalidChunk(format!(
            "totalChunks must be within 1..={}",
            MAX_CHUNKS
        )));
    }
    Ok(())
}

fn validate_chunk_number(chunk_number: u32, total_chunks: u32) -> Result<(), MediaError> {
    if chunk_number == 0 || chunk_number > total_chunks {
        return Err(MediaError::InvalidChunk(format!(
            "chunkNumber {} out of range 1..={}",
            chunk_number, total_chunks
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_and_verify() {
        let temp_dir = TempDir::new().unwrap();
        let store = ChunkStore::new(temp_dir.path().to_path_buf());

        let data = b"test chunk data";
        let hash = md5_hex(data);

        let status = store.verify("img_abc_1", 1, &hash).await.unwrap();
        assert!(!status.exists);

        let metadata = store.store_chunk("img_abc_1", 1, 2, data).await.unwrap();
        assert_eq!(metadata.hash, hash);
        assert_eq!(metadata.size, data.len());

        let status = store.verify("img_abc_1", 1, &hash).await.unwrap();
        assert!(status.exists && status.valid);

        let status = store.verify("img_abc_1", 1, &md5_hex(b"other")).await.unwrap();
        assert!(status.exists && !status.valid);
    }

    #[tokio::test]
    async fn test_assembly_requires_all_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let store = ChunkStore::new(temp_dir.path().to_path_buf());

        store.store_chunk("id", 2, 2, b"World!").await.unwrap();
        let result = store.assemble("id", 2).await;
        assert!(matches!(result, Err(MediaError::MissingChunks(ref m)) if m == &vec![1]));

        store.store_chunk("id", 1, 2, b"Hello, ").await.unwrap();
        let assembled = store.assemble("id", 2).await.unwrap();
        assert_eq!(assembled, b"Hello, World!");

        assert_eq!(store.delete_chunks("id").await.unwrap(), 2);
        assert_eq!(store.delete_chunks("id").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_unsafe_identifiers_and_ranges() {
        let temp_dir = TempDir::new().unwrap();
        let store = ChunkStore::new(temp_dir.path().to_path_buf());

        for bad in ["", "../etc", "a/b", "img id"] {
            assert!(matches!(
                store.store_chunk(bad, 1, 1, b"x").await,
                Err(MediaError::InvalidIdentifier(_))
            ));
        }

        assert!(matches!(
            store.store_chunk("ok", 0, 1, b"x").await,
            Err(MediaError::InvalidChunk(_))
        ));
        assert!(matches!(
            store.store_chunk("ok", 3, 2, b"x").await,
            Err(MediaError::InvalidChunk(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_store_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ChunkStore::new(temp_dir.path().to_path_buf());

        // A non-empty directory where the chunk file belongs makes the rename fail
        let target = store.chunk_path("img_blocked_1", 1);
        tokio::fs::create_dir_all(&target).await.unwrap();
        tokio::fs::write(target.join("occupied"), b"x").await.unwrap();

        let result = store.store_chunk("img_blocked_1", 1, 1, b"chunk").await;
        assert!(matches!(result, Err(MediaError::Io(_))));

        let mut entries = tokio::fs::read_dir(target.parent().unwrap()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec![target.file_name().unwrap().to_string_lossy().into_owned()]);
    }
}
