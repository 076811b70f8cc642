//! File sources
//!
//! An [`UploadFile`] is either held in memory or read from disk on demand,
//! so large files never have to be loaded whole.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

/// Where the bytes of a file come from
#[derive(Debug, Clone)]
enum FileSource {
    Memory(Vec<u8>),
    Disk(PathBuf),
}

/// A file selected for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    name: String,
    mime_type: String,
    size: u64,
    source: FileSource,
}

impl UploadFile {
    /// In-memory file with an explicit MIME type
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: data.len() as u64,
            source: FileSource::Memory(data),
        }
    }

    /// File on disk; MIME type guessed from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.bin".to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            name,
            mime_type,
            size: metadata.len(),
            source: FileSource::Disk(path.to_path_buf()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Sequential reader over the whole file
    pub async fn reader(&self) -> std::io::Result<Box<dyn AsyncRead + Send + Unpin + '_>> {
        match &self.source {
            FileSource::Memory(data) => Ok(Box::new(data.as_slice())),
            FileSource::Disk(path) => Ok(Box::new(tokio::fs::File::open(path).await?)),
        }
    }

    /// Read `[start, end)`, clamped to the file size
    pub async fn read_range(&self, start: u64, end: u64) -> std::io::Result<Vec<u8>> {
        let end = end.min(self.size);
        if start >= end {
            return Ok(Vec::new());
        }

        match &self.source {
            FileSource::Memory(data) => Ok(data[start as usize..end as usize].to_vec()),
            FileSource::Disk(path) => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(start)).await?;
                let mut buf = Vec::with_capacity((end - start) as usize);
                file.take(end - start).read_to_end(&mut buf).await?;
                Ok(buf)
            }
        }
    }

    /// Whole file contents
    pub async fn read_all(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            FileSource::Memory(data) => Ok(data.clone()),
            FileSource::Disk(path) => tokio::fs::read(path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_memory_range() {
        let file = UploadFile::from_bytes("a.png", "image/png", b"0123456789".to_vec());
        assert_eq!(file.size(), 10);
        assert!(file.is_image());
        assert_eq!(file.read_range(2, 5).await.unwrap(), b"234");
        assert_eq!(file.read_range(8, 100).await.unwrap(), b"89");
        assert!(file.read_range(10, 12).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disk_source() {
        let mut tmp = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        tmp.write_all(b"abcdefghij").unwrap();

        let file = UploadFile::from_path(tmp.path()).await.unwrap();
        assert_eq!(file.mime_type(), "image/jpeg");
        assert_eq!(file.size(), 10);
        assert_eq!(file.read_range(3, 6).await.unwrap(), b"def");
        assert_eq!(file.read_all().await.unwrap(), b"abcdefghij");
    }
}
