//! Content hashing
//!
//! MD5 is the hash the chunk endpoints speak. Whole-file hashing streams
//! through a fixed read window so memory stays bounded regardless of size.

use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;

use super::source::UploadFile;

/// Hex MD5 of a byte slice
pub fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hex MD5 of a whole file, read `window` bytes at a time
pub async fn hash_file(file: &UploadFile, window: usize) -> std::io::Result<String> {
    let mut reader = file.reader().await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; window.max(1)];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_known_values() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[tokio::test]
    async fn test_window_size_does_not_change_hash() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let expected = md5_hex(&data);
        let file = UploadFile::from_bytes("x.png", "image/png", data);

        for window in [1, 7, 4096, 10_000, 1 << 20] {
            assert_eq!(hash_file(&file, window).await.unwrap(), expected);
        }
    }
}
