//! Media storage errors

/// Errors from the chunk and asset stores
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid chunk: {0}")]
    InvalidChunk(String),

    #[error("Missing chunks: {0:?}")]
    MissingChunks(Vec<u32>),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}
