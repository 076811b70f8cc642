//! Upload client errors

/// Upload error types
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    // Validation: reported before any network call
    #[error("no file selected")]
    MissingFile,

    #[error("not an image file")]
    NotAnImage,

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("file size cannot exceed {}MB", .max / (1024 * 1024))]
    TooLarge { size: u64, max: u64 },

    #[error("at most {max} images can be uploaded at once (got {count})")]
    TooManyFiles { count: usize, max: usize },

    #[error("file would need {chunks} chunks, more than an upload can carry")]
    TooManyChunks { chunks: u64 },

    #[error("not logged in, please sign in first")]
    NotAuthenticated,

    // Transport
    #[error("{context}: HTTP {status}")]
    Http { status: u16, context: String },

    #[error("{0}")]
    Api(String),

    #[error("malformed server response: {0}")]
    MalformedResponse(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("upload timed out, check your network connection and try again")]
    Timeout,

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Validation errors never touch the network
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingFile
                | Self::NotAnImage
                | Self::UnsupportedType(_)
                | Self::TooLarge { .. }
                | Self::TooManyFiles { .. }
                | Self::TooManyChunks { .. }
                | Self::NotAuthenticated
        )
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
