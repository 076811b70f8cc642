//! Upload client types

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Upload chunk size: 3MB
pub const DEFAULT_CHUNK_SIZE: u64 = 3 * 1024 * 1024;

/// Files above this size go through the chunked path: 3MB
pub const DEFAULT_CHUNK_THRESHOLD: u64 = 3 * 1024 * 1024;

/// Maximum image size: 100MB
pub const DEFAULT_IMAGE_MAX_SIZE: u64 = 100 * 1024 * 1024;

/// Read window for whole-file hashing: 2MB
pub const DEFAULT_HASH_WINDOW: usize = 2 * 1024 * 1024;

/// Single-request upload timeout
pub const SINGLE_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Default maximum number of files per batch
pub const DEFAULT_MAX_BATCH: usize = 9;

/// Prefix of chunked image identifiers
pub const IMAGE_IDENTIFIER_PREFIX: &str = "img";

/// MIME types accepted by [`validate_image_file`](super::validate_image_file) by default
pub const DEFAULT_ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

// ============================================================================
// Client Configuration
// ============================================================================

/// Upload client settings
#[derive(Debug, Clone)]
pub struct UploadClientConfig {
    /// API origin, e.g. `https://tidepost.example`
    pub base_url: String,
    /// Bearer token of the signed-in user
    pub token: Option<String>,
    pub chunk_size: u64,
    pub chunk_threshold: u64,
    pub max_image_size: u64,
    pub hash_window: usize,
    pub single_upload_timeout: Duration,
}

impl Default for UploadClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            token: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            max_image_size: DEFAULT_IMAGE_MAX_SIZE,
            hash_window: DEFAULT_HASH_WINDOW,
            single_upload_timeout: SINGLE_UPLOAD_TIMEOUT,
        }
    }
}

impl UploadClientConfig {
    /// Read `TIDEPOST_API_BASE` and `TIDEPOST_TOKEN`, defaults elsewhere
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("TIDEPOST_API_BASE").unwrap_or(defaults.base_url),
            token: std::env::var("TIDEPOST_TOKEN").ok().filter(|t| !t.is_empty()),
            ..defaults
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

// ============================================================================
// Options
// ============================================================================

/// Progress callback, receives a percentage in `0..=100`
pub type ProgressFn = std::sync::Arc<dyn Fn(u8) + Send + Sync>;

/// Phase observer, receives every state transition of one upload
pub type PhaseFn = std::sync::Arc<dyn Fn(&UploadPhase) + Send + Sync>;

/// Per-upload options
#[derive(Clone, Default)]
pub struct UploadOptions {
    /// Ask the server to watermark the stored image
    pub watermark: bool,
    /// Watermark opacity override
    pub watermark_opacity: Option<f32>,
    /// Name to send instead of the file's own name (single-shot path)
    pub filename: Option<String>,
    pub on_progress: Option<ProgressFn>,
    pub on_phase: Option<PhaseFn>,
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("watermark", &self.watermark)
            .field("watermark_opacity", &self.watermark_opacity)
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// Batch progress, emitted before each file starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub percent: u8,
}

/// Outcome of one file within a batch
#[derive(Debug, Clone)]
pub struct FileCompletion {
    pub index: usize,
    pub file_name: String,
    pub result: Result<UploadedAsset, String>,
}

/// Batch options
#[derive(Clone)]
pub struct BatchOptions {
    pub max_count: usize,
    pub watermark: bool,
    pub watermark_opacity: Option<f32>,
    pub on_progress: Option<std::sync::Arc<dyn Fn(BatchProgress) + Send + Sync>>,
    pub on_file_complete: Option<std::sync::Arc<dyn Fn(&FileCompletion) + Send + Sync>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_BATCH,
            watermark: false,
            watermark_opacity: None,
            on_progress: None,
            on_file_complete: None,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// A stored asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    pub url: String,
    pub original_name: String,
    pub size: u64,
}

/// One failed file of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub file: String,
    pub error: String,
}

/// Aggregated batch result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub uploaded: Vec<UploadedAsset>,
    pub errors: Vec<BatchFailure>,
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
}

impl BatchReport {
    /// At least one file made it
    pub fn success(&self) -> bool {
        self.success_count > 0
    }

    pub fn message(&self) -> String {
        if self.errors.is_empty() {
            "all images uploaded".to_string()
        } else {
            format!(
                "{} uploaded, {} failed",
                self.success_count, self.error_count
            )
        }
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// Phases of one upload invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Hashing,
    /// Asking the server whether chunk `n` (1-based) is already stored
    Verifying { chunk: u32 },
    /// Sending chunk `n`
    Uploading { chunk: u32 },
    Merging,
    Done,
    Failed,
}

// ============================================================================
// Wire Types
// ============================================================================

/// `data` of a chunk verify response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkStatus {
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub valid: bool,
}

impl ChunkStatus {
    /// Chunk is durably stored and matches the client's hash
    pub fn reusable(&self) -> bool {
        self.exists && self.valid
    }
}

/// One chunk on its way to the server
#[derive(Debug, Clone)]
pub struct ChunkPayload<'a> {
    pub identifier: &'a str,
    /// 1-based index
    pub chunk_number: u32,
    pub total_chunks: u32,
    pub filename: &'a str,
    pub data: Vec<u8>,
}

/// Merge request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub identifier: String,
    pub total_chunks: u32,
    pub filename: String,
    #[serde(default)]
    pub watermark: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark_opacity: Option<f32>,
}

/// Single-request upload
#[derive(Debug, Clone)]
pub struct SingleUpload {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub kind: SingleUploadKind,
}

/// What the server should do with a single-request upload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SingleUploadKind {
    Image {
        watermark: bool,
        watermark_opacity: Option<f32>,
    },
    Avatar,
}

/// `data` of merge and single-upload responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUrl {
    pub url: String,
}
