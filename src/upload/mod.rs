//! Chunked Upload Client
//!
//! Uploads images to the media endpoints with:
//! - MD5 content hashing, streamed in fixed windows
//! - Chunked upload with resume support (already-stored chunks are skipped)
//! - Single-request upload with a timeout for small files
//! - Sequential batch upload with per-file failure isolation
//!
//! Protocol Flow (chunked):
//! 1. Client hashes the file and derives a session-scoped identifier
//! 2. For each chunk, client asks the server whether it is already stored
//! 3. Client uploads only the chunks the server lacks
//! 4. Client asks the server to merge; the server returns the asset URL

mod client;
mod error;
mod hashing;
mod session;
mod source;
mod transport;
mod types;
mod validate;

pub use client::{chunk_count, progress_percent, UploadClient};
pub use error::UploadError;
pub use hashing::{hash_file, md5_hex};
pub use session::SessionScope;
pub use source::UploadFile;
pub use transport::{HttpTransport, UploadTransport};
pub use types::*;
pub use validate::{create_image_preview, format_file_size, validate_image_file, ValidationOptions};
