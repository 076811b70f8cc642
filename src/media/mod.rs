//! Media storage
//!
//! Server side of the upload protocol: chunks wait in the [`ChunkStore`]
//! until merged, merged files land in the [`AssetStore`].

mod assets;
mod chunk_store;
mod error;

pub use assets::{compute_hash, AssetStore, StoredAsset};
pub use chunk_store::{validate_identifier, ChunkMetadata, ChunkStore, MAX_CHUNKS};
pub use error::MediaError;
