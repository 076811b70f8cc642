//! Paid-content gate
//!
//! Pure functions deciding whether a post is paid, whether the requester is
//! restricted, and how protected fields are cut before serialization.

mod gate;
mod types;

pub use gate::{
    free_preview_count, is_paid, protect_detail_view, protect_list_item, safe_unicode_truncate,
    should_protect,
};
pub use types::*;
