//! Paid-content types
//!
//! Payment settings, per-request protection context, and the two views of a
//! post that the gate redacts (list item and detail).

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of code points of post text shown on a protected detail view
pub const CONTENT_PREVIEW_LENGTH: usize = 100;

/// Marker appended to truncated text
pub const TRUNCATION_MARKER: &str = "...";

// ============================================================================
// Payment Settings
// ============================================================================

/// Payment configuration attached to a post (zero or one per post)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSetting {
    /// Whether the post is sold
    #[serde(default)]
    pub enabled: bool,

    /// Number of images visible without purchase
    #[serde(default)]
    pub free_preview_count: u32,
}

impl PaymentSetting {
    /// Build from raw database columns.
    ///
    /// Only an `enabled` value of exactly 1 marks the post as paid; anything
    /// else (NULL, 0, garbage) is treated as unpaid. Negative preview counts
    /// clamp to zero.
    pub fn from_columns(enabled: Option<i64>, free_preview_count: Option<i64>) -> Self {
        Self {
            enabled: enabled == Some(1),
            free_preview_count: free_preview_count
                .map(|n| n.clamp(0, u32::MAX as i64) as u32)
                .unwrap_or(0),
        }
    }
}

/// Requester's relationship to a post, derived per request and never cached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtectionContext {
    pub is_author: bool,
    pub has_purchased: bool,
}

impl ProtectionContext {
    pub fn new(is_author: bool, has_purchased: bool) -> Self {
        Self {
            is_author,
            has_purchased,
        }
    }

    /// Context for a request without a signed-in user
    pub fn anonymous() -> Self {
        Self::default()
    }
}

// ============================================================================
// Content Items
// ============================================================================

/// Post kind as stored in the `posts.type` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Image post (`type = 1`)
    Image,
    /// Video post (`type = 2`)
    Video,
}

impl ContentKind {
    /// Map the integer column; unknown values render as image posts
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => Self::Video,
            _ => Self::Image,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Image => 1,
            Self::Video => 2,
        }
    }
}

/// Video attached to a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAsset {
    pub video_url: Option<String>,
    pub cover_url: Option<String>,
}

/// Downloadable attachment of a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub url: String,
    pub size: i64,
}

/// Media fields of a post as they appear in list responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMediaView {
    pub images: Vec<String>,
    /// Cover thumbnail
    pub image: Option<String>,
    pub video_url: Option<String>,
    pub is_paid_content: bool,
}

/// Raw media a list item is built from
#[derive(Debug, Clone, Copy)]
pub struct ListMediaSource<'a> {
    pub kind: ContentKind,
    pub image_urls: &'a [String],
    pub video: Option<&'a VideoAsset>,
}

/// Full post body as returned by the detail endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBody {
    pub kind: ContentKind,
    pub images: Vec<String>,
    pub video_url: Option<String>,
    pub videos: Vec<VideoAsset>,
    pub attachment: Option<Attachment>,
    pub content: String,
    #[serde(default)]
    pub content_truncated: bool,
}
