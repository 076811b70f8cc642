//! Paid-content gate
//!
//! Every redaction decision goes through [`should_protect`]. All functions
//! here are total: missing settings degrade to "not paid".

use super::types::{
    ContentKind, ListMediaSource, ListMediaView, PaymentSetting, PostBody, ProtectionContext,
    CONTENT_PREVIEW_LENGTH, TRUNCATION_MARKER,
};

/// True iff a setting exists and is enabled
pub fn is_paid(setting: Option<&PaymentSetting>) -> bool {
    setting.map(|s| s.enabled).unwrap_or(false)
}

/// True iff the post is paid and the requester is neither author nor buyer
pub fn should_protect(setting: Option<&PaymentSetting>, ctx: ProtectionContext) -> bool {
    is_paid(setting) && !ctx.is_author && !ctx.has_purchased
}

/// Configured free preview count, 0 when no setting exists
pub fn free_preview_count(setting: Option<&PaymentSetting>) -> usize {
    setting.map(|s| s.free_preview_count as usize).unwrap_or(0)
}

/// Truncate to `max_chars` Unicode scalar values, appending the marker.
///
/// Returns the input unchanged when it fits. Never splits a code point.
pub fn safe_unicode_truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&text[..cut]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => text.to_string(),
    }
}

/// Build the list-view media fields for one post.
///
/// Video posts expose only the cover unless unprotected. Image posts are cut
/// to `max(1, free_preview_count)` when protected so the cover always shows.
pub fn protect_list_item(
    source: ListMediaSource<'_>,
    setting: Option<&PaymentSetting>,
    ctx: ProtectionContext,
) -> ListMediaView {
    let paid = is_paid(setting);
    let protect = should_protect(setting, ctx);

    match source.kind {
        ContentKind::Video => {
            let cover = source.video.and_then(|v| v.cover_url.clone());
            let video_url = if protect {
                None
            } else {
                source.video.and_then(|v| v.video_url.clone())
            };

            ListMediaView {
                images: cover.iter().cloned().collect(),
                image: cover,
                video_url,
                is_paid_content: paid,
            }
        }
        ContentKind::Image => {
            let mut images = source.image_urls.to_vec();
            let cover = images.first().cloned();

            if protect {
                let visible = free_preview_count(setting).max(1);
                images.truncate(visible);
            }

            ListMediaView {
                images,
                image: cover,
                video_url: None,
                is_paid_content: paid,
            }
        }
    }
}

/// Redact a post body in place for a requester who has not paid.
///
/// Callers decide with [`should_protect`] first. No minimum image count here.
pub fn protect_detail_view(body: &mut PostBody, free_preview_count: usize) {
    body.images.truncate(free_preview_count);

    if body.kind == ContentKind::Video {
        body.video_url = None;
        for video in &mut body.videos {
            video.video_url = None;
        }
    }

    body.attachment = None;

    if body.content.chars().count() > CONTENT_PREVIEW_LENGTH {
        body.content = safe_unicode_truncate(&body.content, CONTENT_PREVIEW_LENGTH);
        body.content_truncated = true;
    }
}
