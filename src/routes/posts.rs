//! Post Routes
//!
//! `GET /api/posts/:id`: full post body, redacted by the paid-content gate
//! unless the viewer wrote or bought the post.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::auth::{self, CurrentUser};
use crate::db::{PostRepository, SearchRepository, TagRef};
use crate::envelope::ApiResponse;
use crate::error::{AppError, Result};
use crate::paid::{
    free_preview_count, is_paid, protect_detail_view, should_protect, PaymentSetting, PostBody,
    ProtectionContext,
};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub view_count: i64,
    pub like_count: i64,
    pub collect_count: i64,
    pub comment_count: i64,
    pub created_at: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub author_account: Option<String>,
    pub location: Option<String>,
    #[serde(flatten)]
    pub body: PostBody,
    pub tags: Vec<TagRef>,
    pub liked: bool,
    pub collected: bool,
    pub is_paid_content: bool,
    pub has_purchased: bool,
    pub payment_settings: Option<PaymentSetting>,
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Path(post_id): Path<i64>,
) -> Result<Json<ApiResponse<PostDetail>>> {
    let viewer = auth::user_id(&user);
    let posts = PostRepository::new(state.db());

    let row = posts
        .find(post_id, viewer)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

    let images = posts.images(post_id).await?;
    let videos = posts.videos(post_id).await?;
    let attachment = posts.attachment(post_id).await?;
    let setting = posts.payment_setting(post_id).await?;
    let has_purchased = match viewer {
        Some(user_id) => posts.has_purchased(user_id, post_id).await?,
        None => false,
    };

    let ctx = ProtectionContext::new(viewer == Some(row.user_id), has_purchased);

    let mut body = PostBody {
        kind: row.kind(),
        images,
        video_url: videos.first().and_then(|v| v.video_url.clone()),
        videos,
        attachment,
        content: row.content,
        content_truncated: false,
    };

    if should_protect(setting.as_ref(), ctx) {
        protect_detail_view(&mut body, free_preview_count(setting.as_ref()));
        tracing::debug!(post_id = post_id, viewer = ?viewer, "Serving protected post preview");
    }

    let ids = [post_id];
    let search = SearchRepository::new(state.db());
    let tags = search.tags_by_post(&ids).await?.remove(&post_id).unwrap_or_default();
    let (liked, collected) = match viewer {
        Some(user_id) => (
            search.liked_by(user_id, &ids).await?.contains(&post_id),
            search.collected_by(user_id, &ids).await?.contains(&post_id),
        ),
        None => (false, false),
    };

    Ok(Json(ApiResponse::success(PostDetail {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        view_count: row.view_count,
        like_count: row.like_count,
        collect_count: row.collect_count,
        comment_count: row.comment_count,
        created_at: row.created_at,
        nickname: row.nickname,
        avatar: row.user_avatar,
        author_account: row.author_account,
        location: row.location,
        body,
        tags,
        liked,
        collected,
        is_paid_content: is_paid(setting.as_ref()),
        has_purchased,
        payment_settings: setting,
    })))
}
