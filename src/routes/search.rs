//! Search Routes
//!
//! `GET /api/search?keyword=&tag=&type=&page=&limit=`
//!
//! `type` selects the result shape:
//! - `all`: `{keyword, tag, type, data, tagStats, pagination}`
//! - `posts` / `videos`: `{keyword, tag, type, posts: {data, tagStats, pagination}}`
//! - `users`: `{keyword, tag, type, users: {data, pagination}}`
//!
//! Every post in a result page goes through the paid-content gate before it
//! is serialized.

use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::{self, CurrentUser};
use crate::db::{PostFilter, PostRow, SearchRepository, TagRef, TagStat, UserRow};
use crate::envelope::ApiResponse;
use crate::error::{AppError, Result};
use crate::paid::{
    protect_list_item, ContentKind, ListMediaSource, ListMediaView, ProtectionContext,
};
use crate::state::AppState;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

// ============================================================================
// Request
// ============================================================================

/// Raw query string; numbers are parsed leniently
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub tag: Option<String>,
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    All,
    Posts,
    Videos,
    Users,
}

impl SearchType {
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None | Some("all") => Some(Self::All),
            Some("posts") => Some(Self::Posts),
            Some("videos") => Some(Self::Videos),
            Some("users") => Some(Self::Users),
            Some(_) => None,
        }
    }

    /// Post type filter implied by the tab
    fn post_kind(self) -> Option<ContentKind> {
        match self {
            Self::Posts => Some(ContentKind::Image),
            Self::Videos => Some(ContentKind::Video),
            Self::All | Self::Users => None,
        }
    }
}

/// Positive integer or the default
fn parse_positive(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

/// Post as it appears in search results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListItem {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub post_type: i64,
    pub view_count: i64,
    pub like_count: i64,
    pub collect_count: i64,
    pub comment_count: i64,
    pub created_at: String,
    pub nickname: Option<String>,
    /// Author display name
    pub author: Option<String>,
    /// Author avatar
    pub avatar: Option<String>,
    pub author_account: Option<String>,
    pub location: Option<String>,
    #[serde(flatten)]
    pub media: ListMediaView,
    pub tags: Vec<TagRef>,
    pub liked: bool,
    pub collected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonType {
    #[serde(rename = "self")]
    Own,
    Mutual,
    Unfollow,
    Back,
    Follow,
}

/// Follow state of a listed user relative to the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowState {
    pub is_following: bool,
    pub is_mutual: bool,
    pub button_type: ButtonType,
}

impl FollowState {
    pub fn anonymous() -> Self {
        Self {
            is_following: false,
            is_mutual: false,
            button_type: ButtonType::Follow,
        }
    }

    /// `follows_them`: viewer follows the user; `follows_viewer`: the reverse
    pub fn resolve(viewer_id: i64, user_id: i64, follows_them: bool, follows_viewer: bool) -> Self {
        let is_mutual = follows_them && follows_viewer;
        let button_type = if viewer_id == user_id {
            ButtonType::Own
        } else if is_mutual {
            ButtonType::Mutual
        } else if follows_them {
            ButtonType::Unfollow
        } else if follows_viewer {
            ButtonType::Back
        } else {
            ButtonType::Follow
        };

        Self {
            is_following: follows_them,
            is_mutual,
            button_type,
        }
    }
}

/// User as it appears in search results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListItem {
    pub id: i64,
    pub user_id: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub follow_count: i64,
    pub fans_count: i64,
    pub like_count: i64,
    pub post_count: i64,
    pub verified: bool,
    pub created_at: String,
    pub is_following: bool,
    pub is_mutual: bool,
    pub button_type: ButtonType,
}

impl UserListItem {
    fn from_row(row: UserRow, follow: FollowState) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            nickname: row.nickname,
            avatar: row.avatar,
            bio: row.bio,
            location: row.location,
            follow_count: row.follow_count,
            fans_count: row.fans_count,
            like_count: row.like_count,
            post_count: row.post_count,
            verified: row.verified != 0,
            created_at: row.created_at,
            is_following: follow.is_following,
            is_mutual: follow.is_mutual,
            button_type: follow.button_type,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResults {
    pub data: Vec<PostListItem>,
    #[serde(rename = "tagStats")]
    pub tag_stats: Vec<TagStat>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResults {
    pub data: Vec<UserListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    All(PostResults),
    Posts { posts: PostResults },
    Users { users: UserResults },
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub keyword: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub search_type: SearchType,
    #[serde(flatten)]
    pub results: SearchResults,
}

// ============================================================================
// Handler
// ============================================================================

/// GET /api/search
pub async fn search(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResponse>>> {
    let keyword = query.keyword.unwrap_or_default();
    let tag = query.tag.unwrap_or_default();
    let search_type = SearchType::parse(query.search_type.as_deref()).ok_or_else(|| {
        AppError::BadRequest(format!(
            "unsupported search type: {}",
            query.search_type.as_deref().unwrap_or_default()
        ))
    })?;
    let page = parse_positive(query.page.as_deref(), DEFAULT_PAGE);
    let limit = parse_positive(query.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = (page - 1) * limit;
    let viewer = auth::user_id(&user);

    if keyword.trim().is_empty() && tag.trim().is_empty() {
        return Ok(Json(ApiResponse::success(SearchResponse {
            keyword,
            tag,
            search_type,
            results: SearchResults::All(PostResults {
                data: Vec::new(),
                tag_stats: Vec::new(),
                pagination: Pagination::new(page, limit, 0),
            }),
        })));
    }

    let repo = SearchRepository::new(state.db());

    let results = match search_type {
        SearchType::Users => {
            let users = search_users(&repo, &keyword, viewer, page, limit, offset).await?;
            SearchResults::Users { users }
        }
        SearchType::All | SearchType::Posts | SearchType::Videos => {
            let filter = PostFilter::new(
                Some(keyword.as_str()),
                Some(tag.as_str()),
                search_type.post_kind(),
            );
            let posts = search_posts(&repo, &filter, viewer, page, limit, offset).await?;
            if search_type == SearchType::All {
                SearchResults::All(posts)
            } else {
                SearchResults::Posts { posts }
            }
        }
    };

    tracing::debug!(
        keyword = %keyword,
        tag = %tag,
        search_type = ?search_type,
        page = page,
        viewer = ?viewer,
        "Search served"
    );

    Ok(Json(ApiResponse::success(SearchResponse {
        keyword,
        tag,
        search_type,
        results,
    })))
}

async fn search_posts(
    repo: &SearchRepository<'_>,
    filter: &PostFilter<'_>,
    viewer: Option<i64>,
    page: i64,
    limit: i64,
    offset: i64,
) -> Result<PostResults> {
    let rows = repo.search_posts(filter, limit, offset).await?;
    let data = build_post_items(repo, rows, viewer).await?;
    let total = repo.count_posts(filter).await?;

    let tag_stats = match filter.keyword {
        Some(keyword) => repo.tag_stats(keyword).await?,
        None => Vec::new(),
    };

    Ok(PostResults {
        data,
        tag_stats,
        pagination: Pagination::new(page, limit, total),
    })
}

/// Fill in media, tags and viewer state for a page of posts
pub async fn build_post_items(
    repo: &SearchRepository<'_>,
    rows: Vec<PostRow>,
    viewer: Option<i64>,
) -> Result<Vec<PostListItem>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let images = repo.images_by_post(&ids).await?;
    let videos = repo.videos_by_post(&ids).await?;
    let mut tags = repo.tags_by_post(&ids).await?;
    let settings = repo.payment_settings_by_post(&ids).await?;

    let (purchased, liked, collected) = match viewer {
        Some(user_id) => (
            repo.purchased_by(user_id, &ids).await?,
            repo.liked_by(user_id, &ids).await?,
            repo.collected_by(user_id, &ids).await?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    let no_images: Vec<String> = Vec::new();

    Ok(rows
        .into_iter()
        .map(|row| {
            let ctx = ProtectionContext::new(
                viewer == Some(row.user_id),
                purchased.contains(&row.id),
            );
            let source = ListMediaSource {
                kind: row.kind(),
                image_urls: images.get(&row.id).unwrap_or(&no_images),
                video: videos.get(&row.id),
            };
            let media = protect_list_item(source, settings.get(&row.id), ctx);

            PostListItem {
                id: row.id,
                user_id: row.user_id,
                title: row.title,
                content: row.content,
                post_type: row.post_type,
                view_count: row.view_count,
                like_count: row.like_count,
                collect_count: row.collect_count,
                comment_count: row.comment_count,
                created_at: row.created_at,
                author: row.nickname.clone(),
                nickname: row.nickname,
                avatar: row.user_avatar,
                author_account: row.author_account,
                location: row.location,
                media,
                tags: tags.remove(&row.id).unwrap_or_default(),
                liked: liked.contains(&row.id),
                collected: collected.contains(&row.id),
            }
        })
        .collect())
}

async fn search_users(
    repo: &SearchRepository<'_>,
    keyword: &str,
    viewer: Option<i64>,
    page: i64,
    limit: i64,
    offset: i64,
) -> Result<UserResults> {
    let rows = repo.search_users(keyword, limit, offset).await?;
    let total = repo.count_users(keyword).await?;

    let ids: Vec<i64> = rows.iter().map(|u| u.id).collect();
    let follow_states: HashMap<i64, FollowState> = match viewer {
        Some(viewer_id) => {
            let following = repo.followed_by(viewer_id, &ids).await?;
            let followers = repo.followers_of(viewer_id, &ids).await?;
            ids.iter()
                .map(|&id| {
                    let state = FollowState::resolve(
                        viewer_id,
                        id,
                        following.contains(&id),
                        followers.contains(&id),
                    );
                    (id, state)
                })
                .collect()
        }
        None => HashMap::new(),
    };

    let data = rows
        .into_iter()
        .map(|row| {
            let follow = follow_states
                .get(&row.id)
                .copied()
                .unwrap_or_else(FollowState::anonymous);
            UserListItem::from_row(row, follow)
        })
        .collect();

    Ok(UserResults {
        data,
        pagination: Pagination::new(page, limit, total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive(None, 20), 20);
        assert_eq!(parse_positive(Some("5"), 20), 5);
        assert_eq!(parse_positive(Some("0"), 20), 20);
        assert_eq!(parse_positive(Some("-3"), 1), 1);
        assert_eq!(parse_positive(Some("abc"), 1), 1);
    }

    #[test]
    fn test_search_type() {
        assert_eq!(SearchType::parse(None), Some(SearchType::All));
        assert_eq!(SearchType::parse(Some("")), Some(SearchType::All));
        assert_eq!(SearchType::parse(Some("videos")), Some(SearchType::Videos));
        assert_eq!(SearchType::parse(Some("comments")), None);
    }

    #[test]
    fn test_pagination_pages() {
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).pages, 2);
    }

    #[test]
    fn test_follow_state() {
        assert_eq!(FollowState::resolve(1, 1, false, false).button_type, ButtonType::Own);

        let mutual = FollowState::resolve(1, 2, true, true);
        assert!(mutual.is_mutual);
        assert_eq!(mutual.button_type, ButtonType::Mutual);

        assert_eq!(FollowState::resolve(1, 2, true, false).button_type, ButtonType::Unfollow);
        assert_eq!(FollowState::resolve(1, 2, false, true).button_type, ButtonType::Back);
        assert_eq!(FollowState::resolve(1, 2, false, false).button_type, ButtonType::Follow);
    }

    #[test]
    fn test_button_type_wire_names() {
        assert_eq!(serde_json::to_value(ButtonType::Own).unwrap(), "self");
        assert_eq!(serde_json::to_value(ButtonType::Back).unwrap(), "back");
    }
}
