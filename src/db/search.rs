//! Search queries
//!
//! Keyword and tag search over published posts and users, plus the batched
//! per-page lookups (media, tags, payment, interactions, follows) that fill
//! in each result without one query per row.
//!
//! # Usage
//!
//! ```rust,ignore
//! let search = SearchRepository::new(&pool);
//!
//! let filter = PostFilter::new(Some("rust"), None, None);
//! let rows = search.search_posts(&filter, 20, 0).await?;
//! let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
//! let images = search.images_by_post(&ids).await?;
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::Result;
use crate::paid::{ContentKind, PaymentSetting, VideoAsset};

use super::push_id_list;

/// Number of tags reported in search tag statistics
pub const TAG_STATS_LIMIT: i64 = 10;

/// `likes.target_type` of a post
const LIKE_TARGET_POST: i64 = 1;

// ============================================================================
// Rows
// ============================================================================

/// Post joined with its author
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    #[sqlx(rename = "type")]
    pub post_type: i64,
    pub view_count: i64,
    pub like_count: i64,
    pub collect_count: i64,
    pub comment_count: i64,
    pub created_at: String,
    pub nickname: Option<String>,
    pub user_avatar: Option<String>,
    pub author_account: Option<String>,
    pub location: Option<String>,
}

impl PostRow {
    pub fn kind(&self) -> ContentKind {
        ContentKind::from_code(self.post_type)
    }
}

/// User search row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub user_id: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub follow_count: i64,
    pub fans_count: i64,
    pub like_count: i64,
    pub verified: i64,
    pub created_at: String,
    pub post_count: i64,
}

/// Tag attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagRef {
    pub id: i64,
    pub name: String,
}

/// Tag frequency over keyword results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStat {
    /// Tag name; clients use it as the filter value
    pub id: String,
    pub label: String,
    pub count: i64,
}

// ============================================================================
// Filter
// ============================================================================

/// Post search criteria, AND-ed together with "not a draft"
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter<'q> {
    /// Substring of title, content, author nickname/account, or a tag name
    pub keyword: Option<&'q str>,
    /// Exact tag name
    pub tag: Option<&'q str>,
    pub kind: Option<ContentKind>,
}

impl<'q> PostFilter<'q> {
    /// Blank keyword or tag values are dropped
    pub fn new(keyword: Option<&'q str>, tag: Option<&'q str>, kind: Option<ContentKind>) -> Self {
        Self {
            keyword: keyword.filter(|k| !k.trim().is_empty()),
            tag: tag.filter(|t| !t.trim().is_empty()),
            kind,
        }
    }
}

fn like_pattern(keyword: &str) -> String {
    format!("%{}%", keyword)
}

fn push_keyword_match(builder: &mut QueryBuilder<'_, Sqlite>, keyword: &str) {
    let pattern = like_pattern(keyword);
    builder
        .push("(p.title LIKE ")
        .push_bind(pattern.clone())
        .push(" OR p.content LIKE ")
        .push_bind(pattern.clone())
        .push(" OR u.nickname LIKE ")
        .push_bind(pattern.clone())
        .push(" OR u.user_id LIKE ")
        .push_bind(pattern.clone())
        .push(
            " OR EXISTS (SELECT 1 FROM post_tags kpt JOIN tags kt ON kpt.tag_id = kt.id \
             WHERE kpt.post_id = p.id AND kt.name LIKE ",
        )
        .push_bind(pattern)
        .push("))");
}

fn push_post_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PostFilter<'_>) {
    builder.push(" WHERE p.is_draft = 0");

    if let Some(keyword) = filter.keyword {
        builder.push(" AND ");
        push_keyword_match(builder, keyword);
    }

    if let Some(tag) = filter.tag {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM post_tags fpt JOIN tags ft ON fpt.tag_id = ft.id \
                 WHERE fpt.post_id = p.id AND ft.name = ",
            )
            .push_bind(tag.to_string())
            .push(")");
    }

    if let Some(kind) = filter.kind {
        builder.push(" AND p.type = ").push_bind(kind.code());
    }
}

// ============================================================================
// Repository
// ============================================================================

/// Read-only search queries
pub struct SearchRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SearchRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of matching posts, newest first
    pub async fn search_posts(
        &self,
        filter: &PostFilter<'_>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostRow>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT p.id, p.user_id, p.title, p.content, p.type, p.view_count, p.like_count, \
             p.collect_count, p.comment_count, p.created_at, u.nickname, \
             u.avatar AS user_avatar, u.user_id AS author_account, u.location \
             FROM posts p LEFT JOIN users u ON p.user_id = u.id",
        );
        push_post_filter(&mut builder, filter);
        builder
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder.build_query_as::<PostRow>().fetch_all(self.pool).await?;
        Ok(rows)
    }

    /// Total posts matching `filter`
    pub async fn count_posts(&self, filter: &PostFilter<'_>) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM posts p LEFT JOIN users u ON p.user_id = u.id",
        );
        push_post_filter(&mut builder, filter);

        let total = builder.build_query_scalar::<i64>().fetch_one(self.pool).await?;
        Ok(total)
    }

    /// Tag frequencies over the keyword results, ignoring tag and type filters
    pub async fn tag_stats(&self, keyword: &str) -> Result<Vec<TagStat>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT t.name, COUNT(*) FROM tags t \
             JOIN post_tags pt ON t.id = pt.tag_id \
             JOIN posts p ON pt.post_id = p.id \
             LEFT JOIN users u ON p.user_id = u.id \
             WHERE p.is_draft = 0 AND ",
        );
        push_keyword_match(&mut builder, keyword);
        builder
            .push(" GROUP BY t.id, t.name ORDER BY t.name ASC LIMIT ")
            .push_bind(TAG_STATS_LIMIT);

        let rows: Vec<(String, i64)> = builder.build_query_as().fetch_all(self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(name, count)| TagStat {
                id: name.clone(),
                label: name,
                count,
            })
            .collect())
    }

    /// One page of users whose nickname or account contains `keyword`
    pub async fn search_users(&self, keyword: &str, limit: i64, offset: i64) -> Result<Vec<UserRow>> {
        let pattern = like_pattern(keyword);
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.user_id, u.nickname, u.avatar, u.bio, u.location,
                   u.follow_count, u.fans_count, u.like_count, u.verified, u.created_at,
                   (SELECT COUNT(*) FROM posts WHERE user_id = u.id AND is_draft = 0) AS post_count
            FROM users u
            WHERE u.nickname LIKE ? OR u.user_id LIKE ?
            ORDER BY u.created_at DESC, u.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_users(&self, keyword: &str) -> Result<i64> {
        let pattern = like_pattern(keyword);
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE nickname LIKE ? OR user_id LIKE ?",
        )
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }

    // ========================================================================
    // Batched lookups
    // ========================================================================

    /// Image URLs per post, in upload order
    pub async fn images_by_post(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
        let mut map: HashMap<i64, Vec<String>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(map);
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT post_id, image_url FROM post_images WHERE post_id IN ");
        push_id_list(&mut builder, post_ids);
        builder.push(" ORDER BY post_id, id");

        let rows: Vec<(i64, String)> = builder.build_query_as().fetch_all(self.pool).await?;
        for (post_id, url) in rows {
            map.entry(post_id).or_default().push(url);
        }

        Ok(map)
    }

    /// Video per post; the first row wins when a post has several
    pub async fn videos_by_post(&self, post_ids: &[i64]) -> Result<HashMap<i64, VideoAsset>> {
        let mut map = HashMap::new();
        if post_ids.is_empty() {
            return Ok(map);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT post_id, video_url, cover_url FROM post_videos WHERE post_id IN ",
        );
        push_id_list(&mut builder, post_ids);
        builder.push(" ORDER BY id");

        let rows: Vec<(i64, Option<String>, Option<String>)> =
            builder.build_query_as().fetch_all(self.pool).await?;
        for (post_id, video_url, cover_url) in rows {
            map.entry(post_id)
                .or_insert(VideoAsset { video_url, cover_url });
        }

        Ok(map)
    }

    pub async fn tags_by_post(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<TagRef>>> {
        let mut map: HashMap<i64, Vec<TagRef>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(map);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT pt.post_id, t.id, t.name FROM tags t \
             JOIN post_tags pt ON t.id = pt.tag_id WHERE pt.post_id IN ",
        );
        push_id_list(&mut builder, post_ids);
        builder.push(" ORDER BY pt.post_id, t.id");

        let rows: Vec<(i64, i64, String)> = builder.build_query_as().fetch_all(self.pool).await?;
        for (post_id, id, name) in rows {
            map.entry(post_id).or_default().push(TagRef { id, name });
        }

        Ok(map)
    }

    pub async fn payment_settings_by_post(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, PaymentSetting>> {
        let mut map = HashMap::new();
        if post_ids.is_empty() {
            return Ok(map);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT post_id, enabled, free_preview_count FROM post_payment_settings WHERE post_id IN ",
        );
        push_id_list(&mut builder, post_ids);

        let rows: Vec<(i64, Option<i64>, Option<i64>)> =
            builder.build_query_as().fetch_all(self.pool).await?;
        for (post_id, enabled, free_preview_count) in rows {
            map.insert(post_id, PaymentSetting::from_columns(enabled, free_preview_count));
        }

        Ok(map)
    }

    /// Posts among `post_ids` bought by `user_id`
    pub async fn purchased_by(&self, user_id: i64, post_ids: &[i64]) -> Result<HashSet<i64>> {
        self.id_subset(
            "SELECT post_id FROM user_purchased_content WHERE user_id = ",
            user_id,
            " AND post_id IN ",
            post_ids,
        )
        .await
    }

    pub async fn liked_by(&self, user_id: i64, post_ids: &[i64]) -> Result<HashSet<i64>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT target_id FROM likes WHERE user_id = ");
        builder
            .push_bind(user_id)
            .push(" AND target_type = ")
            .push_bind(LIKE_TARGET_POST)
            .push(" AND target_id IN ");
        push_id_list(&mut builder, post_ids);

        let ids: Vec<i64> = builder.build_query_scalar().fetch_all(self.pool).await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn collected_by(&self, user_id: i64, post_ids: &[i64]) -> Result<HashSet<i64>> {
        self.id_subset(
            "SELECT post_id FROM collections WHERE user_id = ",
            user_id,
            " AND post_id IN ",
            post_ids,
        )
        .await
    }

    /// Users among `user_ids` that `follower_id` follows
    pub async fn followed_by(&self, follower_id: i64, user_ids: &[i64]) -> Result<HashSet<i64>> {
        self.id_subset(
            "SELECT following_id FROM follows WHERE follower_id = ",
            follower_id,
            " AND following_id IN ",
            user_ids,
        )
        .await
    }

    /// Users among `user_ids` that follow `following_id`
    pub async fn followers_of(&self, following_id: i64, user_ids: &[i64]) -> Result<HashSet<i64>> {
        self.id_subset(
            "SELECT follower_id FROM follows WHERE following_id = ",
            following_id,
            " AND follower_id IN ",
            user_ids,
        )
        .await
    }

    async fn id_subset(
        &self,
        head: &'static str,
        owner: i64,
        in_clause: &'static str,
        ids: &[i64],
    ) -> Result<HashSet<i64>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(head);
        builder.push_bind(owner).push(in_clause);
        push_id_list(&mut builder, ids);

        let found: Vec<i64> = builder.build_query_scalar().fetch_all(self.pool).await?;
        Ok(found.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_drops_blank_values() {
        let filter = PostFilter::new(Some("  "), Some(""), None);
        assert!(filter.keyword.is_none());
        assert!(filter.tag.is_none());

        let filter = PostFilter::new(Some("sea"), Some("travel"), Some(ContentKind::Video));
        assert_eq!(filter.keyword, Some("sea"));
        assert_eq!(filter.tag, Some("travel"));
    }

    #[test]
    fn test_filter_sql() {
        let filter = PostFilter::new(Some("sea"), Some("travel"), Some(ContentKind::Image));
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT p.id FROM posts p");
        push_post_filter(&mut builder, &filter);
        let sql = builder.sql();

        assert!(sql.contains("p.is_draft = 0"));
        assert!(sql.contains("kt.name LIKE"));
        assert!(sql.contains("ft.name = "));
        assert!(sql.contains("p.type = "));
    }
}
