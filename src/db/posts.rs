//! Post detail queries

use sqlx::SqlitePool;

use crate::error::Result;
use crate::paid::{Attachment, PaymentSetting, VideoAsset};

use super::PostRow;

/// Single-post reads for the detail view
pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Published post with its author; drafts are only visible to their author
    pub async fn find(&self, post_id: i64, viewer: Option<i64>) -> Result<Option<PostRow>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.user_id, p.title, p.content, p.type, p.view_count, p.like_count,
                   p.collect_count, p.comment_count, p.created_at, u.nickname,
                   u.avatar AS user_avatar, u.user_id AS author_account, u.location
            FROM posts p
            LEFT JOIN users u ON p.user_id = u.id
            WHERE p.id = ? AND (p.is_draft = 0 OR p.user_id = ?)
            "#,
        )
        .bind(post_id)
        .bind(viewer)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn images(&self, post_id: i64) -> Result<Vec<String>> {
        let urls = sqlx::query_scalar::<_, String>(
            "SELECT image_url FROM post_images WHERE post_id = ? ORDER BY id",
        )
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;

        Ok(urls)
    }

    pub async fn videos(&self, post_id: i64) -> Result<Vec<VideoAsset>> {
        let rows: Vec<(Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT video_url, cover_url FROM post_videos WHERE post_id = ? ORDER BY id",
        )
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(video_url, cover_url)| VideoAsset { video_url, cover_url })
            .collect())
    }

    pub async fn attachment(&self, post_id: i64) -> Result<Option<Attachment>> {
        let row: Option<(String, String, i64)> = sqlx::query_as(
            "SELECT name, url, size FROM post_attachments WHERE post_id = ? ORDER BY id LIMIT 1",
        )
        .bind(post_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(name, url, size)| Attachment { name, url, size }))
    }

    pub async fn payment_setting(&self, post_id: i64) -> Result<Option<PaymentSetting>> {
        let row: Option<(Option<i64>, Option<i64>)> = sqlx::query_as(
            "SELECT enabled, free_preview_count FROM post_payment_settings WHERE post_id = ?",
        )
        .bind(post_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(enabled, count)| PaymentSetting::from_columns(enabled, count)))
    }

    pub async fn has_purchased(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM user_purchased_content WHERE user_id = ? AND post_id = ?",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(found.is_some())
    }
}
