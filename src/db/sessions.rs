//! Bearer token lookup

use sqlx::SqlitePool;

use crate::error::Result;

/// User owning `token`, if any
pub async fn find_session_user(pool: &SqlitePool, token: &str) -> Result<Option<i64>> {
    let user_id = sqlx::query_scalar::<_, i64>("SELECT user_id FROM user_sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(user_id)
}
