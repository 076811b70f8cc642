//! Database module for SQLite persistence
//!
//! Pool creation, schema bootstrap, and the read-side repositories used by
//! search and post detail.

mod posts;
mod schema;
mod search;
mod sessions;

pub use posts::*;
pub use schema::*;
pub use search::*;
pub use sessions::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::Result;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    // Every connection to `:memory:` opens its own database, so keep exactly one alive
    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// `?, ?, ...` builder for `IN` lists over a batch of ids
pub(crate) fn push_id_list(
    builder: &mut sqlx::QueryBuilder<'_, sqlx::Sqlite>,
    ids: &[i64],
) {
    builder.push("(");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}
