//! Health check

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = sqlx::query("SELECT 1").execute(state.db()).await.is_ok();

    Json(HealthResponse {
        status: if database { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
