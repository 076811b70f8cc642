//! Route modules for the Tidepost server

pub mod health;
pub mod posts;
pub mod search;
pub mod upload;

use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let media_prefix = state.assets().public_prefix().to_string();
    let media = ServeDir::new(state.assets().root());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))
        .route("/api/search", get(search::search))
        .route("/api/posts/:id", get(posts::get_post))
        .nest("/api/upload", upload::router(state.config().media.max_body_bytes))
        .nest_service(&media_prefix, media)
        .layer(middleware::from_fn_with_state(state.clone(), auth::identify))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
