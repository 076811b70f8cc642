//! Request identity
//!
//! Session mechanics are out of scope for this server: clients carry a
//! bearer token issued elsewhere, and [`identify`] maps it to a user through
//! the `user_sessions` table. Handlers read the result as
//! `Option<Extension<CurrentUser>>` and treat its absence as anonymous.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

/// Signed-in user, by primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
}

/// Attach [`CurrentUser`] when the request carries a known bearer token.
///
/// Unknown or missing tokens pass through as anonymous requests.
pub async fn identify(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        match db::find_session_user(state.db(), token).await {
            Ok(Some(id)) => {
                req.extensions_mut().insert(CurrentUser { id });
            }
            Ok(None) => tracing::debug!("Unknown bearer token"),
            Err(e) => tracing::warn!(error = %e, "Session lookup failed"),
        }
    }

    next.run(req).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Unwrap the optional identity into a user id
pub fn user_id(user: &Option<Extension<CurrentUser>>) -> Option<i64> {
    user.as_ref().map(|Extension(u)| u.id)
}

/// Require a signed-in user
pub fn require_user(user: &Option<Extension<CurrentUser>>) -> Result<CurrentUser, AppError> {
    user.as_ref()
        .map(|Extension(u)| *u)
        .ok_or_else(|| AppError::Unauthorized("not logged in".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_require_user() {
        assert!(require_user(&None).is_err());
        let user = Some(Extension(CurrentUser { id: 7 }));
        assert_eq!(require_user(&user).unwrap().id, 7);
        assert_eq!(user_id(&user), Some(7));
    }
}
