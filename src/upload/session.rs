//! Upload Session Scope
//!
//! Holds the random per-session token that namespaces chunk identifiers.
//! The token is created on first use and lives as long as the scope; two
//! scopes never share a token, so the same bytes uploaded from two sessions
//! get different identifiers.

use std::sync::{Arc, OnceLock};

use uuid::Uuid;

use super::types::IMAGE_IDENTIFIER_PREFIX;

/// Session-scoped upload state
#[derive(Clone, Default)]
pub struct SessionScope {
    inner: Arc<SessionScopeInner>,
}

#[derive(Default)]
struct SessionScopeInner {
    token: OnceLock<String>,
}

impl SessionScope {
    /// Create an empty scope; the token is generated lazily
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a scope from a previously issued token (e.g. persisted by the host)
    pub fn with_token(token: impl Into<String>) -> Self {
        let scope = Self::new();
        let _ = scope.inner.token.set(token.into());
        scope
    }

    /// Session token, generated on first call
    pub fn token(&self) -> &str {
        self.inner.token.get_or_init(|| {
            let token = Uuid::new_v4().simple().to_string();
            tracing::debug!(session = %token, "Initialized upload session scope");
            token
        })
    }

    /// Whether the token has been generated yet
    pub fn is_initialized(&self) -> bool {
        self.inner.token.get().is_some()
    }

    /// Stable identifier for a file within this session
    pub fn image_identifier(&self, file_hash: &str, file_size: u64) -> String {
        format!(
            "{}_{}_{}_{}",
            IMAGE_IDENTIFIER_PREFIX,
            self.token(),
            file_hash,
            file_size
        )
    }
}

impl std::fmt::Debug for SessionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScope")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_initialized_once() {
        let scope = SessionScope::new();
        assert!(!scope.is_initialized());

        let first = scope.token().to_string();
        assert!(scope.is_initialized());
        assert_eq!(scope.token(), first);

        // Clones share the token
        let clone = scope.clone();
        assert_eq!(clone.token(), first);
    }

    #[test]
    fn test_identifier_stable_within_session() {
        let scope = SessionScope::new();
        let a = scope.image_identifier("d41d8cd98f00b204e9800998ecf8427e", 1024);
        let b = scope.image_identifier("d41d8cd98f00b204e9800998ecf8427e", 1024);
        assert_eq!(a, b);
        assert!(a.starts_with("img_"));
        assert!(a.ends_with("_d41d8cd98f00b204e9800998ecf8427e_1024"));
    }

    #[test]
    fn test_identifier_differs_across_sessions_and_files() {
        let one = SessionScope::new();
        let two = SessionScope::new();
        assert_ne!(
            one.image_identifier("abc", 10),
            two.image_identifier("abc", 10)
        );
        assert_ne!(one.image_identifier("abc", 10), one.image_identifier("abd", 10));
        assert_ne!(one.image_identifier("abc", 10), one.image_identifier("abc", 11));
    }

    #[test]
    fn test_restored_token() {
        let scope = SessionScope::with_token("k3x9q2");
        assert_eq!(scope.token(), "k3x9q2");
        assert_eq!(scope.image_identifier("ff", 1), "img_k3x9q2_ff_1");
    }
}
