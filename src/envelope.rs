//! Response envelope
//!
//! Every JSON endpoint answers `{code, message, data}`. `code` mirrors the
//! HTTP status on success (200) and is what clients check for
//! application-level failure.

use serde::{Deserialize, Serialize};

/// Application-level success code
pub const CODE_SUCCESS: u16 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: CODE_SUCCESS,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }
}

impl ApiResponse<()> {
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}
