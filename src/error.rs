use reqwest::StatusCode;
use serde_json::Value;

use crate::store::StoreError;

/// Failures surfaced by the API client.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("request rejected ({status}): {detail}")]
    Validation { status: u16, detail: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("local storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ApiError {
    /// Builds the error for a non-success response, pulling the backend's
    /// `detail` text out of the body when there is one.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = extract_detail(body).unwrap_or_else(|| body.trim().to_string());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(detail),
            StatusCode::NOT_FOUND => ApiError::NotFound(detail),
            s if s.is_client_error() => ApiError::Validation {
                status: s.as_u16(),
                detail,
            },
            s => ApiError::Server {
                status: s.as_u16(),
                body: body.to_string(),
            },
        }
    }

    /// Server-supplied explanation, if the backend sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Validation { detail, .. } if !detail.is_empty() => Some(detail),
            ApiError::Unauthorized(detail) | ApiError::NotFound(detail) if !detail.is_empty() => {
                Some(detail)
            }
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

// The backend answers `{"detail": "..."}` for most failures and
// `{"detail": [{"msg": "..."}, ...]}` for field validation.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|i| i.get("msg").and_then(|m| m.as_str()))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
