use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Handler failures, rendered as `{"detail": ...}` like the rest of the API.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Incorrect username or password")]
    BadLogin,

    #[error("Could not validate credentials")]
    InvalidCredentials,

    #[error("Username already registered")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("{0}")]
    Upstream(String),

    #[error("Internal server error")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::BadLogin | ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::UsernameTaken | ServerError::EmailTaken => StatusCode::BAD_REQUEST,
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Upstream(_) | ServerError::Database(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }
        let body = Json(json!({ "detail": self.to_string() }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::Validation(rejection.body_text())
    }
}

impl From<FormRejection> for ServerError {
    fn from(rejection: FormRejection) -> Self {
        ServerError::Validation(rejection.body_text())
    }
}
