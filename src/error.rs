//! Unified application error model and HTTP mapping.
//! Every per-request failure funnels through `AppError` and is converted to a
//! JSON response at the handler/middleware boundary; nothing propagates past
//! request scope. Startup-time configuration failures live in `config`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed id or request body.
    #[error("{0}")]
    Validation(String),
    /// Not logged in, or logged in without a required role. The two cases are
    /// deliberately indistinguishable on the wire.
    #[error("unauthorized")]
    Auth,
    /// Missing or invalid CSRF token on a state-mutating request.
    #[error("{0}")]
    Csrf(&'static str),
    #[error("{0}")]
    NotFound(String),
    /// Session backend I/O failure.
    #[error("{0}")]
    Backend(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::Csrf(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let message = match &self {
            // Backend details stay in the logs, not on the wire.
            AppError::Backend(e) => {
                tracing::error!("request failed: {e:#}");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({"status": "error", "message": message}))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(
            AppError::validation("oops").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Auth.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Csrf("blocked").http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::not_found("missing").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Backend(anyhow::anyhow!("io")).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
