//! Application error type shared by every handler.
//!
//! Handlers return `AppResult<T>`; any failure is converted to a JSON
//! `{"error": ...}` body with the matching HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    /// The stored Google OAuth token set is missing or could not be
    /// refreshed. Carries the consent URL the client must visit.
    #[error("Reauthorization required")]
    ReauthRequired { auth_url: String },

    /// The calendar (or content) API answered, but not with what we need.
    #[error("{0}")]
    Integration(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::Internal(anyhow::anyhow!(other)),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Integration(format!("Upstream request failed: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })),
            AppError::Forbidden    => (StatusCode::FORBIDDEN,    json!({ "error": "Forbidden" })),
            AppError::NotFound     => (StatusCode::NOT_FOUND,    json!({ "error": "Not found" })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::ReauthRequired { auth_url } => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Reauthorization required", "authUrl": auth_url }),
            ),
            AppError::Integration(msg) => (StatusCode::BAD_GATEWAY, json!({ "error": msg })),
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
