use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API failure taxonomy. Every handler-level error is converted into one of
/// these before leaving the handler, so nothing escapes as a raw panic or an
/// unshaped body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Field-level validation failure; `errors` maps field name to message.
    #[error("{message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, String>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// Generic message for the client plus the underlying detail.
    #[error("{message}")]
    Internal {
        message: String,
        detail: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(message: &str, detail: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.to_string(),
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message }),
            ),
            ApiError::Validation { message, errors } => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message, "errors": errors }),
            ),
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": message }),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({
                    "success": false,
                    "message": "You do not have permission to perform this action"
                }),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": message }),
            ),
            ApiError::Internal { message, detail } => {
                error!(error = %detail, "{message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": message, "error": detail.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
