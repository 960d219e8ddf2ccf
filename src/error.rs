//! Domain error taxonomy.
//!
//! Every rejection the core produces carries a stable machine-readable code
//! plus a human-readable message. The WebSocket layer maps these onto
//! `ServerMessage::Error`, the REST layer onto HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Expired(String),
}

impl QuizError {
    /// Stable machine-readable category.
    pub fn code(&self) -> &'static str {
        match self {
            QuizError::NotFound(_) => "NOT_FOUND",
            QuizError::Forbidden(_) => "FORBIDDEN",
            QuizError::InvalidState(_) => "INVALID_STATE",
            QuizError::Validation(_) => "VALIDATION",
            QuizError::Expired(_) => "EXPIRED",
        }
    }
}

impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let status = match &self {
            QuizError::NotFound(_) => StatusCode::NOT_FOUND,
            QuizError::Forbidden(_) => StatusCode::FORBIDDEN,
            QuizError::InvalidState(_) => StatusCode::CONFLICT,
            QuizError::Validation(_) => StatusCode::BAD_REQUEST,
            QuizError::Expired(_) => StatusCode::GONE,
        };
        let body = Json(json!({
            "code": self.code(),
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
