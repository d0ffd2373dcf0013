// src/services/errors.rs

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Método no permitido")]
    MethodNotAllowed,

    #[error("{0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Email delivery failed: {0}")]
    Delivery(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// JSON body written for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_)
            | AppError::Delivery(_)
            | AppError::Store(_)
            | AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Client errors only carry the message; server errors add the upstream text
    // under `error`.
    pub fn body(&self) -> ErrorBody {
        if self.status_code().is_server_error() {
            ErrorBody {
                message: "Error interno del servidor".to_string(),
                error: Some(self.to_string()),
            }
        } else {
            ErrorBody {
                message: self.to_string(),
                error: None,
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(%status, "request rejected: {}", self);
        }
        (status, Json(self.body())).into_response()
    }
}
