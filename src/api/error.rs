use axum::{
    Json,
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::services::background::CascadeError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    /// A processing step failed; `detail` is surfaced as the `error` field.
    #[error("{message}: {detail}")]
    Upstream { message: String, detail: String },

    /// Server-side processing gave up; the client should retry in the browser.
    #[error("{message}: {detail}")]
    Fallback { message: String, detail: String },

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn upstream(message: impl Into<String>, err: impl std::fmt::Display) -> Self {
        AppError::Upstream {
            message: message.into(),
            detail: err.to_string(),
        }
    }

    pub fn fallback(message: impl Into<String>, err: impl std::fmt::Display) -> Self {
        AppError::Fallback {
            message: message.into(),
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Any failure of the removal cascade, including scratch setup, tells the
/// client to fall back to in-browser processing.
impl From<CascadeError> for AppError {
    fn from(err: CascadeError) -> Self {
        AppError::fallback(
            "Server-side background removal failed. Please try client-side processing.",
            err,
        )
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        let text = err.body_text();
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE
            || text.to_lowercase().contains("length limit")
        {
            AppError::PayloadTooLarge("Uploaded file is too large".to_string())
        } else {
            AppError::BadRequest(text)
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Surface the first field message, which is what the forms display.
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| errors.to_string());
        AppError::BadRequest(message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("success".to_string(), json!(false));

        let status = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                body.insert("message".to_string(), json!("Internal Server Error"));
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadRequest(msg) => {
                body.insert("message".to_string(), json!(msg));
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(msg) => {
                body.insert("message".to_string(), json!(msg));
                StatusCode::NOT_FOUND
            }
            AppError::PayloadTooLarge(msg) => {
                body.insert("message".to_string(), json!(msg));
                StatusCode::PAYLOAD_TOO_LARGE
            }
            AppError::Upstream { message, detail } => {
                tracing::error!("{}: {}", message, detail);
                body.insert("message".to_string(), json!(message));
                body.insert("error".to_string(), json!(detail));
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Fallback { message, detail } => {
                tracing::error!("{}: {}", message, detail);
                body.insert("message".to_string(), json!(message));
                body.insert("error".to_string(), json!(detail));
                body.insert("fallback".to_string(), json!(true));
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                body.insert("message".to_string(), json!("Internal Server Error"));
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(Value::Object(body))).into_response()
    }
}
