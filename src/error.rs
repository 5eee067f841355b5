use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::handlers::shared::ErrorBody;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Internal server error{}", .0.as_ref().map_or("".to_string(), |s| format!(": {}", s)))]
    Internal(Option<String>),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: Value) -> Self {
        AppError::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(Some(message.into()))
    }

    /// Stable code string carried in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::RateLimited(_) => "rate_limited",
            AppError::Internal(_) | AppError::Database(_) => "internal_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        let (message, details) = match self {
            AppError::Validation { message, details } => (message.clone(), details.clone()),
            AppError::Internal(_) | AppError::Database(_) => {
                log::error!("Request failed with status {}: {}", status_code, self);
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        if !status_code.is_server_error() {
            log::debug!("Request rejected with status {}: {}", status_code, message);
        }

        HttpResponse::build(status_code).json(ErrorBody::new(self.code(), message, details))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                log::debug!("Unique violation: {}", db);
                AppError::Conflict("Record already exists".to_string())
            }
            _ => {
                log::error!("Database error: {}", error);
                AppError::Database(error)
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        log::error!("Anyhow error: {}", error);

        if error.is::<sqlx::Error>() {
            return match error.downcast::<sqlx::Error>() {
                Ok(sqlx_err) => AppError::from(sqlx_err),
                Err(original_error) => AppError::Internal(Some(original_error.to_string())),
            };
        }

        AppError::Internal(Some(error.to_string()))
    }
}
