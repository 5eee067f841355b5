use actix_web::{HttpRequest, HttpResponse, error, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> HttpResponse {
        HttpResponse::Ok().json(Self { data })
    }

    pub fn created(data: T) -> HttpResponse {
        HttpResponse::Created().json(Self { data })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Failure envelope: `{"error": {"code", "message", "details"?}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

impl ErrorBody {
    pub fn new(code: &str, message: String, details: Option<Value>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        }
    }
}

/// Body, query and path extractor failures reported in the error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        AppError::validation(format!("Invalid request body: {}", err)).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| {
        AppError::validation(format!("Invalid query string: {}", err)).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err: error::PathError, _req: &HttpRequest| {
        AppError::validation(format!("Invalid path parameter: {}", err)).into()
    })
}
