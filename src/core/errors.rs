use actix_web::HttpResponse;
use std::fmt;

use crate::validation::FieldErrors;

/// API failures, each carrying the response key/message the client keys off.
#[derive(Debug)]
pub enum ApiError {
    Validation(FieldErrors),
    BadRequest(String),
    Unauthorized,
    Denied(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(errors) => write!(f, "Validation failed: {:?}", errors),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::Denied(_, msg) => write!(f, "Denied: {}", msg),
            ApiError::NotFound(_, msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(_, msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

// Single-field payloads like {"postnotfound": "No post found"}
fn keyed(field: &str, msg: String) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(field.to_string(), serde_json::Value::String(msg));
    serde_json::Value::Object(map)
}

impl From<ApiError> for HttpResponse {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Validation(errors) => HttpResponse::BadRequest().json(&errors),
            ApiError::BadRequest(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({"error": msg}))
            }
            ApiError::Unauthorized => {
                HttpResponse::Unauthorized().json(serde_json::json!({"error": "Unauthorized"}))
            }
            ApiError::Denied(field, msg) => HttpResponse::Unauthorized().json(keyed(field, msg)),
            ApiError::NotFound(field, msg) => HttpResponse::NotFound().json(keyed(field, msg)),
            ApiError::Conflict(field, msg) => HttpResponse::BadRequest().json(keyed(field, msg)),
            ApiError::InternalError(msg) => {
                HttpResponse::InternalServerError().json(serde_json::json!({"error": msg}))
            }
        }
    }
}

impl std::error::Error for ApiError {}

// Implement conversion from anyhow::Error to ApiError for internal errors
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}
