//! HTTP error responses
//!
//! Every error body is `{"detail": "..."}`.

use axum::extract::multipart::MultipartError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::rate_limit::RateLimitError;
use crate::agent::AgentError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Upload larger than the configured limit (bytes)
    PayloadTooLarge(usize),
    /// Malformed or oversized multipart body
    Multipart(MultipartError),
    RateLimited(RateLimitError),
    Agent(AgentError),
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "{}", msg),
            ApiError::PayloadTooLarge(limit) => write!(f, "Uploaded file exceeds the {} byte limit", limit),
            ApiError::Multipart(e) => write!(f, "Invalid form data: {}", e.body_text()),
            ApiError::RateLimited(e) => write!(f, "{}", e),
            ApiError::Agent(e) => write!(f, "{}", e),
            ApiError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Multipart(e) => e.status(),
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Agent(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart(e)
    }
}

impl From<RateLimitError> for ApiError {
    fn from(e: RateLimitError) -> Self {
        ApiError::RateLimited(e)
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        ApiError::Agent(e)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Internal(format!("Failed to store upload: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(json!({ "detail": self.to_string() }))).into_response();
        if let ApiError::RateLimited(e) = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(e.retry_after_secs()));
        }
        response
    }
}
