use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Caller-input problems found while compiling search criteria. Always
/// raised before the store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unsupported sort field '{field}', expected one of {allowed:?}")]
    UnsupportedSortField {
        field: String,
        allowed: &'static [&'static str],
    },

    #[error("unsupported sort order '{0}', expected 'asc' or 'desc'")]
    UnsupportedSortOrder(String),

    #[error("parameter '{param}' must be an integer, got '{value}'")]
    InvalidInteger { param: String, value: String },

    #[error("parameter '{param}' must not be negative")]
    NegativeValue { param: String },

    #[error("range on '{field}' has its lower bound above its upper bound")]
    InvertedRange { field: String },

    #[error("range on '{field}' mixes integer and date bounds")]
    MixedRange { field: String },

    #[error("unknown {param} '{value}'")]
    UnknownValue { param: String, value: String },
}

/// Failure reported by a [`Store`](crate::query::Store) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct StoreError {
    pub operation: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn fetch(message: impl Into<String>) -> Self {
        Self {
            operation: "fetch",
            message: message.into(),
        }
    }

    pub fn count(message: impl Into<String>) -> Self {
        Self {
            operation: "count",
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("invalid search request: {0}")]
    Input(#[from] InputError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("search cancelled by caller")]
    Cancelled,

    #[error("search did not complete within {0:?}")]
    DeadlineExceeded(Duration),
}

impl SearchError {
    /// True when the caller gave up, as opposed to the store failing.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SearchError::Cancelled | SearchError::DeadlineExceeded(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Environment(#[from] envconfig::Error),

    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("invalid configuration: {0}")]
    Inconsistent(String),

    #[error("failed to load seed data from {path}: {message}")]
    Seed { path: String, message: String },
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Request could not be completed")]
    RequestFailed,

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Input(e) => ApiError::InvalidRequest(e.to_string()),
            SearchError::Storage(_) | SearchError::Cancelled | SearchError::DeadlineExceeded(_) => {
                ApiError::RequestFailed
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_api_error(err: &ApiError) -> Self {
        match err {
            ApiError::InvalidRequest(msg) => Self::new("bad_request", msg, 400),
            ApiError::RateLimitExceeded { .. } => Self::new(
                "rate_limit_exceeded",
                "Too many requests, please retry later",
                429,
            ),
            ApiError::RequestFailed => {
                Self::new("request_failed", "Request could not be completed", 503)
            }
            ApiError::InternalServerError(msg) => Self::new("internal_error", msg, 500),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_api_error(&self);
        let status = StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = (status, Json(body)).into_response();

        if let ApiError::RateLimitExceeded { retry_after_secs } = self {
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }

        resp
    }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_and_cancellation_share_generic_outcome() {
        let storage: ApiError = SearchError::Storage(StoreError::fetch("boom")).into();
        let cancelled: ApiError = SearchError::Cancelled.into();

        assert_eq!(ErrorResponse::from_api_error(&storage).code, 503);
        assert_eq!(ErrorResponse::from_api_error(&cancelled).code, 503);
    }

    #[test]
    fn test_input_error_maps_to_bad_request() {
        let err: ApiError = SearchError::Input(InputError::UnsupportedSortOrder("up".into())).into();
        let body = ErrorResponse::from_api_error(&err);
        assert_eq!(body.code, 400);
        assert!(body.message.contains("'up'"));
    }

    #[test]
    fn test_cancellation_is_distinct_from_storage() {
        assert!(SearchError::Cancelled.is_cancellation());
        assert!(SearchError::DeadlineExceeded(Duration::from_secs(1)).is_cancellation());
        assert!(!SearchError::Storage(StoreError::count("down")).is_cancellation());
    }

    #[test]
    fn test_rate_limit_response_carries_retry_after() {
        let resp = ApiError::RateLimitExceeded { retry_after_secs: 2 }.into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "2");
    }
}
