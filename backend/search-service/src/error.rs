/// Error types for search-service
///
/// `AggregateError` is what the aggregation pipeline propagates;
/// `AppError` is its HTTP-facing wrapper. Clients only ever see a stable
/// category message, never the underlying error text.
use crate::elasticsearch::SearchError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

/// Failures that abort one aggregation
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("search unavailable: {0}")]
    SearchUnavailable(#[source] SearchError),

    #[error("comment store error: {0}")]
    CommentStore(#[source] sqlx::Error),

    #[error("media store error: {0}")]
    MediaStore(#[source] sqlx::Error),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl AggregateError {
    pub fn public_message(&self) -> &'static str {
        match self {
            AggregateError::SearchUnavailable(_) => "Search backend unavailable",
            AggregateError::CommentStore(_) => "Comment store unavailable",
            AggregateError::MediaStore(_) => "Media store unavailable",
            AggregateError::Unexpected(_) => "Internal server error",
        }
    }
}

/// Request-level errors, rendered as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing required query parameters")]
    MissingParameter,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("aggregation timed out")]
    Timeout,

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl AppError {
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::MissingParameter => "Missing required query parameters",
            AppError::MethodNotAllowed => "Method Not Allowed",
            AppError::Timeout => "Search request timed out",
            AppError::Aggregate(err) => err.public_message(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingParameter => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Aggregate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.public_message(),
        })
    }
}

/// Result type alias for request handlers
pub type Result<T> = std::result::Result<T, AppError>;
