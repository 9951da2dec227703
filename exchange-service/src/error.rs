//! Service error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use orderbook::OrderId;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// One offending field in a rejected request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, message: &'static str) -> FieldError {
        FieldError { field, message }
    }
}

/// Central error type for the service.
///
/// Every variant maps to a machine-stable error kind in the response body.
/// Store errors trigger transaction rollback upstream; the book is only
/// mutated after commit, so nothing in memory needs undoing.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("order not found")]
    NotFound(OrderId),

    #[error("{0}")]
    IllegalState(String),

    #[error("storage failure")]
    Store(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message, fields) = match self {
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION",
                "validation failed".to_string(),
                Some(fields),
            ),
            ApiError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("order {} not found", id.0),
                None,
            ),
            ApiError::IllegalState(message) => {
                (StatusCode::BAD_REQUEST, "ILLEGAL_STATE", message, None)
            }
            ApiError::Store(source) => {
                error!(error = %source, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE",
                    "storage failure".to_string(),
                    None,
                )
            }
        };

        let body = match fields {
            Some(fields) => json!({ "error": kind, "message": message, "fields": fields }),
            None => json!({ "error": kind, "message": message }),
        };

        (status, Json(body)).into_response()
    }
}
