// =============================================================================
// ERROR MODULE
// =============================================================================
// Every failure a request can hit, and how it maps to an HTTP response.
//
// LEARNING NOTES:
// - thiserror derives Display from the #[error("...")] attributes
// - Handlers return AppResult<T>; `?` converts sqlx/redis errors for us
// - Dropping an uncommitted sqlx Transaction rolls it back, so returning
//   an AppError from the middle of a batch undoes every write in it
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// PostgreSQL SQLSTATE codes we translate into 409 responses
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

// =============================================================================
// CUSTOM ERROR TYPE
// =============================================================================
#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // INFRASTRUCTURE
    // -------------------------------------------------------------------------
    /// Database query failed
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Redis operation failed
    #[error("Cache error: {0}")]
    Redis(#[from] redis::RedisError),

    // -------------------------------------------------------------------------
    // REQUEST ERRORS
    // -------------------------------------------------------------------------
    /// Request shape is wrong: non-positive amount, unknown status code,
    /// missing deadline on a credit order...
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Request is well-formed but not allowed in the current state
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Debit larger than what the (item, floor) record holds
    #[error(
        "Insufficient stock for item {item_id} on floor {floor_id} \
         (available: {available}, requested: {requested})"
    )]
    InsufficientStock {
        item_id: String,
        floor_id: String,
        available: i32,
        requested: i32,
    },

    /// Clamped reversal found no stock record to restore into
    #[error("No stock record for item {item_id} on floor {floor_id}")]
    MissingStockRecord { item_id: String, floor_id: String },

    /// Row is still referenced, or a unique key already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    // -------------------------------------------------------------------------
    // INTERNAL ERRORS
    // -------------------------------------------------------------------------
    /// Last stored id for a prefix does not parse; the sequence is corrupt
    #[error("Malformed id {value:?} for prefix {prefix}")]
    MalformedId { prefix: &'static str, value: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::MissingStockRecord { .. } => (StatusCode::NOT_FOUND, "STOCK_NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Redis(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            AppError::MalformedId { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "SEQUENCE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        // Internal details stay in the logs, not in the response body
        let message = match &self {
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Redis(_) => "A cache error occurred".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error_code, error = %self, "Request failed");
        } else {
            tracing::warn!(error_code, message = %message, "Request rejected");
        }

        (status, Json(ErrorResponse::new(error_code, message))).into_response()
    }
}

// =============================================================================
// RESULT TYPE ALIAS
// =============================================================================
pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// CONVERSION HELPERS
// =============================================================================

// LEARNING NOTE:
// We write this From by hand instead of #[from] so constraint violations
// become 409 Conflict rather than a generic 500.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(FOREIGN_KEY_VIOLATION) => {
                    return AppError::Conflict(format!(
                        "Record is still referenced: {}",
                        db_err.message()
                    ))
                }
                Some(UNIQUE_VIOLATION) => {
                    return AppError::Conflict(format!(
                        "Record already exists: {}",
                        db_err.message()
                    ))
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
