use actix_web::{
    HttpResponse, ResponseError,
    http::{StatusCode, header},
};
use derive_more::{Display, Error};
use serde_json::json;

#[derive(Debug, Clone, Display, Error, PartialEq)]
pub enum AppError {
    #[display(fmt = "invalid input: {}", _0)]
    InvalidInput(#[error(not(source))] String),

    #[display(fmt = "ledger has {} days, expected {}", actual, expected)]
    LedgerLengthMismatch { expected: usize, actual: usize },

    #[display(fmt = "{} not found", _0)]
    NotFound(#[error(not(source))] String),

    #[display(fmt = "record was modified (revision {} expected, found {})", expected, actual)]
    Conflict { expected: u32, actual: u32 },

    #[display(fmt = "backend unavailable: {}", _0)]
    Transient(#[error(not(source))] String),

    /// Backend failures a retry cannot fix: constraint violations, rows that
    /// no longer decode.
    #[display(fmt = "internal error: {}", _0)]
    Internal(#[error(not(source))] String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Hint sent with 503 responses.
const RETRY_AFTER_SECS: u64 = 5;

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    /// Only backend outages are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::LedgerLengthMismatch { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if self.is_retryable() {
            response.insert_header((header::RETRY_AFTER, RETRY_AFTER_SECS.to_string()));
        }
        response.json(json!({
            "message": self.to_string()
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("record".to_string()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => AppError::Transient(e.to_string()),
            other => {
                tracing::error!(error = %other, "Unexpected database error");
                AppError::Internal(other.to_string())
            }
        }
    }
}
