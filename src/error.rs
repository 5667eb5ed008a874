use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use tracing::error;

use crate::clients::ClientError;
use crate::models::ApiResponse;
use crate::store::StoreError;

/// Seconds a caller should wait before retrying after an upstream outage.
const RETRY_AFTER_SECS: &str = "5";

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    /// No eligible employee exists at all.
    #[display(fmt = "{}", _0)]
    Unavailable(String),

    #[display(fmt = "{}", _0)]
    Validation(String),

    /// A required collaborator call failed; safe to retry.
    #[display(fmt = "{}", _0)]
    UpstreamUnavailable(String),

    #[display(fmt = "Internal Server Error")]
    Internal(String),
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) | AppError::UpstreamUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) = self {
            error!(error = %detail, "Request failed");
        }

        let mut builder = HttpResponse::build(self.status_code());
        if matches!(self, AppError::UpstreamUnavailable(_)) {
            builder.insert_header(("Retry-After", RETRY_AFTER_SECS));
        }
        builder.json(ApiResponse::<()>::failure(self.to_string()))
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Database(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ClientError> for AppError {
    fn from(e: ClientError) -> Self {
        AppError::UpstreamUnavailable(e.to_string())
    }
}
