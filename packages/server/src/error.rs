use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::integrity::{IntegrityError, StoreError};
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `CONFLICT`, `CHECKSUM_NOT_COMPUTED`, `PAYLOAD_TOO_LARGE`,
    /// `SOURCE_UNREADABLE`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Stored path cannot be empty")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    ChecksumNotComputed(String),
    PayloadTooLarge(String),
    SourceUnreadable(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::ChecksumNotComputed(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CHECKSUM_NOT_COMPUTED",
                    message: msg,
                },
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    message: msg,
                },
            ),
            AppError::SourceUnreadable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    code: "SOURCE_UNREADABLE",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<IntegrityError> for AppError {
    fn from(err: IntegrityError) -> Self {
        match err {
            IntegrityError::NotFound(id) => {
                AppError::NotFound(format!("Integrity record {id} not found"))
            }
            IntegrityError::Validation(msg) => AppError::Validation(msg),
            IntegrityError::EmptyBatch => AppError::Validation(err.to_string()),
            IntegrityError::ChecksumNotComputed(_) => {
                AppError::ChecksumNotComputed(err.to_string())
            }
            IntegrityError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            IntegrityError::SizeLimitExceeded { .. } => AppError::PayloadTooLarge(err.to_string()),
            IntegrityError::UnreadableSource(detail) => {
                tracing::warn!("Source unreadable: {detail}");
                AppError::SourceUnreadable(detail)
            }
            IntegrityError::Store(store_err) => store_err.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => {
                AppError::NotFound(format!("Integrity record {id} not found"))
            }
            StoreError::Duplicate(id) => {
                AppError::Conflict(format!("Integrity record {id} already exists"))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
