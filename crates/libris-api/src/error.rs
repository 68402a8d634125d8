use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use libris_db::StoreError;

use crate::importers::ImportError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("No fields provided for update")]
    NoFieldsToUpdate,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Invalid credentials provided")]
    WrongCredentials,

    #[error("Access token has expired")]
    AccessTokenExpired,

    #[error(
        "Cannot process refresh token. It may be expired, invalid, or attached to a deleted user."
    )]
    RefreshToken,

    #[error("Author does not have permission to modify this book")]
    BookPermission,

    #[error("Author by this id not found.")]
    AuthorNotFound,

    #[error("Book was not found")]
    BookNotFound,

    #[error("Author with this email or name already exists")]
    Conflict,

    #[error("File is too large")]
    PayloadTooLarge,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::NoFieldsToUpdate => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) | ApiError::Import(_) => StatusCode::BAD_REQUEST,
            ApiError::WrongCredentials | ApiError::AccessTokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::RefreshToken | ApiError::BookPermission => StatusCode::FORBIDDEN,
            ApiError::AuthorNotFound | ApiError::BookNotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_contract_violation() {
            warn!("Rejected store call: {}", err);
            ApiError::BadRequest(err.to_string())
        } else if err.is_unique_violation() {
            ApiError::Conflict
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{err:#}"))
    }
}

/// Body returned for failures nobody anticipated.
#[derive(Debug, Serialize)]
struct InternalErrorBody {
    code: &'static str,
    message: &'static str,
    request_id: String,
    timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let ApiError::Internal(detail) = &self {
            let request_id = Uuid::new_v4().to_string();
            error!(%request_id, "Unhandled error: {}", detail);
            let body = InternalErrorBody {
                code: "INTERNAL_SERVER_ERROR",
                message: "An unexpected error occurred. Please try again later.",
                request_id,
                timestamp: Utc::now().to_rfc3339(),
            };
            return (status, Json(body)).into_response();
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
