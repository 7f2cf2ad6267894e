//! HTTP-facing error responses for the survey API.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::models::FieldError;
use crate::AppError;

/// Detail text for every `invalid_json` response.
pub const INVALID_JSON_DETAIL: &str = "Body must be application/json";

/// Failure outcomes of a survey request, each with a fixed status code.
#[derive(Debug)]
pub enum ApiError {
    /// Body missing, not JSON, or not a JSON object (400).
    InvalidJson,
    /// Well-formed object that violates the submission schema (422).
    Validation(Vec<FieldError>),
    /// Body could not be read, e.g. it exceeds the size limit.
    Body(BytesRejection),
    /// Record construction or persistence failed (500).
    Internal(AppError),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidJson => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_json", "detail": INVALID_JSON_DETAIL })),
            )
                .into_response(),
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "validation_error", "detail": errors })),
            )
                .into_response(),
            Self::Body(rejection) => rejection.into_response(),
            Self::Internal(err) => {
                error!(%err, "survey submission failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "internal_error",
                        "detail": "failed to store submission",
                    })),
                )
                    .into_response()
            }
        }
    }
}
