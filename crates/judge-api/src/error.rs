//! Maps the shared error taxonomy onto HTTP responses. Generalized from
//! the teacher's CLI-facing `AppError` (one variant, one exit code) to
//! one variant, one HTTP status.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use judge_core::JudgeError;
use serde_json::json;

pub struct ApiError(pub JudgeError);

impl From<JudgeError> for ApiError {
    fn from(e: JudgeError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            JudgeError::Validation(_) => StatusCode::BAD_REQUEST,
            JudgeError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// The store's own error type never crosses the `judge-api` boundary
/// directly; callers fold it into the shared taxonomy first.
pub fn map_store_error(e: judge_store::StoreError) -> JudgeError {
    match e {
        judge_store::StoreError::NotFound(id) => JudgeError::NotFound(id),
        judge_store::StoreError::Sqlite(err) => JudgeError::Storage(err.to_string()),
    }
}
