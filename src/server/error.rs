use crate::utils::error::HeatmapError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// HTTP face of [`HeatmapError`].
#[derive(Debug)]
pub struct ApiError(pub HeatmapError);

impl From<HeatmapError> for ApiError {
    fn from(err: HeatmapError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            HeatmapError::NotFound { .. } => (StatusCode::NOT_FOUND, "Not found".to_string()),
            other => {
                tracing::error!("❌ Request failed: {} (Category: {:?})", other, other.category());
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        };

        (status, Json(json!({ "ok": false, "error": message }))).into_response()
    }
}
