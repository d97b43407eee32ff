//! HTTP mapping of recommendation failures.

use crate::pipeline::RecommendError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl RecommendError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RecommendError::InvalidRequest(_) | RecommendError::InvalidImage(_) => {
                StatusCode::BAD_REQUEST
            }
            RecommendError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RecommendError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RecommendError::DetectorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RecommendError::RecommendationService(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RecommendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Recommendation failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
