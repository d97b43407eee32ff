//! HTTP bindings for the hosted classification models.
//!
//! - Hugging Face inference API for text emotion classification
//! - TensorFlow Serving REST API for the facial expression model

mod huggingface;
mod tf_serving;

pub use huggingface::{HuggingFaceTextClassifier, DEFAULT_HF_BASE_URL, DEFAULT_TEXT_MODEL};
pub use tf_serving::{TfServingImageClassifier, DEFAULT_IMAGE_MODEL};

use crate::emotion::DetectorError;
use reqwest::{Response, StatusCode};

/// Maps non-success statuses to [`DetectorError::Api`].
async fn check_status(response: Response) -> Result<Response, DetectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        return Err(DetectorError::Timeout);
    }
    Err(DetectorError::Api {
        status: status.as_u16(),
        message,
    })
}
