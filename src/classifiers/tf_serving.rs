use super::check_status;
use crate::emotion::{DetectorError, ImageClassifier, ImageTensor};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_IMAGE_MODEL: &str = "fer_mobilenetv2";

/// Facial expression model hosted behind TensorFlow Serving's REST API.
pub struct TfServingImageClassifier {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<Vec<Vec<[f32; 3]>>>,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<f32>>,
}

impl TfServingImageClassifier {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ImageClassifier for TfServingImageClassifier {
    fn name(&self) -> &str {
        &self.model
    }

    async fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, DetectorError> {
        let url = format!("{}/v1/models/{}:predict", self.base_url, self.model);
        let request = PredictRequest {
            instances: vec![tensor.to_nested()],
        };

        debug!(model = %self.model, shape = ?tensor.shape(), "Requesting image prediction");

        let response = check_status(self.client.post(&url).json(&request).send().await?).await?;
        let body: PredictResponse = response.json().await?;
        body.predictions.into_iter().next().ok_or_else(|| {
            DetectorError::InvalidResponse(format!("{} returned no predictions", self.model))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_mock(predictions: Value) -> String {
        let app = Router::new().route(
            "/v1/models/{model_action}",
            post(move |Json(body): Json<Value>| async move {
                let instances = body["instances"].as_array().cloned().unwrap_or_default();
                if instances.len() != 1 {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                let rows = instances[0].as_array().map(Vec::len).unwrap_or_default();
                let cols = instances[0][0].as_array().map(Vec::len).unwrap_or_default();
                let channels = instances[0][0][0].as_array().map(Vec::len).unwrap_or_default();
                if (rows, cols, channels) != (2, 3, 3) {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                Json(json!({ "predictions": predictions })).into_response()
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn small_tensor() -> ImageTensor {
        ImageTensor {
            width: 3,
            height: 2,
            data: vec![0.0; 2 * 3 * 3],
        }
    }

    #[tokio::test]
    async fn returns_first_prediction() {
        let base = spawn_mock(json!([[0.1, 0.2, 0.5, 0.1, 0.1]])).await;
        let classifier =
            TfServingImageClassifier::new(&base, DEFAULT_IMAGE_MODEL, Duration::from_secs(5)).unwrap();
        let probabilities = classifier.predict(&small_tensor()).await.unwrap();
        assert_eq!(probabilities, vec![0.1, 0.2, 0.5, 0.1, 0.1]);
    }

    #[tokio::test]
    async fn empty_predictions_are_invalid() {
        let base = spawn_mock(json!([])).await;
        let classifier =
            TfServingImageClassifier::new(&base, DEFAULT_IMAGE_MODEL, Duration::from_secs(5)).unwrap();
        let err = classifier.predict(&small_tensor()).await.unwrap_err();
        assert!(matches!(err, DetectorError::InvalidResponse(_)));
    }
}
