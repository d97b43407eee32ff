use super::check_status;
use crate::emotion::{DetectorError, LabelScore, TextClassifier};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_HF_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_TEXT_MODEL: &str = "boltuix/bert-emotion";

/// Text classification through the Hugging Face inference API.
pub struct HuggingFaceTextClassifier {
    client: Client,
    base_url: String,
    model: String,
    api_token: Option<String>,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    /// `null` asks for every class instead of the top one.
    top_k: Option<usize>,
    function_to_apply: &'static str,
}

/// The API answers with one list per input when batching and a flat list otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batched(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl InferenceResponse {
    fn into_scores(self) -> Vec<LabelScore> {
        match self {
            InferenceResponse::Batched(batches) => batches.into_iter().next().unwrap_or_default(),
            InferenceResponse::Flat(scores) => scores,
        }
    }
}

impl HuggingFaceTextClassifier {
    pub fn new(
        base_url: &str,
        model: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_token,
        })
    }
}

#[async_trait]
impl TextClassifier for HuggingFaceTextClassifier {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, DetectorError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        let request = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                top_k: None,
                function_to_apply: "softmax",
            },
        };

        debug!(model = %self.model, chars = text.len(), "Classifying text");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = check_status(builder.send().await?).await?;
        let body: InferenceResponse = response.json().await?;
        Ok(body.into_scores())
    }
}
