//! Request orchestration: route the input to one detector, then recommend.

use crate::emotion::image::ImageDetectionError;
use crate::emotion::{
    DetectorError, EmotionResult, ImageEmotionDetector, ImageRejection, ImageUpload,
    TextEmotionDetector,
};
use crate::music::{MusicSearchError, Recommender, Track};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const INVALID_MODE_MESSAGE: &str = "Please provide either text OR an image, not both.";

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    InvalidImage(String),

    #[error("Emotion detector unavailable: {0}")]
    DetectorUnavailable(#[from] DetectorError),

    #[error("Recommendation service error: {0}")]
    RecommendationService(#[from] MusicSearchError),
}

impl From<ImageRejection> for RecommendError {
    fn from(rejection: ImageRejection) -> Self {
        let message = rejection.to_string();
        match rejection {
            ImageRejection::UnsupportedMediaType(_) => RecommendError::UnsupportedMediaType(message),
            ImageRejection::PayloadTooLarge { .. } => RecommendError::PayloadTooLarge(message),
            ImageRejection::InvalidImage(_) => RecommendError::InvalidImage(message),
        }
    }
}

impl From<ImageDetectionError> for RecommendError {
    fn from(err: ImageDetectionError) -> Self {
        match err {
            ImageDetectionError::Rejected(rejection) => rejection.into(),
            ImageDetectionError::Detector(err) => err.into(),
        }
    }
}

/// Validated input: exactly one of text or image.
#[derive(Debug, Clone)]
pub enum RecommendationRequest {
    Text(String),
    Image(ImageUpload),
}

impl RecommendationRequest {
    /// Enforces the one-mode rule. Empty text counts as absent.
    pub fn from_parts(
        text: Option<String>,
        image: Option<ImageUpload>,
    ) -> Result<Self, RecommendError> {
        let text = text.filter(|t| !t.is_empty());
        match (text, image) {
            (Some(text), None) => Ok(RecommendationRequest::Text(text)),
            (None, Some(image)) => Ok(RecommendationRequest::Image(image)),
            _ => Err(RecommendError::InvalidRequest(INVALID_MODE_MESSAGE.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub text_emotion: Option<String>,
    pub text_confidence: Option<f32>,
    pub image_emotion: Option<String>,
    pub image_confidence: Option<f32>,
    pub final_emotion: String,
    pub recommended_songs: Vec<Track>,
    /// Set when emotion detection worked but the music service failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_error: Option<String>,
}

/// The image result wins when both are present.
pub fn final_emotion<'a>(
    text: Option<&'a EmotionResult>,
    image: Option<&'a EmotionResult>,
) -> Option<&'a EmotionResult> {
    image.or(text)
}

pub struct MoodPipeline {
    text: TextEmotionDetector,
    image: ImageEmotionDetector,
    recommender: Recommender,
    fail_on_recommendation_error: bool,
}

impl MoodPipeline {
    pub fn new(
        text: TextEmotionDetector,
        image: ImageEmotionDetector,
        recommender: Recommender,
        fail_on_recommendation_error: bool,
    ) -> Self {
        Self {
            text,
            image,
            recommender,
            fail_on_recommendation_error,
        }
    }

    pub async fn run(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationResponse, RecommendError> {
        let (text_result, image_result) = match request {
            RecommendationRequest::Text(text) => (Some(self.text.detect(&text).await?), None),
            RecommendationRequest::Image(upload) => (None, Some(self.image.detect(upload).await?)),
        };

        let final_label = final_emotion(text_result.as_ref(), image_result.as_ref())
            .map(|r| r.label.clone())
            .ok_or_else(|| RecommendError::InvalidRequest(INVALID_MODE_MESSAGE.to_string()))?;

        let (recommended_songs, recommendation_error) =
            match self.recommender.recommend(&final_label).await {
                Ok(tracks) => (tracks, None),
                Err(err) if self.fail_on_recommendation_error => return Err(err.into()),
                Err(err) => {
                    warn!("Returning {} without songs: {}", final_label, err);
                    (Vec::new(), Some(err.to_string()))
                }
            };

        info!(
            "Final emotion {} with {} songs",
            final_label,
            recommended_songs.len()
        );

        Ok(RecommendationResponse {
            text_emotion: text_result.as_ref().map(|r| r.label.clone()),
            text_confidence: text_result.as_ref().map(|r| r.confidence),
            image_emotion: image_result.as_ref().map(|r| r.label.clone()),
            image_confidence: image_result.as_ref().map(|r| r.confidence),
            final_emotion: final_label,
            recommended_songs,
            recommendation_error,
        })
    }
}
