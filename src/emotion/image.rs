//! Facial image emotion detection.
//!
//! Uploads are validated in a fixed order before any decoding happens:
//! declared content type, then byte length, then decodability. Accepted images
//! are converted to RGB, resized to the model's square input and normalized to
//! `[-1, 1]` the way MobileNetV2 expects.

use super::{DetectorError, Emotion, EmotionResult};
use ::image::imageops::FilterType;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Declared content types accepted for uploads.
pub const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

/// Largest accepted upload (2 MiB).
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Side of the square model input.
pub const MODEL_INPUT_SIZE: u32 = 224;

const CHANNELS: usize = 3;

/// An uploaded image as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

/// Reasons an upload is refused before it reaches the classifier.
#[derive(Debug, Error, PartialEq)]
pub enum ImageRejection {
    #[error("Unsupported file format {0}. Only JPG or PNG allowed.")]
    UnsupportedMediaType(String),

    /// `size` is a lower bound when the upload was read partially.
    #[error("File too large (at least {size} bytes, max {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Invalid image file or unreadable format: {0}")]
    InvalidImage(String),
}

#[derive(Debug, Error)]
pub enum ImageDetectionError {
    #[error(transparent)]
    Rejected(#[from] ImageRejection),

    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Normalized model input, NHWC with a batch of one.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB values in `[-1, 1]`, `height * width * 3` long.
    pub data: Vec<f32>,
}

impl ImageTensor {
    /// Shape including the batch dimension.
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, CHANNELS]
    }

    /// Rows of pixels of channels, the layout JSON inference APIs expect per instance.
    pub fn to_nested(&self) -> Vec<Vec<[f32; 3]>> {
        self.data
            .chunks_exact(self.width as usize * CHANNELS)
            .map(|row| {
                row.chunks_exact(CHANNELS)
                    .map(|px| [px[0], px[1], px[2]])
                    .collect()
            })
            .collect()
    }
}

/// External image classification model.
///
/// The returned vector is aligned to [`Emotion::ALL`].
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, DetectorError>;
}

fn content_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Checks a declared content type against the accepted image types.
pub fn check_content_type(content_type: Option<&str>) -> Result<(), ImageRejection> {
    let declared = content_type.unwrap_or_default();
    let essence = content_type_essence(declared);
    if !ACCEPTED_CONTENT_TYPES.contains(&essence.as_str()) {
        let shown = if declared.is_empty() { "(none)" } else { declared };
        return Err(ImageRejection::UnsupportedMediaType(shown.to_string()));
    }
    Ok(())
}

/// Checks the declared content type and size. Does not look at the bytes.
pub fn validate_upload(upload: &ImageUpload) -> Result<(), ImageRejection> {
    check_content_type(upload.content_type.as_deref())?;

    if upload.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageRejection::PayloadTooLarge {
            size: upload.bytes.len(),
            max: MAX_IMAGE_BYTES,
        });
    }

    Ok(())
}

/// Decodes, converts to RGB, resizes and normalizes an image.
pub fn preprocess(bytes: &[u8]) -> Result<ImageTensor, ImageRejection> {
    let decoded = ::image::load_from_memory(bytes)
        .map_err(|e| ImageRejection::InvalidImage(e.to_string()))?;
    debug!(
        "Decoded {}x{} image, resizing to {}x{}",
        decoded.width(),
        decoded.height(),
        MODEL_INPUT_SIZE,
        MODEL_INPUT_SIZE
    );

    let resized = ::image::imageops::resize(
        &decoded.to_rgb8(),
        MODEL_INPUT_SIZE,
        MODEL_INPUT_SIZE,
        FilterType::CatmullRom,
    );

    let data = resized
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 127.5 - 1.0)
        .collect();

    Ok(ImageTensor {
        width: MODEL_INPUT_SIZE,
        height: MODEL_INPUT_SIZE,
        data,
    })
}

/// Index of the largest probability. The first maximum wins; NaN never wins.
pub fn argmax(probabilities: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((i, p)),
        }
    }
    best.map(|(i, _)| i)
}

pub struct ImageEmotionDetector {
    classifier: Arc<dyn ImageClassifier>,
}

impl ImageEmotionDetector {
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn detect(&self, upload: ImageUpload) -> Result<EmotionResult, ImageDetectionError> {
        validate_upload(&upload)?;

        let bytes = upload.bytes;
        let tensor = tokio::task::spawn_blocking(move || preprocess(&bytes))
            .await
            .map_err(|e| ImageRejection::InvalidImage(format!("decoder task failed: {}", e)))??;

        let probabilities = self.classifier.predict(&tensor).await?;
        let result = self.reduce(&probabilities)?;
        info!("Image emotion: {} ({:.3})", result.label, result.confidence);
        Ok(result)
    }

    fn reduce(&self, probabilities: &[f32]) -> Result<EmotionResult, DetectorError> {
        if probabilities.len() != Emotion::ALL.len() {
            return Err(DetectorError::InvalidResponse(format!(
                "{} returned {} probabilities, expected {}",
                self.classifier.name(),
                probabilities.len(),
                Emotion::ALL.len()
            )));
        }
        let idx = argmax(probabilities).ok_or_else(|| {
            DetectorError::InvalidResponse(format!(
                "{} returned no usable probabilities",
                self.classifier.name()
            ))
        })?;
        Ok(EmotionResult::new(
            Emotion::ALL[idx].as_str(),
            probabilities[idx],
        ))
    }
}
