//! Emotion detection.
//!
//! Both detectors reduce the output of an external classifier to a single
//! [`EmotionResult`]: the winning label and its score.

pub mod image;
pub mod text;

pub use self::image::{ImageClassifier, ImageEmotionDetector, ImageRejection, ImageTensor, ImageUpload};
pub use self::text::{LabelScore, TextClassifier, TextEmotionDetector};

use thiserror::Error;

/// The fixed label set of the image model, in the index order of its output vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Angry,
    Happy,
    Sad,
    Neutral,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Angry,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Neutral,
        Emotion::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Neutral => "neutral",
            Emotion::Surprise => "surprise",
        }
    }

    /// Case-insensitive lookup of a label in the fixed set.
    pub fn from_label(label: &str) -> Option<Emotion> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(label))
    }

    /// Position in the canonical ordering, also the image model's output index.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a detector: the top label and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionResult {
    /// Lower-cased label. Always a member of [`Emotion`] for the image path;
    /// the text model may produce labels outside that set.
    pub label: String,
    pub confidence: f32,
}

impl EmotionResult {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    pub fn emotion(&self) -> Option<Emotion> {
        Emotion::from_label(&self.label)
    }
}

/// Failures of a classification collaborator.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for DetectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DetectorError::Timeout
        } else if err.is_decode() {
            DetectorError::InvalidResponse(err.to_string())
        } else {
            DetectorError::Connection(err.to_string())
        }
    }
}
