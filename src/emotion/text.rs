//! Text emotion detection.

use super::{DetectorError, Emotion, EmotionResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

/// One class of a text classifier's output distribution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// External text classification model.
///
/// Returns a score for every class the model knows. Scores are expected to be
/// softmax-normalized but this is not checked.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, DetectorError>;
}

pub struct TextEmotionDetector {
    classifier: Arc<dyn TextClassifier>,
}

impl TextEmotionDetector {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn detect(&self, text: &str) -> Result<EmotionResult, DetectorError> {
        let scores = self.classifier.classify(text).await?;
        let result = top_label(&scores).ok_or_else(|| {
            DetectorError::InvalidResponse(format!(
                "{} returned an empty distribution",
                self.classifier.name()
            ))
        })?;
        info!("Text emotion: {} ({:.3})", result.label, result.confidence);
        Ok(result)
    }
}

/// Rank of a label for tie-breaking: known emotions first in canonical order,
/// then everything else alphabetically.
fn tie_break_key(label: &str) -> (usize, &str) {
    match Emotion::from_label(label) {
        Some(emotion) => (emotion.index(), ""),
        None => (Emotion::ALL.len(), label),
    }
}

/// Picks the highest scoring pair and lower-cases its label.
pub fn top_label(scores: &[LabelScore]) -> Option<EmotionResult> {
    let lowered: Vec<(String, f32)> = scores
        .iter()
        .filter(|s| !s.score.is_nan())
        .map(|s| (s.label.to_lowercase(), s.score))
        .collect();

    lowered
        .iter()
        .max_by(|(a_label, a_score), (b_label, b_score)| {
            a_score
                .partial_cmp(b_score)
                .unwrap_or(Ordering::Equal)
                // max_by keeps the greater element, so a smaller key must compare greater
                .then_with(|| tie_break_key(b_label).cmp(&tie_break_key(a_label)))
        })
        .map(|(label, score)| EmotionResult::new(label.clone(), *score))
}
