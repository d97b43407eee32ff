use crate::emotion::Emotion;
use std::collections::HashMap;

/// Genre used for labels that have no entry.
pub const FALLBACK_GENRE: &str = "pop";

const FALLBACK: &[&str] = &[FALLBACK_GENRE];

/// Emotion label to candidate genres. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct GenreMap {
    entries: HashMap<String, Vec<String>>,
}

impl Default for GenreMap {
    fn default() -> Self {
        Self::from_entries([
            (Emotion::Happy, &["pop", "dance", "indie"][..]),
            (Emotion::Sad, &["acoustic", "piano", "soul"][..]),
            (Emotion::Angry, &["rock", "metal", "hip-hop"][..]),
            (Emotion::Surprise, &["electronic", "edm", "alternative"][..]),
            (Emotion::Neutral, &["chill", "ambient", "lo-fi"][..]),
        ])
    }
}

impl GenreMap {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (Emotion, &'a [&'a str])>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(emotion, genres)| {
                (
                    emotion.as_str().to_string(),
                    genres.iter().map(|g| g.to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Candidate genres for a label, or the single fallback genre.
    pub fn candidates(&self, label: &str) -> Vec<&str> {
        match self.entries.get(&label.to_lowercase()) {
            Some(genres) if !genres.is_empty() => genres.iter().map(String::as_str).collect(),
            _ => FALLBACK.to_vec(),
        }
    }
}
