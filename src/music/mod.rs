//! Music recommendations.
//!
//! An emotion label is mapped to a handful of candidate genres, one genre is
//! picked at random and the external catalog is searched for tracks of it.

mod genre_map;
mod recommender;
pub mod spotify;

pub use genre_map::{GenreMap, FALLBACK_GENRE};
pub use recommender::{Recommender, DEFAULT_RECOMMENDATION_LIMIT};
pub use spotify::{SpotifyClient, SpotifyCredentials};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A track as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub artist: String,
    pub url: String,
}

/// Failures of the music catalog service.
#[derive(Debug, Error)]
pub enum MusicSearchError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for MusicSearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MusicSearchError::Timeout
        } else if err.is_decode() {
            MusicSearchError::InvalidResponse(err.to_string())
        } else {
            MusicSearchError::Connection(err.to_string())
        }
    }
}

/// External music catalog able to search tracks by genre.
#[async_trait]
pub trait MusicSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Returns at most `limit` tracks matching `genre`, in the service's order.
    async fn search(&self, genre: &str, limit: usize) -> Result<Vec<Track>, MusicSearchError>;
}
