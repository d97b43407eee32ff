//! MoodMate server library
//!
//! Detects an emotion from a short text or a face photo and recommends
//! tracks from a genre matching that emotion.

pub mod classifiers;
pub mod config;
pub mod emotion;
pub mod music;
pub mod pipeline;
pub mod server;

// Re-export commonly used types for convenience
pub use emotion::{Emotion, EmotionResult, ImageEmotionDetector, TextEmotionDetector};
pub use music::{GenreMap, MusicSearch, Recommender, Track};
pub use pipeline::{MoodPipeline, RecommendError, RecommendationRequest, RecommendationResponse};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
