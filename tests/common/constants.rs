//! Shared constants for end-to-end tests
#![allow(dead_code)]

// ============================================================================
// Fake classifier outputs
// ============================================================================

/// Score the fake text model gives to its top label ("Happy").
pub const TEXT_TOP_SCORE: f32 = 0.91;

/// Probabilities returned by the fake image model, sad wins.
pub const IMAGE_PROBABILITIES: [f32; 5] = [0.05, 0.1, 0.7, 0.1, 0.05];

/// Genres the default genre map associates with "happy".
pub const HAPPY_GENRES: [&str; 3] = ["pop", "dance", "indie"];

/// Genres the default genre map associates with "sad".
pub const SAD_GENRES: [&str; 3] = ["acoustic", "piano", "soul"];

// ============================================================================
// HTTP
// ============================================================================

pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";

pub const DISALLOWED_ORIGIN: &str = "http://elsewhere.test:4000";

pub const HEALTH_MESSAGE: &str = "MoodMate API is running";

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Request body cap of the test server (the default).
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// Timeouts
// ============================================================================

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

pub const REQUEST_TIMEOUT_SECS: u64 = 10;
