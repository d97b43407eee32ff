mod file_config;

pub use file_config::{FileConfig, ImageClassifierConfig, SpotifyConfig, TextClassifierConfig};

use crate::classifiers::{DEFAULT_HF_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use crate::music::spotify::{SPOTIFY_ACCOUNTS_URL, SPOTIFY_API_URL};
use crate::music::{SpotifyCredentials, DEFAULT_RECOMMENDATION_LIMIT};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;
pub const DEFAULT_COLLABORATOR_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_IMAGE_CLASSIFIER_URL: &str = "http://127.0.0.1:8501";
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Spotify caps search results per page.
const MAX_RECOMMENDATION_LIMIT: usize = 50;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub collaborator_timeout_sec: Option<u64>,
    pub recommendation_limit: Option<usize>,
    pub genre_seed: Option<u64>,
    pub fail_on_recommendation_error: bool,
    pub text_classifier_url: Option<String>,
    pub text_model: Option<String>,
    pub hf_api_token: Option<String>,
    pub image_classifier_url: Option<String>,
    pub image_model: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub bind_address: String,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub max_request_body_bytes: usize,
    pub collaborator_timeout: Duration,
    pub cors_origins: Vec<String>,

    // Recommendation behavior
    pub recommendation_limit: usize,
    pub genre_seed: Option<u64>,
    pub fail_on_recommendation_error: bool,

    // Collaborators
    pub text_classifier: TextClassifierSettings,
    pub image_classifier: ImageClassifierSettings,
    pub spotify: SpotifySettings,
}

#[derive(Debug, Clone)]
pub struct TextClassifierSettings {
    pub base_url: String,
    pub model: String,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageClassifierSettings {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub credentials: SpotifyCredentials,
    pub accounts_url: String,
    pub api_url: String,
}

/// Treats blank strings as missing.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let bind_address = file
            .bind_address
            .or_else(|| cli.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let port = file.port.or(cli.port).unwrap_or(DEFAULT_PORT);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        if let Some(dir) = &frontend_dir_path {
            let path = PathBuf::from(dir);
            if !path.is_dir() {
                bail!("Frontend directory does not exist: {:?}", path);
            }
        }

        let max_request_body_bytes = file
            .max_request_body_bytes
            .unwrap_or(DEFAULT_MAX_REQUEST_BODY_BYTES);
        let collaborator_timeout_sec = file
            .collaborator_timeout_sec
            .or(cli.collaborator_timeout_sec)
            .unwrap_or(DEFAULT_COLLABORATOR_TIMEOUT_SEC);
        if collaborator_timeout_sec == 0 {
            bail!("collaborator_timeout_sec must be greater than zero");
        }

        let cors_origins = file.cors_origins.unwrap_or_else(|| {
            DEFAULT_CORS_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect()
        });
        if cors_origins.is_empty() {
            bail!("cors_origins must list at least one origin");
        }
        for origin in &cors_origins {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                bail!("Invalid CORS origin {:?}: expected an http(s) origin", origin);
            }
        }

        let recommendation_limit = file
            .recommendation_limit
            .or(cli.recommendation_limit)
            .unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);
        if recommendation_limit == 0 || recommendation_limit > MAX_RECOMMENDATION_LIMIT {
            bail!(
                "recommendation_limit must be between 1 and {}, got {}",
                MAX_RECOMMENDATION_LIMIT,
                recommendation_limit
            );
        }
        let genre_seed = file.genre_seed.or(cli.genre_seed);
        let fail_on_recommendation_error = file
            .fail_on_recommendation_error
            .unwrap_or(cli.fail_on_recommendation_error);

        let text_file = file.text_classifier.unwrap_or_default();
        let text_classifier = TextClassifierSettings {
            base_url: text_file
                .base_url
                .or_else(|| cli.text_classifier_url.clone())
                .unwrap_or_else(|| DEFAULT_HF_BASE_URL.to_string()),
            model: text_file
                .model
                .or_else(|| cli.text_model.clone())
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            api_token: non_blank(text_file.api_token.or_else(|| cli.hf_api_token.clone())),
        };

        let image_file = file.image_classifier.unwrap_or_default();
        let image_classifier = ImageClassifierSettings {
            base_url: image_file
                .base_url
                .or_else(|| cli.image_classifier_url.clone())
                .unwrap_or_else(|| DEFAULT_IMAGE_CLASSIFIER_URL.to_string()),
            model: image_file
                .model
                .or_else(|| cli.image_model.clone())
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
        };

        let spotify_file = file.spotify.unwrap_or_default();
        let client_id = non_blank(
            spotify_file
                .client_id
                .or_else(|| cli.spotify_client_id.clone()),
        );
        let client_secret = non_blank(
            spotify_file
                .client_secret
                .or_else(|| cli.spotify_client_secret.clone()),
        );
        let credentials = match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => SpotifyCredentials {
                client_id,
                client_secret,
            },
            _ => bail!(
                "Spotify credentials missing: set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET \
                 or the [spotify] section of the config file"
            ),
        };
        let spotify = SpotifySettings {
            credentials,
            accounts_url: spotify_file
                .accounts_url
                .unwrap_or_else(|| SPOTIFY_ACCOUNTS_URL.to_string()),
            api_url: spotify_file
                .api_url
                .unwrap_or_else(|| SPOTIFY_API_URL.to_string()),
        };

        Ok(Self {
            bind_address,
            port,
            logging_level,
            frontend_dir_path,
            max_request_body_bytes,
            collaborator_timeout: Duration::from_secs(collaborator_timeout_sec),
            cors_origins,
            recommendation_limit,
            genre_seed,
            fail_on_recommendation_error,
            text_classifier,
            image_classifier,
            spotify,
        })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
