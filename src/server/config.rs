use super::RequestsLoggingLevel;
use crate::config::{DEFAULT_CORS_ORIGINS, DEFAULT_MAX_REQUEST_BODY_BYTES, DEFAULT_PORT};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    pub cors_origins: Vec<String>,
    /// Transport cap; image size rules are enforced by the detector.
    pub max_request_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: DEFAULT_PORT,
            frontend_dir_path: None,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            max_request_body_bytes: DEFAULT_MAX_REQUEST_BODY_BYTES,
        }
    }
}
