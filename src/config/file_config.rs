use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
    pub max_request_body_bytes: Option<usize>,
    pub collaborator_timeout_sec: Option<u64>,
    pub cors_origins: Option<Vec<String>>,

    // Recommendation behavior
    pub recommendation_limit: Option<usize>,
    pub genre_seed: Option<u64>,
    pub fail_on_recommendation_error: Option<bool>,

    // Collaborators
    pub text_classifier: Option<TextClassifierConfig>,
    pub image_classifier: Option<ImageClassifierConfig>,
    pub spotify: Option<SpotifyConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TextClassifierConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ImageClassifierConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub accounts_url: Option<String>,
    pub api_url: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_sections() {
        let config = FileConfig::parse(
            r#"
            port = 9000
            cors_origins = ["http://localhost:5173"]
            genre_seed = 11

            [text_classifier]
            model = "someone/other-emotion"

            [spotify]
            client_id = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(9000));
        assert_eq!(
            config.cors_origins,
            Some(vec!["http://localhost:5173".to_string()])
        );
        assert_eq!(config.genre_seed, Some(11));
        assert_eq!(
            config.text_classifier.unwrap().model.as_deref(),
            Some("someone/other-emotion")
        );
        let spotify = config.spotify.unwrap();
        assert_eq!(spotify.client_id.as_deref(), Some("abc"));
        assert!(spotify.client_secret.is_none());
        assert!(config.image_classifier.is_none());
    }

    #[test]
    fn empty_file_is_default() {
        let config = FileConfig::parse("").unwrap();
        assert!(config.port.is_none());
        assert!(config.spotify.is_none());
    }

    #[test]
    fn load_reports_path_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        let err = FileConfig::load(Path::new("/nonexistent/moodmate.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
