use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodmate_server::classifiers::{HuggingFaceTextClassifier, TfServingImageClassifier};
use moodmate_server::config::{AppConfig, CliConfig, FileConfig};
use moodmate_server::music::SpotifyClient;
use moodmate_server::{
    run_server, GenreMap, ImageEmotionDetector, MoodPipeline, Recommender, RequestsLoggingLevel,
    ServerConfig, TextEmotionDetector,
};

#[derive(Parser, Debug)]
struct CliArgs {
    /// TOML config file, its values override the flags below.
    #[clap(long)]
    pub config: Option<PathBuf>,

    #[clap(long)]
    pub bind_address: Option<String>,

    #[clap(short, long)]
    pub port: Option<u16>,

    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    #[clap(long)]
    pub collaborator_timeout_sec: Option<u64>,

    #[clap(long)]
    pub recommendation_limit: Option<usize>,

    /// Makes genre picks reproducible.
    #[clap(long)]
    pub genre_seed: Option<u64>,

    /// Answer 502 instead of an empty song list when the music service fails.
    #[clap(long)]
    pub fail_on_recommendation_error: bool,

    #[clap(long)]
    pub text_classifier_url: Option<String>,

    #[clap(long)]
    pub text_model: Option<String>,

    #[clap(long, env = "HF_API_TOKEN", hide_env_values = true)]
    pub hf_api_token: Option<String>,

    #[clap(long)]
    pub image_classifier_url: Option<String>,

    #[clap(long)]
    pub image_model: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub spotify_client_id: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            bind_address: self.bind_address.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            collaborator_timeout_sec: self.collaborator_timeout_sec,
            recommendation_limit: self.recommendation_limit,
            genre_seed: self.genre_seed,
            fail_on_recommendation_error: self.fail_on_recommendation_error,
            text_classifier_url: self.text_classifier_url.clone(),
            text_model: self.text_model.clone(),
            hf_api_token: self.hf_api_token.clone(),
            image_classifier_url: self.image_classifier_url.clone(),
            image_model: self.image_model.clone(),
            spotify_client_id: self.spotify_client_id.clone(),
            spotify_client_secret: self.spotify_client_secret.clone(),
        }
    }
}

fn build_pipeline(config: &AppConfig) -> Result<MoodPipeline> {
    let text_classifier = HuggingFaceTextClassifier::new(
        &config.text_classifier.base_url,
        &config.text_classifier.model,
        config.text_classifier.api_token.clone(),
        config.collaborator_timeout,
    )
    .context("Failed to create text classifier client")?;
    info!(
        "Text emotion model {} at {}",
        config.text_classifier.model, config.text_classifier.base_url
    );

    let image_classifier = TfServingImageClassifier::new(
        &config.image_classifier.base_url,
        &config.image_classifier.model,
        config.collaborator_timeout,
    )
    .context("Failed to create image classifier client")?;
    info!(
        "Image emotion model {} at {}",
        config.image_classifier.model, config.image_classifier.base_url
    );

    let spotify = SpotifyClient::with_base_urls(
        config.spotify.credentials.clone(),
        &config.spotify.accounts_url,
        &config.spotify.api_url,
        config.collaborator_timeout,
    )
    .context("Failed to create Spotify client")?;

    let recommender = Recommender::with_seed(
        GenreMap::default(),
        Arc::new(spotify),
        config.genre_seed,
        config.recommendation_limit,
    );
    if let Some(seed) = config.genre_seed {
        info!("Genre picks seeded with {}", seed);
    }

    Ok(MoodPipeline::new(
        TextEmotionDetector::new(Arc::new(text_classifier)),
        ImageEmotionDetector::new(Arc::new(image_classifier)),
        recommender,
        config.fail_on_recommendation_error,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    info!(
        "MoodMate server {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("MOODMATE_BUILD_HASH")
    );

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let pipeline = Arc::new(build_pipeline(&config)?);

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        frontend_dir_path: config.frontend_dir_path.clone(),
        cors_origins: config.cors_origins.clone(),
        max_request_body_bytes: config.max_request_body_bytes,
    };

    info!("Ready to serve at {}!", config.listen_address());
    run_server(server_config, &config.bind_address, pipeline).await
}
