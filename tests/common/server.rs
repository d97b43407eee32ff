//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own fakes and call counters.

use super::constants::*;
use async_trait::async_trait;
use moodmate_server::emotion::{
    DetectorError, ImageClassifier, ImageEmotionDetector, ImageTensor, LabelScore,
    TextClassifier, TextEmotionDetector,
};
use moodmate_server::music::{GenreMap, MusicSearch, MusicSearchError, Recommender, Track};
use moodmate_server::pipeline::MoodPipeline;
use moodmate_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Calls received by the fakes.
#[derive(Default)]
pub struct CallCounters {
    pub text: AtomicUsize,
    pub image: AtomicUsize,
    pub search: AtomicUsize,
    pub last_image_shape: Mutex<Option<[usize; 4]>>,
    pub last_genre: Mutex<Option<String>>,
}

struct FakeTextClassifier {
    calls: Arc<CallCounters>,
    offline: bool,
}

#[async_trait]
impl TextClassifier for FakeTextClassifier {
    fn name(&self) -> &str {
        "fake-text"
    }

    async fn classify(&self, _text: &str) -> Result<Vec<LabelScore>, DetectorError> {
        self.calls.text.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(DetectorError::Connection("connection refused".to_string()));
        }
        Ok(vec![
            LabelScore::new("Happy", TEXT_TOP_SCORE),
            LabelScore::new("Neutral", 0.05),
            LabelScore::new("Sad", 0.04),
        ])
    }
}

struct FakeImageClassifier {
    calls: Arc<CallCounters>,
    offline: bool,
}

#[async_trait]
impl ImageClassifier for FakeImageClassifier {
    fn name(&self) -> &str {
        "fake-image"
    }

    async fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, DetectorError> {
        self.calls.image.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_image_shape.lock().unwrap() = Some(tensor.shape());
        if self.offline {
            return Err(DetectorError::Timeout);
        }
        Ok(IMAGE_PROBABILITIES.to_vec())
    }
}

struct FakeCatalog {
    calls: Arc<CallCounters>,
    broken: bool,
}

#[async_trait]
impl MusicSearch for FakeCatalog {
    fn name(&self) -> &str {
        "fake-catalog"
    }

    async fn search(&self, genre: &str, limit: usize) -> Result<Vec<Track>, MusicSearchError> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_genre.lock().unwrap() = Some(genre.to_string());
        if self.broken {
            return Err(MusicSearchError::Api {
                status: 500,
                message: "catalog exploded".to_string(),
            });
        }
        Ok((0..limit)
            .map(|i| Track {
                name: format!("{} song {}", genre, i),
                artist: format!("{} artist", genre),
                url: format!("https://open.spotify.test/track/{}-{}", genre, i),
            })
            .collect())
    }
}

/// Knobs for failure scenarios.
#[derive(Default, Clone)]
pub struct TestServerOptions {
    pub detectors_offline: bool,
    pub catalog_broken: bool,
    pub fail_on_recommendation_error: bool,
    pub recommendation_limit: Option<usize>,
}

/// Test server instance
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    pub calls: Arc<CallCounters>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestServerOptions::default()).await
    }

    pub async fn spawn_with(options: TestServerOptions) -> Self {
        let calls = Arc::new(CallCounters::default());

        let recommender = Recommender::with_seed(
            GenreMap::default(),
            Arc::new(FakeCatalog {
                calls: calls.clone(),
                broken: options.catalog_broken,
            }),
            Some(42),
            options.recommendation_limit.unwrap_or(5),
        );
        let pipeline = Arc::new(MoodPipeline::new(
            TextEmotionDetector::new(Arc::new(FakeTextClassifier {
                calls: calls.clone(),
                offline: options.detectors_offline,
            })),
            ImageEmotionDetector::new(Arc::new(FakeImageClassifier {
                calls: calls.clone(),
                offline: options.detectors_offline,
            })),
            recommender,
            options.fail_on_recommendation_error,
        ));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..ServerConfig::default()
        };
        let app = make_app(config, pipeline).expect("Failed to build app");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            calls,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    pub fn text_calls(&self) -> usize {
        self.calls.text.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.calls.image.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.calls.search.load(Ordering::SeqCst)
    }

    /// Waits for the server to become ready by polling the health endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
