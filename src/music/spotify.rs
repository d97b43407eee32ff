//! Spotify Web API client for genre track search.
//!
//! Authenticates with the client-credentials flow. The access token is reused
//! until shortly before it expires; search results are never cached.

use super::{MusicSearch, MusicSearchError, Track};
use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com";

/// Spotify caps the search page size.
const MAX_SEARCH_LIMIT: usize = 50;

/// Refresh the token this long before Spotify says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

pub struct SpotifyClient {
    client: Client,
    credentials: SpotifyCredentials,
    accounts_url: String,
    api_url: String,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: Option<TracksPage>,
}

#[derive(Deserialize)]
struct TracksPage {
    #[serde(default)]
    items: Vec<Option<SpotifyTrack>>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    name: Option<String>,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: Option<String>,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl SpotifyTrack {
    fn into_track(self) -> Option<Track> {
        let artist = self.artists.into_iter().next()?.name?;
        Some(Track {
            name: self.name?,
            artist,
            url: self.external_urls?.spotify?,
        })
    }
}

impl SpotifyClient {
    /// Create a client against the public Spotify endpoints.
    pub fn new(credentials: SpotifyCredentials, timeout: Duration) -> Result<Self> {
        Self::with_base_urls(credentials, SPOTIFY_ACCOUNTS_URL, SPOTIFY_API_URL, timeout)
    }

    /// Create a client against custom endpoints (proxies, test servers).
    pub fn with_base_urls(
        credentials: SpotifyCredentials,
        accounts_url: &str,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            credentials,
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, MusicSearchError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref().filter(|t| t.is_fresh()) {
            return Ok(current.value.clone());
        }

        debug!("Requesting new Spotify access token");
        let basic = STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));
        let response = self
            .client
            .post(format!("{}/api/token", self.accounts_url))
            .header("Authorization", format!("Basic {}", basic))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Spotify token request failed with status {}", status);
            return Err(MusicSearchError::Auth(format!("status {}: {}", status, body)));
        }

        let body: TokenResponse = response.json().await?;
        let value = body.access_token.clone();
        *token = Some(AccessToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        });
        Ok(value)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl MusicSearch for SpotifyClient {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn search(&self, genre: &str, limit: usize) -> Result<Vec<Track>, MusicSearchError> {
        if limit == 0 {
            return Ok(vec![]);
        }
        let limit = limit.min(MAX_SEARCH_LIMIT);
        let token = self.access_token().await?;

        let query = format!("genre:\"{}\"", genre);
        let limit_param = limit.to_string();
        let response = self
            .client
            .get(format!("{}/v1/search", self.api_url))
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("type", "track"),
                ("limit", limit_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.forget_token().await;
            return Err(MusicSearchError::Auth("access token rejected".to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MusicSearchError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MusicSearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response.json().await?;
        let items = body.tracks.map(|t| t.items).unwrap_or_default();
        let total = items.len();
        let tracks: Vec<Track> = items
            .into_iter()
            .flatten()
            .filter_map(SpotifyTrack::into_track)
            .take(limit)
            .collect();

        debug!("Kept {} of {} Spotify items", tracks.len(), total);
        Ok(tracks)
    }
}
