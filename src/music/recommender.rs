use super::{GenreMap, MusicSearch, MusicSearchError, Track, FALLBACK_GENRE};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 5;

/// Turns an emotion label into a list of tracks.
pub struct Recommender {
    genres: GenreMap,
    search: Arc<dyn MusicSearch>,
    rng: Mutex<StdRng>,
    limit: usize,
}

impl Recommender {
    pub fn new(genres: GenreMap, search: Arc<dyn MusicSearch>, rng: StdRng, limit: usize) -> Self {
        Self {
            genres,
            search,
            rng: Mutex::new(rng),
            limit,
        }
    }

    /// Seeded from `seed` when given, from the OS otherwise.
    pub fn with_seed(
        genres: GenreMap,
        search: Arc<dyn MusicSearch>,
        seed: Option<u64>,
        limit: usize,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(genres, search, rng, limit)
    }

    /// Uniformly picks one of the label's candidate genres.
    pub fn pick_genre(&self, label: &str) -> String {
        let candidates = self.genres.candidates(label);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        candidates
            .choose(&mut *rng)
            .copied()
            .unwrap_or(FALLBACK_GENRE)
            .to_string()
    }

    pub async fn recommend(&self, label: &str) -> Result<Vec<Track>, MusicSearchError> {
        self.recommend_with_limit(label, self.limit).await
    }

    pub async fn recommend_with_limit(
        &self,
        label: &str,
        limit: usize,
    ) -> Result<Vec<Track>, MusicSearchError> {
        let genre = self.pick_genre(label);
        debug!("Searching {} for genre {:?}", self.search.name(), genre);

        let mut tracks = self.search.search(&genre, limit).await?;
        tracks.truncate(limit);

        info!(
            "Recommending {} tracks for emotion {} (genre {})",
            tracks.len(),
            label,
            genre
        );
        Ok(tracks)
    }
}
