//! Rate-limited gateway over the Spotify capability surface
//!
//! Every outbound call acquires the shared token-bucket limiter first
//! (cancellation-aware), then runs under the throttle-retry wrapper.
//! Pagination and batch splitting live here so callers deal in whole
//! collections.

use crate::domain::{Artist, Playlist, Track, MANAGED_TAG};
use crate::spotify::api::{SpotifyApi, UserProfile};
use crate::spotify::SpotifyError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Page size for liked-track / playlist / playlist-item fetches
pub const PAGE_LIMIT: usize = 50;
/// Artist metadata batch limit
pub const ARTIST_BATCH: usize = 50;
/// Playlist add/remove batch limit
pub const TRACK_BATCH: usize = 100;

/// Retry attempts for throttled calls (initial call included)
const MAX_ATTEMPTS: u32 = 3;
/// Backoff when a throttle response carries no Retry-After
const DEFAULT_BACKOFF: Duration = Duration::from_secs(30);

/// Token-bucket limiter shared across every concurrent caller.
///
/// Global rather than per-user, so one user's long run can starve
/// another's. Rate and burst are config tunables.
pub type SharedRateLimiter = Arc<DefaultDirectRateLimiter>;

/// Build the shared limiter from configured rate and burst
pub fn new_rate_limiter(rate_per_sec: u32, burst: u32) -> SharedRateLimiter {
    let rate = NonZeroU32::new(rate_per_sec).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)))
}

/// Per-request gateway: one user's credentialed API handle plus the
/// shared limiter and cancellation token for the request.
pub struct Gateway {
    api: Arc<dyn SpotifyApi>,
    limiter: SharedRateLimiter,
    cancel: CancellationToken,
    max_attempts: u32,
    default_backoff: Duration,
}

impl Gateway {
    pub fn new(api: Arc<dyn SpotifyApi>, limiter: SharedRateLimiter, cancel: CancellationToken) -> Self {
        Self {
            api,
            limiter,
            cancel,
            max_attempts: MAX_ATTEMPTS,
            default_backoff: DEFAULT_BACKOFF,
        }
    }

    /// Override the retry policy (tests use short backoffs)
    pub fn with_retry_policy(mut self, max_attempts: u32, default_backoff: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.default_backoff = default_backoff;
        self
    }

    /// Blocking acquire on the shared limiter; honors caller cancellation.
    /// The sole intentional suspension point for outbound calls.
    async fn acquire(&self) -> Result<(), SpotifyError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SpotifyError::Cancelled),
            _ = self.limiter.until_ready() => Ok(()),
        }
    }

    /// Run one wire call under the limiter and the throttle-retry wrapper
    async fn call<T, F, Fut>(&self, f: F) -> Result<T, SpotifyError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SpotifyError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.acquire().await?;

            match f().await {
                Ok(value) => return Ok(value),
                Err(err @ SpotifyError::Throttled { .. }) if attempt < self.max_attempts => {
                    let backoff = match &err {
                        SpotifyError::Throttled { retry_after: Some(d) } => *d,
                        _ => self.default_backoff,
                    };
                    warn!(attempt, ?backoff, "throttled by Spotify API, backing off");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(SpotifyError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fetch every liked track, page by page, reporting progress after
    /// each page as `(fetched_so_far, total)`
    pub async fn fetch_all_liked_tracks(
        &self,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<Vec<Track>, SpotifyError> {
        let mut tracks = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.call(|| self.api.liked_tracks_page(PAGE_LIMIT, offset)).await?;
            tracks.extend(page.items);
            progress(tracks.len(), page.total);
            if page.next.is_none() {
                break;
            }
            offset += PAGE_LIMIT;
        }

        debug!(count = tracks.len(), "fetched liked tracks");
        Ok(tracks)
    }

    /// Fetch every playlist the user can see
    pub async fn fetch_all_playlists(&self) -> Result<Vec<Playlist>, SpotifyError> {
        let mut playlists = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.call(|| self.api.playlists_page(PAGE_LIMIT, offset)).await?;
            playlists.extend(page.items);
            if page.next.is_none() {
                break;
            }
            offset += PAGE_LIMIT;
        }

        debug!(count = playlists.len(), "fetched playlists");
        Ok(playlists)
    }

    /// Fetch every member track ID of a playlist
    pub async fn fetch_playlist_track_ids(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<String>, SpotifyError> {
        let mut ids = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .call(|| self.api.playlist_items_page(playlist_id, PAGE_LIMIT, offset))
                .await?;
            ids.extend(page.items);
            if page.next.is_none() {
                break;
            }
            offset += PAGE_LIMIT;
        }

        Ok(ids)
    }

    /// Fetch artist metadata in batches of [`ARTIST_BATCH`], keyed by id
    pub async fn batch_fetch_artists(
        &self,
        artist_ids: &[String],
    ) -> Result<HashMap<String, Artist>, SpotifyError> {
        let mut artists = HashMap::with_capacity(artist_ids.len());

        for batch in artist_ids.chunks(ARTIST_BATCH) {
            let fetched = self.call(|| self.api.artists_batch(batch)).await?;
            for artist in fetched {
                artists.insert(artist.id.clone(), artist);
            }
        }

        Ok(artists)
    }

    /// Create a playlist, tagging the description with the managed marker
    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<Playlist, SpotifyError> {
        let full_description = format!("{} {}", description, MANAGED_TAG);
        self.call(|| self.api.create_playlist(user_id, name, &full_description, public))
            .await
    }

    /// Add tracks to a playlist, splitting into batches of [`TRACK_BATCH`].
    /// The first failing batch aborts the remaining batches for this
    /// playlist and surfaces the error.
    pub async fn add_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyError> {
        for batch in track_ids.chunks(TRACK_BATCH) {
            self.call(|| self.api.add_playlist_items(playlist_id, batch)).await?;
        }
        Ok(())
    }

    /// Remove up to [`TRACK_BATCH`] tracks from a playlist; callers that
    /// need per-batch failure isolation chunk before calling
    pub async fn remove_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyError> {
        for batch in track_ids.chunks(TRACK_BATCH) {
            self.call(|| self.api.remove_playlist_items(playlist_id, batch)).await?;
        }
        Ok(())
    }

    /// Delete a playlist
    pub async fn delete_playlist(&self, playlist_id: &str) -> Result<(), SpotifyError> {
        self.call(|| self.api.delete_playlist(playlist_id)).await
    }

    /// Current user's profile
    pub async fn current_user(&self) -> Result<UserProfile, SpotifyError> {
        self.call(|| self.api.current_user()).await
    }
}
