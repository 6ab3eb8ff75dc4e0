//! Capability surface consumed from the external streaming service
//!
//! One trait method per wire primitive: single pages and single batches.
//! The [`Gateway`](super::Gateway) composes these into whole-library
//! fetches and batched mutations; nothing above the gateway calls the
//! trait directly.

use crate::domain::{Artist, Playlist, Track};
use crate::spotify::SpotifyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One page of a paginated fetch
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total item count across all pages
    pub total: usize,
    /// Cursor for the next page; `None` on the last page
    pub next: Option<String>,
}

/// Current-user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}

/// Wire primitives of the streaming service, one call per method.
///
/// Implementations must not retry, paginate or rate limit; that is the
/// gateway's job.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// One page of the user's liked tracks
    async fn liked_tracks_page(&self, limit: usize, offset: usize)
        -> Result<Page<Track>, SpotifyError>;

    /// One page of the user's playlists
    async fn playlists_page(&self, limit: usize, offset: usize)
        -> Result<Page<Playlist>, SpotifyError>;

    /// One page of a playlist's member track IDs
    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<String>, SpotifyError>;

    /// Metadata for up to 50 artists
    async fn artists_batch(&self, ids: &[String]) -> Result<Vec<Artist>, SpotifyError>;

    /// Create a playlist for a user; the returned playlist carries the
    /// service-issued ID
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<Playlist, SpotifyError>;

    /// Add up to 100 tracks to a playlist
    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyError>;

    /// Remove up to 100 tracks from a playlist
    async fn remove_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyError>;

    /// Delete (unfollow) a playlist
    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), SpotifyError>;

    /// Current user's profile
    async fn current_user(&self) -> Result<UserProfile, SpotifyError>;
}
