//! Sort plan and execution result records

use super::Track;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The immutable set of mutations computed by diffing a library snapshot
/// against the desired genre-to-playlist mapping.
///
/// A plan is a value object. The one sanctioned mutation after planning is
/// the executor backfilling playlist IDs for playlists it just created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortPlan {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub dry_run: bool,
    pub total_liked_tracks: usize,
    pub tracks_to_add: Vec<TrackMove>,
    pub tracks_to_remove: Vec<TrackMove>,
    /// Genre names (post-grouping) that need a new playlist
    pub playlists_to_create: Vec<String>,
    pub uncategorized_tracks: Vec<Track>,
    pub genre_stats: Vec<GenreStat>,
    /// Parent genres whose children were absorbed when computing this plan
    pub enabled_groups: Vec<String>,
}

/// A single planned addition or removal of a track
///
/// Either the origin (`from_playlist`) or the destination (`to_playlist`
/// or `to_playlist_name`) is set, never neither: an empty origin means the
/// track comes from the liked-songs set, an empty destination ID means the
/// target playlist does not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMove {
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub album_image: String,
    pub genre: String,
    /// Origin playlist ID, empty if from liked songs
    pub from_playlist: String,
    pub from_playlist_name: String,
    /// Destination playlist ID, empty if not yet created
    pub to_playlist: String,
    pub to_playlist_name: String,
    pub reason: String,
}

/// Per-genre planning statistics (computed from the raw, pre-grouping
/// distribution)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreStat {
    pub genre: String,
    pub track_count: usize,
    /// Empty if the playlist needs to be created
    pub playlist_id: String,
    pub is_new: bool,
}

/// Outcome of executing a sort plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// True iff no operation failed
    pub success: bool,
    pub playlists_created: usize,
    pub playlists_deleted: usize,
    pub tracks_added: usize,
    pub tracks_removed: usize,
    pub errors: Vec<ExecutionError>,
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self {
            success: true,
            playlists_created: 0,
            playlists_deleted: 0,
            tracks_added: 0,
            tracks_removed: 0,
            errors: Vec::new(),
        }
    }

    pub fn record_error(&mut self, error: ExecutionError) {
        self.success = false;
        self.errors.push(error);
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A single failed operation during plan execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionError {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist: Option<String>,
    pub error: String,
}

impl ExecutionError {
    pub fn new(operation: &str, error: impl ToString) -> Self {
        Self {
            operation: operation.to_string(),
            track_id: None,
            playlist: None,
            error: error.to_string(),
        }
    }

    pub fn with_playlist(mut self, playlist_id: &str) -> Self {
        self.playlist = Some(playlist_id.to_string());
        self
    }
}
