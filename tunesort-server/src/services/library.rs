//! Library snapshot and genre analysis
//!
//! Fetches the user's liked tracks and playlists, enriches them with
//! artist genre tags, resolves a primary genre per track and computes the
//! genre distribution with grouping suggestions. Read-only: nothing here
//! mutates the user's Spotify account.

use crate::genre::{group_genres, resolve_primary_genre, suggest_groupings, GenreGroup, GroupSuggestion};
use crate::domain::{Playlist, Track};
use crate::spotify::{Gateway, SpotifyError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use tunesort_common::{Error, ProgressBroadcaster, ProgressPhase, Result};

/// Genres with fewer tracks than this trigger a grouping suggestion
pub const SUGGESTION_THRESHOLD: usize = 10;

/// Snapshot of a user's library with genre statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryAnalysis {
    pub tracks: Vec<Track>,
    pub playlists: Vec<Playlist>,
    pub genre_distribution: HashMap<String, usize>,
    pub total_liked_songs: usize,
    pub tracks_with_genre: usize,
    pub tracks_without_genre: usize,
    pub grouping_suggestions: Vec<GroupSuggestion>,
    pub genre_groups: Vec<GenreGroup>,
}

fn wrap(context: &str, err: SpotifyError) -> Error {
    if err.is_auth() {
        Error::Auth(err.to_string())
    } else {
        Error::Internal(format!("{}: {}", context, err))
    }
}

/// Build a full library snapshot, broadcasting progress as phases advance
pub async fn analyze_library(
    gateway: &Gateway,
    broadcaster: &ProgressBroadcaster,
    user_id: &str,
) -> Result<LibraryAnalysis> {
    broadcaster.send_progress(
        user_id,
        ProgressPhase::FetchingLikedSongs,
        0,
        0,
        "Fetching liked songs...",
    );
    let mut tracks = gateway
        .fetch_all_liked_tracks(|current, total| {
            broadcaster.send_progress(
                user_id,
                ProgressPhase::FetchingLikedSongs,
                current,
                total,
                format!("Fetched {} of {} liked songs", current, total),
            );
        })
        .await
        .map_err(|e| wrap("fetching liked songs", e))?;
    info!(user_id, count = tracks.len(), "fetched liked songs");

    broadcaster.send_progress(
        user_id,
        ProgressPhase::FetchingPlaylists,
        0,
        0,
        "Fetching playlists...",
    );
    let mut playlists = gateway
        .fetch_all_playlists()
        .await
        .map_err(|e| wrap("fetching playlists", e))?;
    info!(user_id, count = playlists.len(), "fetched playlists");

    // Current placement of each liked track across managed playlists.
    // A playlist whose contents fail to load is skipped; its memberships
    // just look empty for this snapshot.
    let liked_ids: HashSet<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
    let mut memberships: HashMap<String, Vec<String>> = HashMap::new();
    for playlist in &mut playlists {
        if !playlist.is_managed_by(user_id) {
            continue;
        }
        match gateway.fetch_playlist_track_ids(&playlist.id).await {
            Ok(ids) => {
                for id in &ids {
                    if liked_ids.contains(id.as_str()) {
                        memberships
                            .entry(id.clone())
                            .or_default()
                            .push(playlist.id.clone());
                    }
                }
                playlist.track_ids = ids;
            }
            Err(e) => {
                warn!(playlist_id = %playlist.id, error = %e, "skipping unreadable playlist");
            }
        }
    }
    for track in &mut tracks {
        if let Some(ids) = memberships.get(&track.id) {
            track.in_playlists = ids.clone();
        }
    }

    // Artist genre tags, deduplicated across tracks
    let mut seen = HashSet::new();
    let artist_ids: Vec<String> = tracks
        .iter()
        .flat_map(|t| t.artists.iter())
        .filter(|a| !a.id.is_empty())
        .filter(|a| seen.insert(a.id.clone()))
        .map(|a| a.id.clone())
        .collect();

    broadcaster.send_progress(
        user_id,
        ProgressPhase::FetchingArtists,
        0,
        artist_ids.len(),
        format!("Fetching genre data for {} artists...", artist_ids.len()),
    );
    let artists = gateway
        .batch_fetch_artists(&artist_ids)
        .await
        .map_err(|e| wrap("fetching artists", e))?;

    broadcaster.send_progress(
        user_id,
        ProgressPhase::Analyzing,
        0,
        tracks.len(),
        "Analyzing genres...",
    );
    let mut with_genre = 0;
    let mut without_genre = 0;
    let mut distribution: HashMap<String, usize> = HashMap::new();
    for track in &mut tracks {
        for artist in &mut track.artists {
            if let Some(full) = artists.get(&artist.id) {
                artist.genres = full.genres.clone();
            }
        }
        track.primary_genre =
            resolve_primary_genre(track.artists.iter().map(|a| a.genres.as_slice()));
        if track.primary_genre.is_empty() {
            without_genre += 1;
        } else {
            with_genre += 1;
            *distribution.entry(track.primary_genre.clone()).or_insert(0) += 1;
        }
    }

    let grouping_suggestions = suggest_groupings(&distribution, SUGGESTION_THRESHOLD);
    let genre_groups = group_genres(&distribution);
    info!(
        user_id,
        genres = distribution.len(),
        with_genre,
        without_genre,
        "library analysis complete"
    );

    Ok(LibraryAnalysis {
        total_liked_songs: tracks.len(),
        tracks,
        playlists,
        genre_distribution: distribution,
        tracks_with_genre: with_genre,
        tracks_without_genre: without_genre,
        grouping_suggestions,
        genre_groups,
    })
}
