//! Sort plan generation
//!
//! Pure diffing: a snapshot goes in, a plan comes out. No network calls,
//! no side effects, and the output is deterministic for a fixed snapshot
//! (iteration follows track order, ties keep first-seen genres).

use crate::domain::{GenreStat, Playlist, SortPlan, TrackMove};
use crate::genre::{apply_grouping, normalize};
use crate::services::library::LibraryAnalysis;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::info;
use tunesort_common::{Error, Result};
use uuid::Uuid;

/// Diff a library snapshot against the desired genre layout
pub fn generate_sort_plan(
    analysis: &LibraryAnalysis,
    user_id: &str,
    dry_run: bool,
    enabled_groups: &HashSet<String>,
) -> SortPlan {
    // Existing managed playlists keyed by normalized genre
    let managed: HashMap<String, &Playlist> = analysis
        .playlists
        .iter()
        .filter(|p| p.is_managed_by(user_id))
        .map(|p| (normalize(&p.assigned_genre), p))
        .collect();

    let mut tracks_to_add = Vec::new();
    let mut tracks_to_remove = Vec::new();
    let mut uncategorized_tracks = Vec::new();
    // First-seen order of genres that need a playlist
    let mut playlists_to_create: Vec<String> = Vec::new();
    let mut pending: HashSet<String> = HashSet::new();

    for track in &analysis.tracks {
        if track.primary_genre.is_empty() {
            uncategorized_tracks.push(track.clone());
            continue;
        }

        let genre = apply_grouping(&track.primary_genre, enabled_groups);
        let genre_key = normalize(&genre);
        let target = managed.get(&genre_key);
        let target_id = target.map(|p| p.id.as_str()).unwrap_or("");

        let in_target = !target_id.is_empty() && track.in_playlists.iter().any(|p| p == target_id);
        if !in_target {
            if target.is_none() && pending.insert(genre_key.clone()) {
                playlists_to_create.push(genre.clone());
            }
            let reason = if genre == track.primary_genre {
                format!("Primary genre: {}", track.primary_genre)
            } else {
                format!("Grouped into {} (primary genre: {})", genre, track.primary_genre)
            };
            tracks_to_add.push(TrackMove {
                track_id: track.id.clone(),
                track_name: track.name.clone(),
                artist_name: track.primary_artist_name().to_string(),
                album_image: track.album_image.clone(),
                genre: genre.clone(),
                from_playlist: String::new(),
                from_playlist_name: String::new(),
                to_playlist: target_id.to_string(),
                to_playlist_name: target.map(|p| p.name.clone()).unwrap_or_else(|| genre.clone()),
                reason,
            });
        }

        // Memberships are stale only when the playlist's assigned genre
        // differs from the track's effective genre; a second playlist of
        // the same genre keeps its copy even though it is not the target
        for playlist_id in &track.in_playlists {
            if playlist_id == target_id {
                continue;
            }
            let playlist = analysis.playlists.iter().find(|p| &p.id == playlist_id);
            if let Some(p) = playlist {
                if normalize(&p.assigned_genre) == genre_key {
                    continue;
                }
            }
            tracks_to_remove.push(TrackMove {
                track_id: track.id.clone(),
                track_name: track.name.clone(),
                artist_name: track.primary_artist_name().to_string(),
                album_image: track.album_image.clone(),
                genre: genre.clone(),
                from_playlist: playlist_id.clone(),
                from_playlist_name: playlist.map(|p| p.name.clone()).unwrap_or_default(),
                to_playlist: String::new(),
                to_playlist_name: String::new(),
                reason: format!("No longer matches playlist genre, belongs in {}", genre),
            });
        }
    }

    // Stats stay keyed by raw genre; the destination column reflects the
    // grouped target each raw genre lands in.
    let mut genre_stats: Vec<GenreStat> = analysis
        .genre_distribution
        .iter()
        .map(|(genre, &count)| {
            let effective = apply_grouping(genre, enabled_groups);
            let existing = managed.get(&normalize(&effective));
            GenreStat {
                genre: genre.clone(),
                track_count: count,
                playlist_id: existing.map(|p| p.id.clone()).unwrap_or_default(),
                is_new: existing.is_none(),
            }
        })
        .collect();
    genre_stats.sort_by(|a, b| b.track_count.cmp(&a.track_count).then_with(|| a.genre.cmp(&b.genre)));

    let mut enabled: Vec<String> = enabled_groups.iter().cloned().collect();
    enabled.sort();

    let plan = SortPlan {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        dry_run,
        total_liked_tracks: analysis.tracks.len(),
        tracks_to_add,
        tracks_to_remove,
        playlists_to_create,
        uncategorized_tracks,
        genre_stats,
        enabled_groups: enabled,
    };
    info!(
        user_id,
        adds = plan.tracks_to_add.len(),
        removes = plan.tracks_to_remove.len(),
        creates = plan.playlists_to_create.len(),
        uncategorized = plan.uncategorized_tracks.len(),
        "sort plan generated"
    );
    plan
}

/// Reject structurally inconsistent plans before execution
pub fn validate_sort_plan(plan: &SortPlan) -> Result<()> {
    let mut seen_adds = HashSet::new();
    for mv in &plan.tracks_to_add {
        if mv.track_id.is_empty() {
            return Err(Error::InvalidInput("add with empty track id".into()));
        }
        if mv.to_playlist.is_empty() && mv.to_playlist_name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "add for track {} has no destination",
                mv.track_id
            )));
        }
        if !seen_adds.insert((mv.track_id.clone(), mv.to_playlist_name.clone())) {
            return Err(Error::InvalidInput(format!(
                "duplicate add for track {} into {}",
                mv.track_id, mv.to_playlist_name
            )));
        }
    }
    for mv in &plan.tracks_to_remove {
        if mv.from_playlist.is_empty() {
            return Err(Error::InvalidInput(format!(
                "removal for track {} has no origin playlist",
                mv.track_id
            )));
        }
    }
    Ok(())
}

/// Strip moves that target genres the user unchecked in the preview
pub fn apply_disabled_genres(mut plan: SortPlan, disabled: &HashSet<String>) -> SortPlan {
    if disabled.is_empty() {
        return plan;
    }
    let disabled_keys: HashSet<String> = disabled.iter().map(|g| normalize(g)).collect();
    plan.tracks_to_add
        .retain(|mv| !disabled_keys.contains(&normalize(&mv.genre)));
    plan.playlists_to_create
        .retain(|genre| !disabled_keys.contains(&normalize(genre)));
    plan.tracks_to_remove
        .retain(|mv| !disabled_keys.contains(&normalize(&mv.genre)));
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Artist, Track};

    fn track(id: &str, name: &str, genre: &str, in_playlists: &[&str]) -> Track {
        Track {
            id: id.to_string(),
            name: name.to_string(),
            artists: vec![Artist {
                id: format!("artist-{}", id),
                name: "Artist".to_string(),
                genres: vec![genre.to_string()],
            }],
            album_name: String::new(),
            album_image: String::new(),
            duration: 180_000,
            primary_genre: genre.to_string(),
            in_playlists: in_playlists.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn managed_playlist(id: &str, name: &str, owner: &str) -> Playlist {
        Playlist {
            id: id.to_string(),
            name: name.to_string(),
            description: "Tracks [Managed by TuneSort]".to_string(),
            owner_id: owner.to_string(),
            track_count: 0,
            image_url: String::new(),
            managed_by_app: true,
            assigned_genre: name.trim().to_lowercase(),
            track_ids: Vec::new(),
        }
    }

    fn analysis(tracks: Vec<Track>, playlists: Vec<Playlist>) -> LibraryAnalysis {
        let mut distribution: HashMap<String, usize> = HashMap::new();
        for t in &tracks {
            if !t.primary_genre.is_empty() {
                *distribution.entry(t.primary_genre.clone()).or_insert(0) += 1;
            }
        }
        LibraryAnalysis {
            total_liked_songs: tracks.len(),
            tracks,
            playlists,
            genre_distribution: distribution,
            tracks_with_genre: 0,
            tracks_without_genre: 0,
            grouping_suggestions: Vec::new(),
            genre_groups: Vec::new(),
        }
    }

    #[test]
    fn new_genre_yields_create_and_add() {
        let snapshot = analysis(vec![track("t1", "Song", "indie rock", &[])], vec![]);
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());

        assert_eq!(plan.playlists_to_create, vec!["indie rock"]);
        assert_eq!(plan.tracks_to_add.len(), 1);
        assert_eq!(plan.tracks_to_add[0].to_playlist, "");
        assert_eq!(plan.tracks_to_add[0].to_playlist_name, "indie rock");
        assert!(plan.tracks_to_remove.is_empty());
    }

    #[test]
    fn track_already_placed_produces_no_moves() {
        let playlist = managed_playlist("p1", "Indie Rock", "me");
        let snapshot = analysis(
            vec![track("t1", "Song", "indie rock", &["p1"])],
            vec![playlist],
        );
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());

        assert!(plan.tracks_to_add.is_empty());
        assert!(plan.tracks_to_remove.is_empty());
        assert!(plan.playlists_to_create.is_empty());
    }

    #[test]
    fn stale_membership_is_removed() {
        let jazz = managed_playlist("p-jazz", "Jazz", "me");
        let rock = managed_playlist("p-rock", "Indie Rock", "me");
        let snapshot = analysis(
            vec![track("t1", "Song", "indie rock", &["p-jazz"])],
            vec![jazz, rock],
        );
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());

        assert_eq!(plan.tracks_to_add.len(), 1);
        assert_eq!(plan.tracks_to_add[0].to_playlist, "p-rock");
        assert_eq!(plan.tracks_to_remove.len(), 1);
        assert_eq!(plan.tracks_to_remove[0].from_playlist, "p-jazz");
    }

    #[test]
    fn duplicate_same_genre_playlist_keeps_its_copy() {
        // Two managed playlists of the same genre; the track already sits
        // in one of them. Whatever the resolved target, the membership
        // matches the track's genre and must not be drained.
        let first = managed_playlist("p1", "Jazz", "me");
        let second = managed_playlist("p2", "Jazz", "me");
        let snapshot = analysis(
            vec![track("t1", "Song", "jazz", &["p1"])],
            vec![first, second],
        );
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());

        assert!(
            plan.tracks_to_remove.is_empty(),
            "unexpected removals: {:?}",
            plan.tracks_to_remove
                .iter()
                .map(|m| (&m.track_id, &m.from_playlist, &m.reason))
                .collect::<Vec<_>>()
        );
        assert!(plan.playlists_to_create.is_empty());
    }

    #[test]
    fn uncategorized_tracks_are_collected() {
        let snapshot = analysis(vec![track("t1", "Song", "", &[])], vec![]);
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());

        assert_eq!(plan.uncategorized_tracks.len(), 1);
        assert!(plan.tracks_to_add.is_empty());
    }

    #[test]
    fn grouping_routes_children_to_parent() {
        let snapshot = analysis(
            vec![
                track("t1", "A", "indie rock", &[]),
                track("t2", "B", "classic rock", &[]),
            ],
            vec![],
        );
        let enabled: HashSet<String> = HashSet::from(["Rock".to_string()]);
        let plan = generate_sort_plan(&snapshot, "me", false, &enabled);

        assert_eq!(plan.playlists_to_create, vec!["Rock"]);
        assert_eq!(plan.tracks_to_add.len(), 2);
        assert!(plan.tracks_to_add.iter().all(|mv| mv.genre == "Rock"));
        assert!(plan.tracks_to_add[0]
            .reason
            .contains("Grouped into Rock (primary genre: indie rock)"));
        assert_eq!(plan.enabled_groups, vec!["Rock"]);
    }

    #[test]
    fn grouping_pulls_track_out_of_child_playlist() {
        let child = managed_playlist("p-child", "Indie Rock", "me");
        let snapshot = analysis(
            vec![track("t1", "Song", "indie rock", &["p-child"])],
            vec![child],
        );
        let enabled: HashSet<String> = HashSet::from(["Rock".to_string()]);
        let plan = generate_sort_plan(&snapshot, "me", false, &enabled);

        assert_eq!(plan.playlists_to_create, vec!["Rock"]);
        assert_eq!(plan.tracks_to_add.len(), 1);
        assert_eq!(plan.tracks_to_remove.len(), 1);
        assert_eq!(plan.tracks_to_remove[0].from_playlist, "p-child");
    }

    #[test]
    fn foreign_playlists_are_ignored() {
        let mut other = managed_playlist("p1", "Indie Rock", "someone-else");
        other.owner_id = "someone-else".to_string();
        let snapshot = analysis(vec![track("t1", "Song", "indie rock", &[])], vec![other]);
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());

        // The foreign playlist never counts as a target
        assert_eq!(plan.playlists_to_create, vec!["indie rock"]);
    }

    #[test]
    fn create_order_is_first_seen() {
        let snapshot = analysis(
            vec![
                track("t1", "A", "jazz", &[]),
                track("t2", "B", "ambient", &[]),
                track("t3", "C", "jazz", &[]),
            ],
            vec![],
        );
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());
        assert_eq!(plan.playlists_to_create, vec!["jazz", "ambient"]);
    }

    #[test]
    fn stats_sorted_by_count_then_name() {
        let snapshot = analysis(
            vec![
                track("t1", "A", "jazz", &[]),
                track("t2", "B", "jazz", &[]),
                track("t3", "C", "ambient", &[]),
                track("t4", "D", "blues", &[]),
            ],
            vec![],
        );
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());
        let genres: Vec<&str> = plan.genre_stats.iter().map(|s| s.genre.as_str()).collect();
        assert_eq!(genres, vec!["jazz", "ambient", "blues"]);
        assert!(plan.genre_stats.iter().all(|s| s.is_new));
    }

    #[test]
    fn validate_accepts_generated_plan() {
        let snapshot = analysis(vec![track("t1", "Song", "indie rock", &[])], vec![]);
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());
        assert!(validate_sort_plan(&plan).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_adds() {
        let snapshot = analysis(vec![track("t1", "Song", "indie rock", &[])], vec![]);
        let mut plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());
        let dup = plan.tracks_to_add[0].clone();
        plan.tracks_to_add.push(dup);
        assert!(validate_sort_plan(&plan).is_err());
    }

    #[test]
    fn disabled_genre_filters_adds_and_creates() {
        let snapshot = analysis(
            vec![
                track("t1", "A", "jazz", &[]),
                track("t2", "B", "ambient", &[]),
            ],
            vec![],
        );
        let plan = generate_sort_plan(&snapshot, "me", false, &HashSet::new());
        let disabled: HashSet<String> = HashSet::from(["Jazz".to_string()]);
        let filtered = apply_disabled_genres(plan, &disabled);

        assert_eq!(filtered.playlists_to_create, vec!["ambient"]);
        assert_eq!(filtered.tracks_to_add.len(), 1);
        assert_eq!(filtered.tracks_to_add[0].genre, "ambient");
    }

    #[test]
    fn plan_is_deterministic_for_fixed_snapshot() {
        let snapshot = analysis(
            vec![
                track("t1", "A", "jazz", &[]),
                track("t2", "B", "ambient", &[]),
            ],
            vec![],
        );
        let a = generate_sort_plan(&snapshot, "me", false, &HashSet::new());
        let b = generate_sort_plan(&snapshot, "me", false, &HashSet::new());
        assert_eq!(a.playlists_to_create, b.playlists_to_create);
        assert_eq!(a.tracks_to_add.len(), b.tracks_to_add.len());
        let ids_a: Vec<&str> = a.tracks_to_add.iter().map(|m| m.track_id.as_str()).collect();
        let ids_b: Vec<&str> = b.tracks_to_add.iter().map(|m| m.track_id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }
}
