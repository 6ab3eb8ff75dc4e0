//! Sort plan execution
//!
//! Applies a plan in five phases: create missing playlists, add tracks,
//! place uncategorized tracks, remove stale memberships, prune empty
//! managed playlists. Every operation is independent; a failure is
//! recorded in the result and execution moves on.

use crate::domain::{ExecutionError, ExecutionResult, Playlist, SortPlan};
use crate::genre::normalize;
use crate::spotify::gateway::TRACK_BATCH;
use crate::spotify::Gateway;
use std::collections::HashMap;
use tracing::{info, warn};
use tunesort_common::{ProgressBroadcaster, ProgressPhase};

const UNCATEGORIZED_NAME: &str = "Uncategorized";
const UNCATEGORIZED_DESCRIPTION: &str = "Songs without a clear genre";

/// Drives one plan through the five execution phases
pub struct PlanExecutor<'a> {
    gateway: &'a Gateway,
    broadcaster: &'a ProgressBroadcaster,
    user_id: &'a str,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(gateway: &'a Gateway, broadcaster: &'a ProgressBroadcaster, user_id: &'a str) -> Self {
        Self {
            gateway,
            broadcaster,
            user_id,
        }
    }

    /// Execute the plan and report what actually happened.
    ///
    /// A dry-run plan performs no calls and returns an empty result.
    pub async fn execute(&self, mut plan: SortPlan) -> ExecutionResult {
        let mut result = ExecutionResult::new();

        if plan.dry_run {
            self.broadcaster
                .send_info(self.user_id, "Dry run: no changes applied");
            return result;
        }

        self.create_playlists(&mut plan, &mut result).await;
        self.add_tracks(&plan, &mut result).await;
        self.place_uncategorized(&plan, &mut result).await;
        self.remove_tracks(&plan, &mut result).await;
        self.prune_empty(&mut result).await;

        info!(
            user_id = self.user_id,
            created = result.playlists_created,
            deleted = result.playlists_deleted,
            added = result.tracks_added,
            removed = result.tracks_removed,
            errors = result.errors.len(),
            "plan execution finished"
        );
        self.broadcaster.send_complete(
            self.user_id,
            format!(
                "Sorting complete: {} playlists created, {} tracks added, {} tracks removed, {} playlists removed",
                result.playlists_created,
                result.tracks_added,
                result.tracks_removed,
                result.playlists_deleted
            ),
        );
        result
    }

    /// Phase 1: create missing playlists, then backfill their IDs into the
    /// plan's pending moves and stats
    async fn create_playlists(&self, plan: &mut SortPlan, result: &mut ExecutionResult) {
        let total = plan.playlists_to_create.len();
        let mut created: HashMap<String, Playlist> = HashMap::new();

        for (index, genre) in plan.playlists_to_create.iter().enumerate() {
            let name = playlist_display_name(genre);
            self.broadcaster.send_progress(
                self.user_id,
                ProgressPhase::CreatingPlaylists,
                index + 1,
                total,
                format!("Creating playlist: {}", name),
            );
            let description = format!("Automatically organized {} tracks", genre);
            match self
                .gateway
                .create_playlist(self.user_id, &name, &description, false)
                .await
            {
                Ok(playlist) => {
                    result.playlists_created += 1;
                    created.insert(normalize(genre), playlist);
                }
                Err(e) => {
                    warn!(genre = %genre, error = %e, "playlist creation failed");
                    result.record_error(
                        ExecutionError::new("create_playlist", e).with_playlist(&name),
                    );
                }
            }
        }

        // Moves planned against not-yet-existing playlists pick up the
        // fresh IDs; moves whose creation failed keep an empty ID and are
        // skipped by the add phase.
        for mv in &mut plan.tracks_to_add {
            if mv.to_playlist.is_empty() {
                if let Some(playlist) = created.get(&normalize(&mv.genre)) {
                    mv.to_playlist = playlist.id.clone();
                    mv.to_playlist_name = playlist.name.clone();
                }
            }
        }
        for stat in &mut plan.genre_stats {
            if stat.playlist_id.is_empty() {
                if let Some(playlist) = created.get(&normalize(&stat.genre)) {
                    stat.playlist_id = playlist.id.clone();
                }
            }
        }
    }

    /// Phase 2: add tracks, grouped per destination playlist
    async fn add_tracks(&self, plan: &SortPlan, result: &mut ExecutionResult) {
        // Destinations keep the order their first move appears in the plan
        let mut order: Vec<String> = Vec::new();
        let mut by_destination: HashMap<String, Vec<String>> = HashMap::new();
        for mv in &plan.tracks_to_add {
            if mv.to_playlist.is_empty() {
                continue;
            }
            if !by_destination.contains_key(&mv.to_playlist) {
                order.push(mv.to_playlist.clone());
            }
            by_destination
                .entry(mv.to_playlist.clone())
                .or_default()
                .push(mv.track_id.clone());
        }

        let total: usize = by_destination.values().map(Vec::len).sum();
        let mut done = 0;
        for playlist_id in &order {
            let track_ids = &by_destination[playlist_id];
            self.broadcaster.send_progress(
                self.user_id,
                ProgressPhase::AddingTracks,
                done,
                total,
                format!("Adding {} tracks...", track_ids.len()),
            );
            match self.gateway.add_tracks(playlist_id, track_ids).await {
                Ok(()) => {
                    done += track_ids.len();
                    result.tracks_added += track_ids.len();
                }
                Err(e) => {
                    warn!(playlist_id = %playlist_id, error = %e, "adding tracks failed");
                    result.record_error(
                        ExecutionError::new("add_tracks", e).with_playlist(playlist_id),
                    );
                }
            }
        }
    }

    /// Phase 3: put genre-less tracks into the Uncategorized playlist,
    /// creating it on first use
    async fn place_uncategorized(&self, plan: &SortPlan, result: &mut ExecutionResult) {
        if plan.uncategorized_tracks.is_empty() {
            return;
        }

        // Refetch to see playlists created in phase 1
        let playlists = match self.gateway.fetch_all_playlists().await {
            Ok(playlists) => playlists,
            Err(e) => {
                result.record_error(ExecutionError::new("fetch_playlists", e));
                return;
            }
        };
        let existing = playlists.iter().find(|p| {
            p.is_managed_by(self.user_id)
                && (normalize(&p.assigned_genre) == "uncategorized" || p.name == UNCATEGORIZED_NAME)
        });

        let target = match existing {
            Some(playlist) => playlist.clone(),
            None => {
                match self
                    .gateway
                    .create_playlist(
                        self.user_id,
                        UNCATEGORIZED_NAME,
                        UNCATEGORIZED_DESCRIPTION,
                        false,
                    )
                    .await
                {
                    Ok(playlist) => {
                        result.playlists_created += 1;
                        playlist
                    }
                    Err(e) => {
                        result.record_error(
                            ExecutionError::new("create_playlist", e)
                                .with_playlist(UNCATEGORIZED_NAME),
                        );
                        return;
                    }
                }
            }
        };

        let track_ids: Vec<String> = plan
            .uncategorized_tracks
            .iter()
            .filter(|t| !t.in_playlists.iter().any(|p| p == &target.id))
            .map(|t| t.id.clone())
            .collect();
        if track_ids.is_empty() {
            return;
        }

        self.broadcaster.send_progress(
            self.user_id,
            ProgressPhase::AddingTracks,
            0,
            track_ids.len(),
            format!("Adding {} uncategorized tracks...", track_ids.len()),
        );
        match self.gateway.add_tracks(&target.id, &track_ids).await {
            Ok(()) => result.tracks_added += track_ids.len(),
            Err(e) => {
                warn!(playlist_id = %target.id, error = %e, "adding uncategorized tracks failed");
                result.record_error(
                    ExecutionError::new("add_uncategorized", e).with_playlist(&target.id),
                );
            }
        }
    }

    /// Phase 4: remove stale memberships, batch by batch so one failed
    /// batch costs at most its own tracks
    async fn remove_tracks(&self, plan: &SortPlan, result: &mut ExecutionResult) {
        let mut order: Vec<String> = Vec::new();
        let mut by_origin: HashMap<String, Vec<String>> = HashMap::new();
        for mv in &plan.tracks_to_remove {
            if mv.from_playlist.is_empty() {
                continue;
            }
            if !by_origin.contains_key(&mv.from_playlist) {
                order.push(mv.from_playlist.clone());
            }
            by_origin
                .entry(mv.from_playlist.clone())
                .or_default()
                .push(mv.track_id.clone());
        }

        let total: usize = by_origin.values().map(Vec::len).sum();
        let mut done = 0;
        for playlist_id in &order {
            for batch in by_origin[playlist_id].chunks(TRACK_BATCH) {
                self.broadcaster.send_progress(
                    self.user_id,
                    ProgressPhase::RemovingTracks,
                    done,
                    total,
                    format!("Removing {} tracks...", batch.len()),
                );
                match self.gateway.remove_tracks(playlist_id, batch).await {
                    Ok(()) => {
                        done += batch.len();
                        result.tracks_removed += batch.len();
                    }
                    Err(e) => {
                        warn!(playlist_id = %playlist_id, error = %e, "removing tracks failed");
                        result.record_error(
                            ExecutionError::new("remove_tracks", e).with_playlist(playlist_id),
                        );
                    }
                }
            }
        }
    }

    /// Phase 5: delete managed playlists that ended up empty.
    ///
    /// The Uncategorized playlist is never pruned even when empty.
    async fn prune_empty(&self, result: &mut ExecutionResult) {
        let playlists = match self.gateway.fetch_all_playlists().await {
            Ok(playlists) => playlists,
            Err(e) => {
                result.record_error(ExecutionError::new("fetch_playlists", e));
                return;
            }
        };

        for playlist in playlists {
            if !playlist.is_managed_by(self.user_id)
                || playlist.track_count > 0
                || playlist.name == UNCATEGORIZED_NAME
            {
                continue;
            }
            match self.gateway.delete_playlist(&playlist.id).await {
                Ok(()) => {
                    info!(playlist_id = %playlist.id, name = %playlist.name, "pruned empty playlist");
                    result.playlists_deleted += 1;
                }
                Err(e) => {
                    warn!(playlist_id = %playlist.id, error = %e, "pruning playlist failed");
                    result.record_error(
                        ExecutionError::new("delete_playlist", e).with_playlist(&playlist.id),
                    );
                }
            }
        }
    }
}

/// Title-case a genre for use as a playlist name
pub fn playlist_display_name(genre: &str) -> String {
    genre
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_title_cases_words() {
        assert_eq!(playlist_display_name("indie rock"), "Indie Rock");
        assert_eq!(playlist_display_name("jazz"), "Jazz");
        assert_eq!(playlist_display_name("R&B/Soul"), "R&B/Soul");
    }
}
