//! Playlist record and the managed-by-app predicate

use serde::{Deserialize, Serialize};

/// Marker appended to the description of every playlist this app creates.
/// Detection by description substring is kept for compatibility with
/// playlists created by earlier versions; all checks go through
/// [`Playlist::is_managed_description`] so the mechanism can be replaced
/// in one place.
pub const MANAGED_TAG: &str = "[Managed by TuneSort]";

/// A playlist hosted by the external service
///
/// An empty `id` means "not yet created": real IDs are only ever issued by
/// the external service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub track_count: usize,
    pub image_url: String,
    /// True iff the description carries the managed marker tag
    pub managed_by_app: bool,
    /// Genre this playlist represents, derived from its name when managed
    pub assigned_genre: String,
    pub track_ids: Vec<String>,
}

impl Playlist {
    /// The single predicate deciding whether a description marks a playlist
    /// as managed by this app.
    pub fn is_managed_description(description: &str) -> bool {
        description.contains(MANAGED_TAG)
    }

    /// Managed and owned by the given user
    pub fn is_managed_by(&self, user_id: &str) -> bool {
        self.managed_by_app && self.owner_id == user_id
    }
}

/// Derive the assigned genre from a managed playlist's name
pub(crate) fn genre_from_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_description_detection() {
        assert!(Playlist::is_managed_description(
            "Automatically organized jazz tracks [Managed by TuneSort]"
        ));
        assert!(!Playlist::is_managed_description("My mixtape"));
    }

    #[test]
    fn managed_requires_ownership() {
        let playlist = Playlist {
            managed_by_app: true,
            owner_id: "alice".to_string(),
            ..Playlist::default()
        };
        assert!(playlist.is_managed_by("alice"));
        assert!(!playlist.is_managed_by("bob"));
    }

    #[test]
    fn genre_derived_from_name() {
        assert_eq!(genre_from_name(" Indie Rock "), "indie rock");
    }
}
