//! Liked track and artist records

use serde::{Deserialize, Serialize};

/// A liked track, the unit being placed into playlists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<Artist>,
    pub album_name: String,
    pub album_image: String,
    /// Duration in milliseconds
    pub duration: u64,
    /// Resolved primary genre; empty when no artist carries usable tags
    pub primary_genre: String,
    /// Managed playlists this track currently belongs to (playlist IDs)
    pub in_playlists: Vec<String>,
}

impl Track {
    /// Display name of the first credited artist, empty if none
    pub fn primary_artist_name(&self) -> &str {
        self.artists.first().map(|a| a.name.as_str()).unwrap_or("")
    }
}

/// A contributing artist with its raw genre tags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}
