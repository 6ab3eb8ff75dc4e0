//! reqwest-backed implementation of the Spotify capability surface
//!
//! Pure wire adapter: builds requests, maps status codes onto
//! [`SpotifyError`], converts wire JSON into domain records. No retry,
//! no pagination, no rate limiting (the gateway owns those).

use crate::domain::{genre_from_name, Artist, Playlist, Track};
use crate::spotify::api::{Page, SpotifyApi, UserProfile};
use crate::spotify::SpotifyError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Credentialed HTTP handle for one user
pub struct SpotifyHttpApi {
    http: reqwest::Client,
    access_token: String,
}

impl SpotifyHttpApi {
    pub fn new(http: reqwest::Client, access_token: String) -> Self {
        Self { http, access_token }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SpotifyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Auth(format!("status {}: {}", status, body)));
        }
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(SpotifyError::Throttled { retry_after });
        }
        let body = response.text().await.unwrap_or_default();
        Err(SpotifyError::Api {
            status: status.as_u16(),
            message: body,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
    ) -> Result<T, SpotifyError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| SpotifyError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SpotifyApi for SpotifyHttpApi {
    async fn liked_tracks_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Page<Track>, SpotifyError> {
        let url = format!("{}/me/tracks?limit={}&offset={}", API_BASE_URL, limit, offset);
        let page: WirePage<WireSavedTrack> = self.get_json(&url).await?;
        Ok(Page {
            items: page
                .items
                .into_iter()
                .filter_map(|item| item.track)
                .filter_map(Track::try_from_wire)
                .collect(),
            total: page.total,
            next: page.next,
        })
    }

    async fn playlists_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Page<Playlist>, SpotifyError> {
        let url = format!("{}/me/playlists?limit={}&offset={}", API_BASE_URL, limit, offset);
        let page: WirePage<WirePlaylist> = self.get_json(&url).await?;
        Ok(Page {
            items: page.items.into_iter().map(WirePlaylist::into_domain).collect(),
            total: page.total,
            next: page.next,
        })
    }

    async fn playlist_items_page(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<String>, SpotifyError> {
        let url = format!(
            "{}/playlists/{}/tracks?limit={}&offset={}&fields=items(track(id)),total,next",
            API_BASE_URL, playlist_id, limit, offset
        );
        let page: WirePage<WirePlaylistItem> = self.get_json(&url).await?;
        Ok(Page {
            items: page
                .items
                .into_iter()
                .filter_map(|item| item.track.and_then(|t| t.id))
                .collect(),
            total: page.total,
            next: page.next,
        })
    }

    async fn artists_batch(&self, ids: &[String]) -> Result<Vec<Artist>, SpotifyError> {
        let url = format!("{}/artists?ids={}", API_BASE_URL, ids.join(","));
        let body: WireArtistsResponse = self.get_json(&url).await?;
        Ok(body
            .artists
            .into_iter()
            .flatten()
            .map(|a| Artist {
                id: a.id,
                name: a.name,
                genres: a.genres,
            })
            .collect())
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<Playlist, SpotifyError> {
        let url = format!("{}/users/{}/playlists", API_BASE_URL, user_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({
                "name": name,
                "description": description,
                "public": public,
            }))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let playlist: WirePlaylist = response
            .json()
            .await
            .map_err(|e| SpotifyError::Parse(e.to_string()))?;
        Ok(playlist.into_domain())
    }

    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyError> {
        let url = format!("{}/playlists/{}/tracks", API_BASE_URL, playlist_id);
        let uris: Vec<String> = track_ids.iter().map(|id| track_uri(id)).collect();
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "uris": uris }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn remove_playlist_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyError> {
        let url = format!("{}/playlists/{}/tracks", API_BASE_URL, playlist_id);
        let tracks: Vec<serde_json::Value> = track_ids
            .iter()
            .map(|id| json!({ "uri": track_uri(id) }))
            .collect();
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "tracks": tracks }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<(), SpotifyError> {
        // Spotify has no delete; unfollowing an owned playlist removes it
        let url = format!("{}/playlists/{}/followers", API_BASE_URL, playlist_id);
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<UserProfile, SpotifyError> {
        let url = format!("{}/me", API_BASE_URL);
        let body: WireUser = self.get_json(&url).await?;
        Ok(UserProfile {
            id: body.id,
            display_name: body.display_name.unwrap_or_default(),
            email: body.email.unwrap_or_default(),
        })
    }
}

fn track_uri(id: &str) -> String {
    format!("spotify:track:{}", id)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WirePage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    total: usize,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSavedTrack {
    track: Option<WireTrack>,
}

#[derive(Debug, Deserialize)]
struct WireTrack {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    album: WireAlbum,
    #[serde(default)]
    artists: Vec<WireTrackArtist>,
}

#[derive(Debug, Default, Deserialize)]
struct WireAlbum {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<WireImage>,
}

#[derive(Debug, Deserialize)]
struct WireImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct WireTrackArtist {
    id: Option<String>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct WirePlaylistItem {
    track: Option<WirePlaylistItemTrack>,
}

#[derive(Debug, Deserialize)]
struct WirePlaylistItemTrack {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePlaylist {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    owner: WireOwner,
    #[serde(default)]
    tracks: WireTracksRef,
    #[serde(default)]
    images: Option<Vec<WireImage>>,
}

#[derive(Debug, Deserialize)]
struct WireOwner {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireTracksRef {
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct WireArtistsResponse {
    // Entries can be null for unknown IDs
    artists: Vec<Option<WireArtist>>,
}

#[derive(Debug, Deserialize)]
struct WireArtist {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    display_name: Option<String>,
    email: Option<String>,
}

impl WirePlaylist {
    fn into_domain(self) -> Playlist {
        let managed = Playlist::is_managed_description(&self.description);
        let assigned_genre = if managed {
            genre_from_name(&self.name)
        } else {
            String::new()
        };
        Playlist {
            id: self.id,
            image_url: self
                .images
                .unwrap_or_default()
                .first()
                .map(|i| i.url.clone())
                .unwrap_or_default(),
            track_count: self.tracks.total,
            owner_id: self.owner.id,
            managed_by_app: managed,
            assigned_genre,
            name: self.name,
            description: self.description,
            track_ids: Vec::new(),
        }
    }
}

impl Track {
    /// Convert a wire track, dropping local tracks that carry no ID
    fn try_from_wire(wire: WireTrack) -> Option<Track> {
        let id = wire.id?;
        Some(Track {
            id,
            name: wire.name,
            album_name: wire.album.name,
            album_image: wire
                .album
                .images
                .first()
                .map(|i| i.url.clone())
                .unwrap_or_default(),
            duration: wire.duration_ms,
            artists: wire
                .artists
                .into_iter()
                .filter_map(|a| {
                    a.id.map(|id| Artist {
                        id,
                        name: a.name,
                        genres: Vec::new(),
                    })
                })
                .collect(),
            primary_genre: String::new(),
            in_playlists: Vec::new(),
        })
    }
}
