//! Spotify authorization-code OAuth flow

use crate::spotify::SpotifyError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;

const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

const SCOPES: &str = "user-library-read playlist-read-private playlist-read-collaborative playlist-modify-public playlist-modify-private user-read-private user-read-email";

/// Access and refresh credentials for one user
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// True when the access token has expired or is about to (30s margin)
    pub fn is_expired(&self) -> bool {
        Utc::now() + ChronoDuration::seconds(30) >= self.expires_at
    }
}

/// OAuth client holding the application credentials
#[derive(Debug, Clone)]
pub struct SpotifyAuth {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

impl SpotifyAuth {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_url: String,
        http: reqwest::Client,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_url,
            http,
        }
    }

    /// Build the authorization URL the browser is redirected to
    pub fn authorize_url(&self, state: &str) -> Result<String, SpotifyError> {
        let url = reqwest::Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_url.as_str()),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| SpotifyError::Parse(e.to_string()))?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, SpotifyError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
        ])
        .await
    }

    /// Trade a refresh token for a fresh access token.
    ///
    /// Spotify may omit the refresh token in the response; the caller
    /// keeps the old one in that case.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, SpotifyError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, SpotifyError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SpotifyError::Parse(e.to_string()))?;
        Ok(TokenSet {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> SpotifyAuth {
        SpotifyAuth::new(
            "client-id".into(),
            "secret".into(),
            "http://localhost:3001/api/auth/callback".into(),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn authorize_url_carries_state_and_scopes() {
        let url = auth().authorize_url("abc123").unwrap();
        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("user-library-read"));
        assert!(url.contains("playlist-modify-private"));
    }

    #[test]
    fn token_expiry_uses_margin() {
        let fresh = TokenSet {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Utc::now() + ChronoDuration::hours(1),
        };
        assert!(!fresh.is_expired());

        let nearly = TokenSet {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Utc::now() + ChronoDuration::seconds(10),
        };
        assert!(nearly.is_expired());
    }
}
