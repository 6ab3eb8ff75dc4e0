//! Configuration loading
//!
//! Settings resolve with ENV > TOML file > compiled default priority.
//! A missing config file is not fatal (warn and continue with defaults);
//! missing Spotify credentials are, since nothing works without them.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub spotify: SpotifyConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address, e.g. "127.0.0.1:3001"
    pub bind: String,
    /// Frontend origin for redirects and CORS
    pub frontend_url: String,
}

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    /// Shared limiter: sustained requests per second
    pub rate_per_sec: u32,
    /// Shared limiter: burst allowance
    pub burst: u32,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session lifetime in hours
    pub ttl_hours: u64,
}

/// On-disk TOML schema; every field optional so partial files work
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub bind: Option<String>,
    pub frontend_url: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_redirect_url: Option<String>,
    pub spotify_rate_per_sec: Option<u32>,
    pub spotify_burst: Option<u32>,
    pub session_ttl_hours: Option<u64>,
}

impl Config {
    /// Load configuration from the default path with env overrides
    pub fn load() -> Result<Self> {
        let toml_config = match default_config_path() {
            Some(path) if path.exists() => load_toml(&path)?,
            Some(path) => {
                warn!("Config file not found at {}, using env + defaults", path.display());
                TomlConfig::default()
            }
            None => {
                warn!("Could not determine config directory, using env + defaults");
                TomlConfig::default()
            }
        };
        Self::resolve(toml_config)
    }

    /// Resolve a TOML layer with env overrides and validate
    pub fn resolve(toml: TomlConfig) -> Result<Self> {
        let config = Config {
            server: ServerConfig {
                bind: env_or("TUNESORT_BIND", toml.bind, "127.0.0.1:3001"),
                frontend_url: env_or(
                    "TUNESORT_FRONTEND_URL",
                    toml.frontend_url,
                    "http://localhost:3000",
                ),
            },
            spotify: SpotifyConfig {
                client_id: env_or("TUNESORT_SPOTIFY_CLIENT_ID", toml.spotify_client_id, ""),
                client_secret: env_or(
                    "TUNESORT_SPOTIFY_CLIENT_SECRET",
                    toml.spotify_client_secret,
                    "",
                ),
                redirect_url: env_or(
                    "TUNESORT_SPOTIFY_REDIRECT_URL",
                    toml.spotify_redirect_url,
                    "http://localhost:3001/api/auth/callback",
                ),
                rate_per_sec: env_parse_or("TUNESORT_SPOTIFY_RATE", toml.spotify_rate_per_sec, 2),
                burst: env_parse_or("TUNESORT_SPOTIFY_BURST", toml.spotify_burst, 5),
            },
            session: SessionConfig {
                ttl_hours: env_parse_or("TUNESORT_SESSION_TTL_HOURS", toml.session_ttl_hours, 24),
            },
        };

        if config.spotify.client_id.trim().is_empty()
            || config.spotify.client_secret.trim().is_empty()
        {
            return Err(Error::Config(
                "Spotify credentials not configured. Set TUNESORT_SPOTIFY_CLIENT_ID and \
                 TUNESORT_SPOTIFY_CLIENT_SECRET (or spotify_client_id / spotify_client_secret \
                 in the config file)."
                    .to_string(),
            ));
        }
        if config.spotify.rate_per_sec == 0 {
            return Err(Error::Config("spotify_rate_per_sec must be non-zero".to_string()));
        }
        if config.spotify.burst == 0 {
            return Err(Error::Config("spotify_burst must be non-zero".to_string()));
        }

        Ok(config)
    }
}

/// Default config file path: `<config_dir>/tunesort/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunesort").join("config.toml"))
}

fn load_toml(path: &PathBuf) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let parsed = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(parsed)
}

fn env_or(var: &str, toml_value: Option<String>, default: &str) -> String {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => toml_value.unwrap_or_else(|| default.to_string()),
    }
}

fn env_parse_or<T: std::str::FromStr + Copy>(var: &str, toml_value: Option<T>, default: T) -> T {
    if let Ok(raw) = std::env::var(var) {
        if let Ok(parsed) = raw.parse() {
            return parsed;
        }
        warn!("Ignoring unparseable value in {}", var);
    }
    toml_value.unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_toml() -> TomlConfig {
        TomlConfig {
            spotify_client_id: Some("id".to_string()),
            spotify_client_secret: Some("secret".to_string()),
            ..TomlConfig::default()
        }
    }

    #[test]
    fn resolve_applies_defaults() {
        let config = Config::resolve(base_toml()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3001");
        assert_eq!(config.spotify.rate_per_sec, 2);
        assert_eq!(config.spotify.burst, 5);
        assert_eq!(config.session.ttl_hours, 24);
    }

    #[test]
    fn missing_credentials_is_an_error() {
        let toml = TomlConfig::default();
        assert!(Config::resolve(toml).is_err());
    }

    #[test]
    fn toml_values_override_defaults() {
        let mut toml = base_toml();
        toml.bind = Some("0.0.0.0:8080".to_string());
        toml.spotify_rate_per_sec = Some(4);
        let config = Config::resolve(toml).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.spotify.rate_per_sec, 4);
    }

    #[test]
    fn zero_rate_rejected() {
        let mut toml = base_toml();
        toml.spotify_rate_per_sec = Some(0);
        assert!(Config::resolve(toml).is_err());
    }

    #[test]
    fn partial_toml_parses() {
        let parsed: TomlConfig = toml::from_str(r#"bind = "127.0.0.1:9999""#).unwrap();
        assert_eq!(parsed.bind.as_deref(), Some("127.0.0.1:9999"));
        assert!(parsed.spotify_client_id.is_none());
    }
}
