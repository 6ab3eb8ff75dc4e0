//! Spotify access: capability trait, rate-limited gateway, HTTP client, OAuth
//!
//! All outbound calls flow through the [`Gateway`], which owns pagination,
//! batch splitting, throttle retry and the shared rate limiter. The
//! [`SpotifyApi`] trait is the seam between the gateway and the wire: the
//! real implementation lives in [`http`], tests substitute an in-memory fake.

pub mod api;
pub mod auth;
pub mod error;
pub mod gateway;
pub mod http;

pub use api::{Page, SpotifyApi, UserProfile};
pub use auth::{SpotifyAuth, TokenSet};
pub use error::SpotifyError;
pub use gateway::{new_rate_limiter, Gateway, SharedRateLimiter};
pub use http::SpotifyHttpApi;
