//! # TuneSort Common Library
//!
//! Shared code for the TuneSort service:
//! - Error types
//! - Progress event types and the per-user broadcaster
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{ProgressBroadcaster, ProgressEvent, ProgressPhase, Subscription};
