//! Domain model: tracks, playlists, sort plans and execution results

mod plan;
mod playlist;
mod track;

pub use plan::{ExecutionError, ExecutionResult, GenreStat, SortPlan, TrackMove};
pub use playlist::{Playlist, MANAGED_TAG};
pub(crate) use playlist::genre_from_name;
pub use track::{Artist, Track};
