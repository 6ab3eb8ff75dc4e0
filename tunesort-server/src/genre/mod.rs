//! Genre taxonomy: normalization, family grouping, and primary-genre resolution
//!
//! Pure functions over strings and count maps; no external calls.

mod grouper;
mod normalizer;

pub use grouper::{
    all_parent_genres, apply_grouping, group_genres, parent_genre, suggest_groupings, GenreGroup,
    GroupSuggestion,
};
pub use normalizer::{normalize, resolve_primary_genre};
