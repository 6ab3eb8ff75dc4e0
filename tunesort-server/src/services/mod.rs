//! Snapshot, plan and execute stages of the reconciliation pipeline

pub mod executor;
pub mod library;
pub mod sorter;

pub use executor::PlanExecutor;
pub use library::{analyze_library, LibraryAnalysis, SUGGESTION_THRESHOLD};
pub use sorter::{apply_disabled_genres, generate_sort_plan, validate_sort_plan};
