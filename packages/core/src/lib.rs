// ABOUTME: Core utilities shared across all Daybook packages
// ABOUTME: Prefixed id generation, local-day time helpers, data directory

pub mod constants;
pub mod ids;
pub mod time;
pub mod types;

// Re-export constants
pub use constants::{daybook_dir, SETTINGS_VERSION};

// Re-export utilities
pub use ids::prefixed_id;
pub use time::{local_day_bounds, today_local};
pub use types::BatchOutcome;
