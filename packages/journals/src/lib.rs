// ABOUTME: Daily journals for Daybook
// ABOUTME: Date-keyed entries, search and habit stats, auto-generation from completed tasks

pub mod generator;
pub mod storage;
pub mod types;

pub use generator::*;
pub use storage::*;
pub use types::*;
