// ABOUTME: Project management for Daybook
// ABOUTME: Owner-scoped CRUD, archiving, statistics, and batch operations

pub mod storage;
pub mod types;

pub use storage::*;
pub use types::*;
