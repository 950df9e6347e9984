// ABOUTME: Tag management for organizing tasks and notes
// ABOUTME: Owner-scoped CRUD with system-tag protection and usage stats

pub mod storage;
pub mod types;

pub use storage::*;
pub use types::*;
