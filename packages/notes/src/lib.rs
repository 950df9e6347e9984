// ABOUTME: Markdown notes for Daybook
// ABOUTME: Owner-scoped CRUD, task links, search, stats, and batch operations

pub mod storage;
pub mod types;

pub use storage::*;
pub use types::*;
