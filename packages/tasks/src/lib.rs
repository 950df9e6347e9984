// ABOUTME: Task lifecycle management
// ABOUTME: Status machine with append-only history, timers, and recurrence

pub mod recurrence;
pub mod storage;
pub mod types;

pub use recurrence::*;
pub use storage::*;
pub use types::*;
