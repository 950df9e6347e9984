// ABOUTME: Per-user settings management with database persistence
// ABOUTME: Versioned configuration blob with explicit defaults merged on read

pub mod storage;
pub mod types;

pub use storage::*;
pub use types::*;
