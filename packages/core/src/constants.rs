use std::env;
use std::path::PathBuf;

/// Current version of the per-user settings blob format
pub const SETTINGS_VERSION: u32 = 1;

/// Get the path to the Daybook directory (~/.daybook)
pub fn daybook_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".daybook")
    } else {
        // Fall back to dirs crate for normal usage
        dirs::home_dir()
            .expect("Unable to get home directory")
            .join(".daybook")
    }
}
