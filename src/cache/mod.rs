//! Disk cache of update-check results.
//!
//! Each environment's last check is stored as one JSON file so that a new
//! run can show statuses immediately and only re-check what changed.

pub mod entry;
pub mod store;

pub use entry::{format_duration, CachedStatus, StatusSnapshot};
pub use store::{CacheStats, StatusCache};

/// Get the default cache directory.
pub fn default_cache_dir() -> std::path::PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("pyscope")
        .join("status")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_dir_valid() {
        let path = default_cache_dir();
        assert!(path.ends_with("pyscope/status"));
    }
}
