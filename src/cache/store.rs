//! On-disk status cache, one JSON file per environment.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::entry::StatusSnapshot;
use crate::inventory::Package;

/// Entry count and disk usage of the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub size_bytes: u64,
}

/// Stores update-check results so a restart doesn't start from unknown.
#[derive(Debug, Clone)]
pub struct StatusCache {
    root: PathBuf,
    ttl_secs: u64,
}

impl StatusCache {
    pub fn new(root: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self {
            root: root.into(),
            ttl_secs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create cache directory {:?}", self.root))
    }

    /// File holding an environment's snapshot.
    pub fn path_for(&self, environment_id: &str) -> PathBuf {
        let hash = Sha256::digest(environment_id.as_bytes());
        self.root.join(format!("{}.json", hex::encode(&hash[..16])))
    }

    /// Load the snapshot for an environment.
    ///
    /// Expired or unreadable snapshots are deleted and reported as absent.
    pub fn load(&self, environment_id: &str) -> Result<Option<StatusSnapshot>> {
        let path = self.path_for(environment_id);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file {:?}", path))?;
        let snapshot = match serde_json::from_str::<StatusSnapshot>(&json) {
            Ok(snapshot) if snapshot.environment_id == environment_id => snapshot,
            Ok(_) | Err(_) => {
                tracing::debug!("Discarding unusable cache file {:?}", path);
                let _ = fs::remove_file(&path);
                return Ok(None);
            }
        };

        if snapshot.is_expired(self.ttl_secs) {
            tracing::debug!("Cache for {} expired", environment_id);
            let _ = fs::remove_file(&path);
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// Save the checked statuses of an environment.
    pub fn save(&self, environment_id: &str, packages: &[Package]) -> Result<StatusSnapshot> {
        self.ensure_dir()?;
        let snapshot = StatusSnapshot::from_packages(environment_id, packages);
        let path = self.path_for(environment_id);
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&path, json).with_context(|| format!("Failed to write cache file {:?}", path))?;
        tracing::debug!(
            "Cached {} statuses for {}",
            snapshot.packages.len(),
            environment_id
        );
        Ok(snapshot)
    }

    /// Remove one environment's snapshot.
    pub fn remove(&self, environment_id: &str) -> Result<bool> {
        let path = self.path_for(environment_id);
        if path.exists() {
            fs::remove_file(&path)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Remove every snapshot. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.files()? {
            if fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for path in self.files()? {
            stats.entries += 1;
            stats.size_bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let expired = fs::read_to_string(&path)
                .ok()
                .and_then(|json| serde_json::from_str::<StatusSnapshot>(&json).ok())
                .is_none_or(|s| s.is_expired(self.ttl_secs));
            if expired {
                stats.expired += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::PackageStatus;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn outdated(name: &str) -> Package {
        Package {
            name: name.to_string(),
            version: "1.0".to_string(),
            latest: Some("2.0".to_string()),
            status: PackageStatus::Outdated,
        }
    }

    #[test]
    fn save_and_load() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::new(temp.path(), 3600);

        cache.save("/usr/bin/python3", &[outdated("requests")]).unwrap();
        let loaded = cache.load("/usr/bin/python3").unwrap().unwrap();
        assert_eq!(loaded.packages["requests"].status, PackageStatus::Outdated);
    }

    #[test]
    fn environments_get_separate_files() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::new(temp.path(), 3600);
        assert_ne!(cache.path_for("/a/python"), cache.path_for("/b/python"));
        assert!(cache
            .path_for("/a/python")
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with(".json"));
    }

    #[test]
    fn missing_entry_is_none() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::new(temp.path(), 3600);
        assert!(cache.load("/nowhere/python").unwrap().is_none());
    }

    #[test]
    fn expired_entry_is_removed() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::new(temp.path(), 3600);
        let mut snapshot = StatusSnapshot::from_packages("/old/python", &[outdated("x")]);
        snapshot.saved_at = Utc::now() - Duration::hours(3);
        let path = cache.path_for("/old/python");
        fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        assert!(cache.load("/old/python").unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_entry_is_removed() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::new(temp.path(), 3600);
        let path = cache.path_for("/bad/python");
        fs::write(&path, "{ not json").unwrap();

        assert!(cache.load("/bad/python").unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn clear_and_stats() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::new(temp.path(), 3600);
        cache.save("/a/python", &[outdated("a")]).unwrap();
        cache.save("/b/python", &[outdated("b")]).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.expired, 0);
        assert!(stats.size_bytes > 0);

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.stats().unwrap().entries, 0);
    }

    #[test]
    fn stats_on_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::new(temp.path().join("never-created"), 3600);
        assert_eq!(cache.stats().unwrap(), CacheStats::default());
        assert_eq!(cache.clear().unwrap(), 0);
    }

    #[test]
    fn remove_single_entry() {
        let temp = TempDir::new().unwrap();
        let cache = StatusCache::new(temp.path(), 3600);
        cache.save("/a/python", &[outdated("a")]).unwrap();
        assert!(cache.remove("/a/python").unwrap());
        assert!(!cache.remove("/a/python").unwrap());
    }
}
