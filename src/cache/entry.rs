//! Cached update-check results.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::inventory::{Package, PackageStatus};

/// Last known check result for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedStatus {
    /// Installed version the result was computed for.
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    pub status: PackageStatus,
}

/// All cached results for one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub environment_id: String,
    pub saved_at: DateTime<Utc>,
    /// Keyed by normalized package name.
    pub packages: BTreeMap<String, CachedStatus>,
}

impl StatusSnapshot {
    /// Snapshot the checked packages of an environment. Unknown statuses
    /// are not worth remembering and are left out.
    pub fn from_packages(environment_id: impl Into<String>, packages: &[Package]) -> Self {
        let packages = packages
            .iter()
            .filter(|p| p.status != PackageStatus::Unknown)
            .map(|p| {
                (
                    p.key(),
                    CachedStatus {
                        version: p.version.clone(),
                        latest: p.latest.clone(),
                        status: p.status,
                    },
                )
            })
            .collect();
        Self {
            environment_id: environment_id.into(),
            saved_at: Utc::now(),
            packages,
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.saved_at)
    }

    /// Whether the snapshot is older than `ttl_secs`.
    pub fn is_expired(&self, ttl_secs: u64) -> bool {
        self.age() > Duration::seconds(ttl_secs as i64)
    }
}

/// Format a duration compactly (`45s`, `30m`, `12h`, `7d`).
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds();

    if secs >= 86400 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
