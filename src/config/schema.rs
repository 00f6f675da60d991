//! Configuration schema for `.pyscope.yml` and `~/.pyscope/config.yml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::environment::LocatorOptions;
use crate::index::{IndexSettings, DEFAULT_INDEX_URL};
use crate::manager::ManagerSettings;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PyscopeConfig {
    /// Output verbosity: verbose, normal, quiet, silent
    pub output: OutputMode,

    /// Package index access
    pub index: IndexConfig,

    /// Environment discovery
    pub discovery: DiscoveryConfig,

    /// Package manager time limits
    pub commands: CommandsConfig,

    /// Status cache
    pub cache: CacheConfig,
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Verbose,
    #[default]
    Normal,
    Quiet,
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Base URL of a PyPI-compatible index
    pub url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Attempts per request
    pub retries: u32,
    /// Concurrent update-check workers
    pub max_parallel: usize,
    /// Minimum spacing between request starts
    pub min_interval_ms: u64,
    /// Consecutive failures before an update check gives up
    pub failure_threshold: usize,
    /// Upper bound for a whole update check
    pub deadline_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_INDEX_URL.to_string(),
            timeout_secs: 10,
            retries: 3,
            max_parallel: 4,
            min_interval_ms: 100,
            failure_threshold: 10,
            deadline_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Additional directories to search for virtual environments
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_roots: Vec<PathBuf>,
    /// How deep to walk below each search root
    pub max_depth: usize,
    /// Ask each interpreter for its version
    pub probe_versions: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extra_roots: Vec::new(),
            max_depth: 3,
            probe_versions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Time limit for listing packages
    pub list_timeout_secs: u64,
    /// Time limit for install/uninstall/update
    pub action_timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            list_timeout_secs: 15,
            action_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Seconds before cached statuses are ignored
    pub ttl_secs: u64,
    /// Cache directory; defaults to the user cache directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            dir: None,
        }
    }
}

impl PyscopeConfig {
    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            url: self.index.url.clone(),
            timeout: Duration::from_secs(self.index.timeout_secs),
            retries: self.index.retries,
            max_parallel: self.index.max_parallel,
            min_interval: Duration::from_millis(self.index.min_interval_ms),
            failure_threshold: self.index.failure_threshold,
            deadline: Duration::from_secs(self.index.deadline_secs),
            ..IndexSettings::default()
        }
    }

    pub fn locator_options(&self) -> LocatorOptions {
        LocatorOptions {
            extra_roots: self.discovery.extra_roots.clone(),
            max_depth: self.discovery.max_depth,
            probe_versions: self.discovery.probe_versions,
            ..LocatorOptions::default()
        }
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            list_timeout: Duration::from_secs(self.commands.list_timeout_secs),
            action_timeout: Duration::from_secs(self.commands.action_timeout_secs),
        }
    }
}
