//! Configuration loading, merging and validation.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Deep merging in [`merger`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use pyscope::config::{load_config_value, merge_configs, validate, PyscopeConfig};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join(".pyscope.yml");
//! fs::write(&path, "index:\n  max_parallel: 8").unwrap();
//!
//! let merged = merge_configs(&[load_config_value(&path).unwrap()]);
//! let config: PyscopeConfig = serde_yaml::from_value(merged).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.index.max_parallel, 8);
//! ```
//!
//! # Configuration File Locations
//!
//! Layers are merged in this order, later winning:
//! 1. Built-in defaults
//! 2. User global config (`~/.pyscope/config.yml`)
//! 3. Project config (`.pyscope.yml`)
//! 4. File given with `--config`
//! 5. `PYSCOPE_INDEX_URL` and `PYSCOPE_MAX_PARALLEL`

pub mod loader;
pub mod merger;
pub mod schema;
pub mod validator;

pub use schema::{
    CacheConfig, CommandsConfig, DiscoveryConfig, IndexConfig, OutputMode, PyscopeConfig,
};

pub use loader::{
    env_overrides, load_config, load_config_value, load_config_with_env, ConfigPaths,
    PROJECT_CONFIG,
};

pub use merger::{deep_merge, merge_configs};

pub use validator::{validate, validate_config, ValidationError};
