//! pyscope - find Python environments and manage their packages.
//!
//! pyscope scans the machine for Python interpreters (system installs,
//! virtualenvs, conda and pyenv environments), lists the packages installed
//! in one of them, checks those packages against the package index, and
//! installs, uninstalls or updates packages through the environment's own
//! package manager.
//!
//! # Modules
//!
//! - [`app`] - Background jobs and per-invocation setup
//! - [`cache`] - Disk cache of update-check results
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, merging, and validation
//! - [`environment`] - Environment discovery and selection
//! - [`error`] - Error types and result aliases
//! - [`executor`] - Install, uninstall and update actions
//! - [`index`] - Package index client, update checks and search
//! - [`inventory`] - Installed packages and their update status
//! - [`manager`] - pip and conda invocation
//! - [`session`] - Active environment state and cancellation
//! - [`shell`] - Process execution
//! - [`ui`] - Prompts, spinners, and terminal output
//!
//! # Example
//!
//! ```
//! use pyscope::index::compare_versions;
//! use pyscope::inventory::PackageStatus;
//!
//! assert_eq!(compare_versions("2.28.0", "2.31.0"), PackageStatus::Outdated);
//! assert_eq!(compare_versions("1.0", "1.0.0"), PackageStatus::Updated);
//! ```

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod index;
pub mod inventory;
pub mod manager;
pub mod session;
pub mod shell;
pub mod ui;

pub use error::{PyscopeError, Result};
