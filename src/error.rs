//! Error types for pyscope operations.
//!
//! This module defines [`PyscopeError`], the primary error type used throughout
//! the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Component errors ([`InventoryError`], [`IndexError`], [`ActionFailure`])
//!   stay typed so callers can degrade per environment or per package
//! - Use `anyhow::Error` (via `PyscopeError::Other`) for unexpected errors
//! - All errors should provide actionable messages for users

use std::path::PathBuf;
use thiserror::Error;

pub use crate::executor::ActionFailure;
pub use crate::index::IndexError;
pub use crate::inventory::InventoryError;

/// Core error type for pyscope operations.
#[derive(Debug, Error)]
pub enum PyscopeError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// No environment matches the selector given by the user.
    #[error("No environment matches '{selector}'")]
    EnvironmentNotFound { selector: String },

    /// Selector matched more than one environment.
    #[error("'{selector}' matches {count} environments; use the index or full path")]
    AmbiguousEnvironment { selector: String, count: usize },

    /// Listing the packages of an environment failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Querying the package index failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// An install, uninstall, or update did not succeed.
    #[error(transparent)]
    Action(#[from] ActionFailure),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PyscopeError {
    /// Process exit code for this error.
    ///
    /// 2 for selection and usage problems, 3 for failed actions, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::EnvironmentNotFound { .. }
            | Self::AmbiguousEnvironment { .. }
            | Self::Index(IndexError::InvalidQuery { .. }) => 2,
            Self::Action(_) => 3,
            _ => 1,
        }
    }
}

/// Result type alias for pyscope operations.
pub type Result<T> = std::result::Result<T, PyscopeError>;
