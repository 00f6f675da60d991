//! Installed packages of an environment.

mod package;
mod reader;
mod reconcile;

pub use package::{normalize_name, Package, PackageStatus, StatusFilter};
pub use reader::InventoryReader;
pub use reconcile::reconcile;

use thiserror::Error;

/// Why the package list of an environment could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("Package manager unavailable ({command}): {detail}")]
    ManagerUnavailable { command: String, detail: String },

    #[error("{command} failed (exit code {code:?}): {detail}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        detail: String,
    },

    #[error("Could not parse output of {command}: {detail}")]
    MalformedOutput { command: String, detail: String },

    #[error("{command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Package listing was cancelled")]
    Cancelled,
}
