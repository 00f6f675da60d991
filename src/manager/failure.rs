//! Structured failure reasons for package actions.
//!
//! Package managers report problems as free text. Known messages from pip
//! and conda are matched against a pattern table, in priority order, to
//! produce an [`ActionFailure`].

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

use crate::shell::{CommandError, CommandResult};

/// Why an install, uninstall, or update did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ActionFailure {
    /// The package (or requested version) does not exist.
    #[error("Package '{package}' not found")]
    NotFound { package: String },

    /// The environment can't be modified by the current user.
    #[error("Permission denied: {detail}")]
    PermissionDenied { detail: String },

    /// The request can't be satisfied alongside installed packages.
    #[error("Dependency conflict: {detail}")]
    DependencyConflict { detail: String },

    /// The package index could not be reached.
    #[error("Network error: {detail}")]
    Network { detail: String },

    /// The package manager ran past its time limit.
    #[error("Timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The package manager could not be started.
    #[error("Package manager unavailable: {detail}")]
    ManagerUnavailable { detail: String },

    /// The request was rejected before running anything.
    #[error("Invalid request: {detail}")]
    InvalidRequest { detail: String },

    /// Anything else.
    #[error("Action failed (exit code {code:?}): {detail}")]
    Other { code: Option<i32>, detail: String },
}

impl ActionFailure {
    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::DependencyConflict { .. } => "dependency_conflict",
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::ManagerUnavailable { .. } => "manager_unavailable",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Other { .. } => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    ManagerUnavailable,
    PermissionDenied,
    Network,
    DependencyConflict,
    NotFound,
}

macro_rules! failure_patterns {
    ($($kind:ident => $pattern:expr),* $(,)?) => {
        vec![$((FailureKind::$kind, Regex::new($pattern).unwrap())),*]
    };
}

/// Checked top to bottom; the first match wins. Network errors come before
/// "not found" because pip reports an unreachable index as a missing version.
static PATTERNS: LazyLock<Vec<(FailureKind, Regex)>> = LazyLock::new(|| {
    failure_patterns![
        ManagerUnavailable => r"No module named pip",
        ManagerUnavailable => r"conda: command not found",
        PermissionDenied => r"(?i)permission ?error",
        PermissionDenied => r"(?i)permission denied",
        PermissionDenied => r"\[Errno 13\]",
        PermissionDenied => r"externally-managed-environment",
        PermissionDenied => r"NotWritableError",
        Network => r"(?i)network is unreachable",
        Network => r"Failed to establish a new connection",
        Network => r"Temporary failure in name resolution",
        Network => r"(?i)connection (?:error|refused|reset|aborted)",
        Network => r"Read timed out",
        Network => r"CondaHTTPError",
        Network => r"SSLError",
        Network => r"ProxyError",
        DependencyConflict => r"ResolutionImpossible",
        DependencyConflict => r"(?i)conflicting dependencies",
        DependencyConflict => r"(?i)dependency conflict",
        DependencyConflict => r"UnsatisfiableError",
        DependencyConflict => r"LibMambaUnsatisfiableError",
        NotFound => r"Could not find a version that satisfies the requirement",
        NotFound => r"No matching distribution found",
        NotFound => r"as it is not installed",
        NotFound => r"PackagesNotFoundError",
        NotFound => r"PackageNotFoundError",
        NotFound => r"PackageNotInstalledError",
    ]
});

const DETAIL_LIMIT: usize = 300;

/// The most telling line of output: the last `ERROR:` line, else the last
/// non-empty line.
fn detail_line(output: &str) -> String {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let line = lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:") || l.contains("Error:"))
        .or_else(|| lines.last())
        .copied()
        .unwrap_or("no output");
    let line = line.strip_prefix("ERROR:").map(str::trim).unwrap_or(line);
    if line.chars().count() > DETAIL_LIMIT {
        let truncated: String = line.chars().take(DETAIL_LIMIT).collect();
        format!("{}…", truncated)
    } else {
        line.to_string()
    }
}

/// Match output text against the known failure messages.
pub fn match_failure(package: &str, output: &str) -> Option<ActionFailure> {
    let kind = PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(output))
        .map(|(kind, _)| *kind)?;
    let detail = detail_line(output);
    Some(match kind {
        FailureKind::ManagerUnavailable => ActionFailure::ManagerUnavailable { detail },
        FailureKind::PermissionDenied => ActionFailure::PermissionDenied { detail },
        FailureKind::Network => ActionFailure::Network { detail },
        FailureKind::DependencyConflict => ActionFailure::DependencyConflict { detail },
        FailureKind::NotFound => ActionFailure::NotFound {
            package: package.to_string(),
        },
    })
}

/// Classify a finished command that exited unsuccessfully.
pub fn classify_failure(package: &str, result: &CommandResult) -> ActionFailure {
    let output = result.combined_output();
    match_failure(package, &output).unwrap_or_else(|| ActionFailure::Other {
        code: result.exit_code,
        detail: detail_line(&output),
    })
}

/// Map a command that never produced a result.
pub fn from_command_error(err: CommandError) -> ActionFailure {
    match err {
        CommandError::Spawn { program, source } => {
            if source.kind() == std::io::ErrorKind::PermissionDenied {
                ActionFailure::PermissionDenied {
                    detail: format!("cannot run {}: {}", program, source),
                }
            } else {
                ActionFailure::ManagerUnavailable {
                    detail: format!("{}: {}", program, source),
                }
            }
        }
        CommandError::TimedOut { after, .. } => ActionFailure::Timeout {
            seconds: after.as_secs(),
        },
        CommandError::Cancelled { program } => ActionFailure::Other {
            code: None,
            detail: format!("{} was cancelled", program),
        },
    }
}
