//! Python environment discovery.
//!
//! An [`Environment`] is one Python interpreter plus the prefix directory it
//! manages packages in. Environments are found by the [`EnvironmentLocator`],
//! which walks OS-conventional locations, classifies each interpreter by its
//! folder layout, and deduplicates interpreters that share a prefix.
//!
//! # Example
//!
//! ```no_run
//! use pyscope::environment::{EnvironmentLocator, LocatorOptions, SearchPlan};
//!
//! let options = LocatorOptions::default();
//! let locator = EnvironmentLocator::new(SearchPlan::for_host(&options), &options);
//! let discovery = locator.discover();
//! for env in &discovery.environments {
//!     println!("{} {}", env.label, env.interpreter.display());
//! }
//! ```

mod classify;
mod interpreter;
mod locator;
mod select;

pub use classify::{classify, interpreter_in_prefix, prefix_of, KnownRoots};
pub use interpreter::probe_version;
pub use locator::{
    is_python_executable_name, Discovery, EnvironmentLocator, LocatorOptions, ScanIssue,
    SearchPlan,
};
pub use select::{default_interpreter, select_environment};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of Python environment, in display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    System,
    Venv,
    Conda,
    Pyenv,
}

impl EnvironmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Venv => "venv",
            Self::Conda => "conda",
            Self::Pyenv => "pyenv",
        }
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered Python environment.
///
/// Identity is the interpreter path. Values are immutable once discovered;
/// a rescan produces new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Interpreter executable.
    pub interpreter: PathBuf,
    /// Environment kind.
    pub kind: EnvironmentKind,
    /// Human-readable label.
    pub label: String,
    /// Prefix directory (`sys.prefix`).
    pub prefix: PathBuf,
    /// Interpreter version, when probed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Whether this is the currently activated conda environment.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub active: bool,
}

impl Environment {
    /// Build an environment for an interpreter, classifying it by layout.
    pub fn from_interpreter(interpreter: &Path, roots: &KnownRoots) -> Self {
        let prefix = prefix_of(interpreter);
        let kind = classify(interpreter, roots);
        let active = roots
            .active_conda
            .as_deref()
            .is_some_and(|active| same_path(active, &prefix));
        let mut env = Self {
            interpreter: interpreter.to_path_buf(),
            kind,
            label: String::new(),
            prefix,
            version: None,
            active,
        };
        env.label = env.make_label();
        env
    }

    /// Attach a probed interpreter version.
    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self.label = self.make_label();
        self
    }

    /// Stable identifier used for caches and tickets.
    pub fn id(&self) -> String {
        self.interpreter.display().to_string()
    }

    /// Name of the pyenv version directory, for `PYENV_VERSION`.
    pub fn pyenv_version(&self) -> Option<String> {
        if self.kind != EnvironmentKind::Pyenv {
            return None;
        }
        dir_name(&self.prefix)
    }

    fn make_label(&self) -> String {
        match self.kind {
            EnvironmentKind::Venv => {
                let name = dir_name(&self.prefix).unwrap_or_default();
                let generic = matches!(name.as_str(), "venv" | ".venv" | "env" | ".env");
                match self.prefix.parent().and_then(dir_name) {
                    Some(parent) if generic => format!("venv: {}/{}", parent, name),
                    _ => format!("venv: {}", name),
                }
            }
            EnvironmentKind::Conda => {
                let is_env = self
                    .prefix
                    .parent()
                    .and_then(dir_name)
                    .is_some_and(|p| p == "envs");
                let name = if is_env {
                    dir_name(&self.prefix).unwrap_or_default()
                } else {
                    "base".to_string()
                };
                if self.active {
                    format!("conda: {} (active)", name)
                } else {
                    format!("conda: {}", name)
                }
            }
            EnvironmentKind::Pyenv => {
                format!("pyenv: {}", dir_name(&self.prefix).unwrap_or_default())
            }
            EnvironmentKind::System => {
                let dir = self
                    .interpreter
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                match &self.version {
                    Some(v) => format!("Python {} ({})", v, dir),
                    None => {
                        let file = self
                            .interpreter
                            .file_name()
                            .map(|f| f.to_string_lossy().to_string())
                            .unwrap_or_else(|| "python".to_string());
                        format!("{} ({})", file, dir)
                    }
                }
            }
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.label, self.interpreter.display())
    }
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

/// Compare two paths after resolving symlinks where possible.
pub(crate) fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
