//! Package manager backends.
//!
//! Each environment kind is served by a [`PackageManager`]: pip for system
//! interpreters and virtual environments, pip with `PYENV_VERSION` for pyenv
//! versions, and conda for conda environments (falling back to pip when no
//! conda executable can be found).

mod conda;
pub mod failure;
pub mod parser;
mod pip;
pub mod progress;

pub use conda::CondaManager;
pub use failure::{classify_failure, from_command_error, match_failure, ActionFailure};
pub use pip::PipManager;
pub use progress::{parse_progress_line, ProgressEvent};

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::environment::{Environment, EnvironmentKind};
use crate::inventory::{InventoryError, Package};
use crate::session::CancelToken;
use crate::shell::{CommandResult, OutputCallback};

/// A change to one package in one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Install {
        name: String,
        version: Option<String>,
    },
    Uninstall {
        name: String,
    },
    Update {
        name: String,
    },
}

impl Action {
    /// Name of the package the action targets.
    pub fn package(&self) -> &str {
        match self {
            Self::Install { name, .. } | Self::Uninstall { name } | Self::Update { name } => name,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::Uninstall { .. } => "uninstall",
            Self::Update { .. } => "update",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install {
                name,
                version: Some(v),
            } => write!(f, "install {}=={}", name, v),
            _ => write!(f, "{} {}", self.verb(), self.package()),
        }
    }
}

/// Time limits for package manager invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    pub list_timeout: Duration,
    pub action_timeout: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            list_timeout: Duration::from_secs(15),
            action_timeout: Duration::from_secs(300),
        }
    }
}

/// Lists and modifies the packages of one environment.
pub trait PackageManager: Send + Sync {
    /// Short name for messages (`pip`, `conda`).
    fn name(&self) -> &'static str;

    /// Read the installed packages.
    fn list(&self, cancel: &CancelToken) -> Result<Vec<Package>, InventoryError>;

    /// Run an action, streaming output lines to `output` when given.
    fn run(&self, action: &Action, output: Option<OutputCallback>) -> Result<CommandResult, ActionFailure>;

    /// Installed version of a single package, if it is installed.
    fn installed_version(&self, name: &str) -> Option<String>;
}

/// Pick the manager for an environment.
pub fn for_environment(env: &Environment, settings: ManagerSettings) -> Box<dyn PackageManager> {
    for_environment_with_env(env, settings, |key| std::env::var(key).ok())
}

/// Like [`for_environment`] with an injectable environment lookup.
pub fn for_environment_with_env<F>(
    env: &Environment,
    settings: ManagerSettings,
    env_fn: F,
) -> Box<dyn PackageManager>
where
    F: Fn(&str) -> Option<String>,
{
    let pip = PipManager::new(&env.interpreter, settings);
    match env.kind {
        EnvironmentKind::Conda => match find_conda(&env.prefix, &env_fn) {
            Some(conda) => Box::new(CondaManager::new(conda, &env.prefix, pip, settings)),
            None => {
                tracing::debug!("No conda executable for {}, using pip", env.prefix.display());
                Box::new(pip)
            }
        },
        EnvironmentKind::Pyenv => match env.pyenv_version() {
            Some(version) => Box::new(pip.with_pyenv_version(version)),
            None => Box::new(pip),
        },
        EnvironmentKind::System | EnvironmentKind::Venv => Box::new(pip),
    }
}

fn conda_binary_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["Scripts/conda.exe", "condabin/conda.bat"]
    } else {
        &["bin/conda", "condabin/conda"]
    }
}

/// Locate a conda executable able to manage `prefix`.
///
/// Checks `$CONDA_EXE`, the prefix itself (base environments), the
/// installation that owns an `envs/<name>` prefix, and finally `PATH`.
pub fn find_conda<F>(prefix: &Path, env_fn: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(exe) = env_fn("CONDA_EXE").map(PathBuf::from) {
        if exe.is_file() {
            return Some(exe);
        }
    }

    let mut roots = vec![prefix.to_path_buf()];
    if let Some(install) = prefix
        .parent()
        .filter(|p| p.file_name().is_some_and(|n| n == "envs"))
        .and_then(Path::parent)
    {
        roots.push(install.to_path_buf());
    }
    for root in &roots {
        for name in conda_binary_names() {
            let candidate = root.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    let exe = if cfg!(windows) { "conda.exe" } else { "conda" };
    let path = env_fn("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(exe))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn action_display_and_accessors() {
        let install = Action::Install {
            name: "requests".into(),
            version: Some("2.31.0".into()),
        };
        assert_eq!(install.to_string(), "install requests==2.31.0");
        assert_eq!(install.package(), "requests");

        let update = Action::Update { name: "black".into() };
        assert_eq!(update.to_string(), "update black");
        assert_eq!(update.verb(), "update");
    }

    #[test]
    fn default_settings_match_documented_limits() {
        let settings = ManagerSettings::default();
        assert_eq!(settings.list_timeout, Duration::from_secs(15));
        assert_eq!(settings.action_timeout, Duration::from_secs(300));
    }

    #[cfg(unix)]
    #[test]
    fn finds_conda_of_owning_installation() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("miniconda3");
        touch(&install.join("bin/conda"));
        let prefix = install.join("envs/ml");
        fs::create_dir_all(&prefix).unwrap();

        let found = find_conda(&prefix, &|_: &str| None::<String>);
        assert_eq!(found, Some(install.join("bin/conda")));
    }

    #[cfg(unix)]
    #[test]
    fn conda_exe_variable_wins() {
        let temp = TempDir::new().unwrap();
        let exe = temp.path().join("custom/conda");
        touch(&exe);
        let exe_str = exe.display().to_string();
        let found = find_conda(temp.path(), &|key: &str| {
            (key == "CONDA_EXE").then(|| exe_str.clone())
        });
        assert_eq!(found, Some(exe));
    }

    #[cfg(unix)]
    #[test]
    fn missing_conda_is_none() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().display().to_string();
        let found = find_conda(&temp.path().join("envs/x"), &|key: &str| {
            (key == "PATH").then(|| empty.clone())
        });
        assert!(found.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn conda_environment_without_conda_uses_pip() {
        let temp = TempDir::new().unwrap();
        let prefix = temp.path().join("envs/ml");
        fs::create_dir_all(prefix.join("conda-meta")).unwrap();
        let env = Environment {
            interpreter: prefix.join("bin/python"),
            kind: EnvironmentKind::Conda,
            label: "conda: ml".into(),
            prefix,
            version: None,
            active: false,
        };
        let manager = for_environment_with_env(&env, ManagerSettings::default(), |_| None);
        assert_eq!(manager.name(), "pip");
    }
}
