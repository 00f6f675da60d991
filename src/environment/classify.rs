//! Folder-convention classification of interpreters.

use std::path::{Component, Path, PathBuf};

use super::EnvironmentKind;

/// Install roots that determine conda and pyenv classification.
#[derive(Debug, Clone, Default)]
pub struct KnownRoots {
    /// Conda installations (`~/miniconda3`, `~/anaconda3`, `~/.conda`).
    pub conda_roots: Vec<PathBuf>,
    /// pyenv roots containing a `versions` directory.
    pub pyenv_roots: Vec<PathBuf>,
    /// `$CONDA_PREFIX`, if a conda environment is active.
    pub active_conda: Option<PathBuf>,
}

/// Directory holding the interpreter's packages (`sys.prefix`).
///
/// `<prefix>/bin/python` on Unix and `<prefix>\Scripts\python.exe` for
/// Windows venvs; Windows base installs keep `python.exe` in the prefix.
pub fn prefix_of(interpreter: &Path) -> PathBuf {
    let Some(dir) = interpreter.parent() else {
        return PathBuf::new();
    };
    let is_bin = dir
        .file_name()
        .map(|n| n.to_string_lossy())
        .is_some_and(|n| n == "bin" || n.eq_ignore_ascii_case("Scripts"));
    match dir.parent() {
        Some(parent) if is_bin => parent.to_path_buf(),
        _ => dir.to_path_buf(),
    }
}

/// Find the interpreter inside a prefix directory, if any.
pub fn interpreter_in_prefix(prefix: &Path) -> Option<PathBuf> {
    let candidates: &[&str] = if cfg!(windows) {
        &["python.exe", "Scripts/python.exe"]
    } else {
        &["bin/python3", "bin/python"]
    };
    candidates
        .iter()
        .map(|c| prefix.join(c))
        .find(|p| p.is_file())
}

/// Classify an interpreter by the layout around it.
///
/// Deterministic for a given filesystem: the same path and roots always
/// produce the same kind.
pub fn classify(interpreter: &Path, roots: &KnownRoots) -> EnvironmentKind {
    let prefix = prefix_of(interpreter);

    if prefix.join("conda-meta").is_dir() || is_conda_env_path(&prefix, roots) {
        return EnvironmentKind::Conda;
    }
    if is_pyenv_path(&prefix, roots) {
        return EnvironmentKind::Pyenv;
    }
    if prefix.join("pyvenv.cfg").is_file() {
        return EnvironmentKind::Venv;
    }
    EnvironmentKind::System
}

fn components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect()
}

// `.../envs/<name>` under a conda root, or under any directory whose name
// says anaconda/miniconda.
fn is_conda_env_path(prefix: &Path, roots: &KnownRoots) -> bool {
    let parts = components(prefix);
    let Some(envs_idx) = parts.iter().rposition(|p| p == "envs") else {
        return false;
    };
    if envs_idx + 1 >= parts.len() {
        return false;
    }
    if roots.conda_roots.iter().any(|r| prefix.starts_with(r)) {
        return true;
    }
    parts[..envs_idx]
        .iter()
        .any(|p| p.contains("anaconda") || p.contains("miniconda") || p == ".conda")
}

// `<root>/versions/<name>` for a pyenv root, or any `.pyenv/versions/<name>`.
fn is_pyenv_path(prefix: &Path, roots: &KnownRoots) -> bool {
    if roots
        .pyenv_roots
        .iter()
        .any(|r| prefix.parent() == Some(r.join("versions").as_path()))
    {
        return true;
    }
    let parts = components(prefix);
    parts
        .windows(3)
        .any(|w| (w[0] == ".pyenv" || w[0] == "pyenv-win") && w[1] == "versions")
}
