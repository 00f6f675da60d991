//! Resolving a user-supplied environment selector.

use std::env::VarError;
use std::path::{Path, PathBuf};

use crate::error::{PyscopeError, Result};

use super::classify::{interpreter_in_prefix, KnownRoots};
use super::{same_path, Environment};

/// Pick one environment by selector.
///
/// A selector is tried, in order, as:
/// 1. a 1-based index into `environments`
/// 2. an interpreter path or prefix directory (discovered or not)
/// 3. a case-insensitive fragment of a label; an exact label wins when
///    several environments match
pub fn select_environment(
    environments: &[Environment],
    selector: &str,
    roots: &KnownRoots,
) -> Result<Environment> {
    let selector = selector.trim();

    if let Ok(index) = selector.parse::<usize>() {
        if index >= 1 && index <= environments.len() {
            return Ok(environments[index - 1].clone());
        }
    }

    let path = Path::new(selector);
    if path.is_file() {
        if let Some(env) = environments
            .iter()
            .find(|e| same_path(&e.interpreter, path))
        {
            return Ok(env.clone());
        }
        return Ok(Environment::from_interpreter(path, roots));
    }
    if path.is_dir() {
        if let Some(env) = environments.iter().find(|e| same_path(&e.prefix, path)) {
            return Ok(env.clone());
        }
        if let Some(python) = interpreter_in_prefix(path) {
            return Ok(Environment::from_interpreter(&python, roots));
        }
    }

    let needle = selector.to_lowercase();
    let matches: Vec<&Environment> = environments
        .iter()
        .filter(|e| e.label.to_lowercase().contains(&needle))
        .collect();

    match matches.as_slice() {
        [] => Err(PyscopeError::EnvironmentNotFound {
            selector: selector.to_string(),
        }),
        [only] => Ok((*only).clone()),
        many => {
            let exact: Vec<_> = many
                .iter()
                .filter(|e| e.label.to_lowercase() == needle)
                .collect();
            match exact.as_slice() {
                [only] => Ok((**only).clone()),
                _ => Err(PyscopeError::AmbiguousEnvironment {
                    selector: selector.to_string(),
                    count: many.len(),
                }),
            }
        }
    }
}

/// Interpreter used when no selector is given.
///
/// An activated virtualenv wins, then an activated conda environment, then
/// the first `python3` or `python` on `PATH`.
pub fn default_interpreter<F>(env_fn: F) -> Option<PathBuf>
where
    F: Fn(&str) -> std::result::Result<String, VarError>,
{
    for var in ["VIRTUAL_ENV", "CONDA_PREFIX"] {
        let found = env_fn(var)
            .ok()
            .filter(|p| !p.is_empty())
            .and_then(|p| interpreter_in_prefix(Path::new(&p)));
        if found.is_some() {
            return found;
        }
    }

    let names: &[&str] = if cfg!(windows) {
        &["python.exe", "python3.exe"]
    } else {
        &["python3", "python"]
    };
    let path = env_fn("PATH").ok()?;
    std::env::split_paths(&path)
        .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
        .find(|p| p.is_file())
}
