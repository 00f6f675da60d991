//! Configuration file discovery and loading.

use crate::config::merger::merge_configs;
use crate::config::schema::PyscopeConfig;
use crate::error::{PyscopeError, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Project config file name, looked up in the working directory.
pub const PROJECT_CONFIG: &str = ".pyscope.yml";

/// Paths to configuration files in priority order (later overrides earlier).
///
/// Merge order:
/// 1. User global config (`~/.pyscope/config.yml`)
/// 2. Project config (`.pyscope.yml`)
/// 3. File given with `--config`
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// User's global config: ~/.pyscope/config.yml
    pub user_global: Option<PathBuf>,

    /// Project config: ./.pyscope.yml
    pub project: Option<PathBuf>,

    /// Explicit `--config` file; must exist
    pub explicit: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for a working directory.
    pub fn discover(cwd: &Path, explicit: Option<&Path>) -> Self {
        Self::discover_with_home(cwd, explicit, dirs::home_dir())
    }

    /// Discover with a fixed home directory.
    pub fn discover_with_home(cwd: &Path, explicit: Option<&Path>, home: Option<PathBuf>) -> Self {
        let existing = |path: PathBuf| path.is_file().then_some(path);
        Self {
            user_global: home.and_then(|h| existing(h.join(".pyscope").join("config.yml"))),
            project: existing(cwd.join(PROJECT_CONFIG)),
            explicit: explicit.map(Path::to_path_buf),
        }
    }

    /// All paths to load, in merge order.
    pub fn layers(&self) -> Vec<&PathBuf> {
        [&self.user_global, &self.project, &self.explicit]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Load a config file as raw YAML Value (for merging).
///
/// An empty file is an empty mapping.
pub fn load_config_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PyscopeError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PyscopeError::Io(e)
        }
    })?;

    if content.trim().is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }

    serde_yaml::from_str(&content).map_err(|e| PyscopeError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Environment variable overrides as a YAML layer.
pub fn env_overrides<F>(env_fn: F) -> Result<Value>
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    let mut index = Mapping::new();

    if let Ok(url) = env_fn("PYSCOPE_INDEX_URL") {
        if !url.is_empty() {
            index.insert("url".into(), url.trim_end_matches('/').into());
        }
    }
    if let Ok(raw) = env_fn("PYSCOPE_MAX_PARALLEL") {
        let value: u64 = raw
            .trim()
            .parse()
            .map_err(|_| PyscopeError::ConfigValidationError {
                message: format!("PYSCOPE_MAX_PARALLEL must be a number, got '{}'", raw),
            })?;
        index.insert("max_parallel".into(), value.into());
    }

    let mut root = Mapping::new();
    if !index.is_empty() {
        root.insert("index".into(), Value::Mapping(index));
    }
    Ok(Value::Mapping(root))
}

/// Load, merge and parse every layer.
pub fn load_config_with_env<F>(
    cwd: &Path,
    explicit: Option<&Path>,
    home: Option<PathBuf>,
    env_fn: F,
) -> Result<PyscopeConfig>
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    let paths = ConfigPaths::discover_with_home(cwd, explicit, home);

    let mut layers = Vec::new();
    for path in paths.layers() {
        tracing::debug!("Loading config layer {}", path.display());
        layers.push(load_config_value(path)?);
    }
    layers.push(env_overrides(env_fn)?);

    let merged = merge_configs(&layers);
    let source = paths
        .layers()
        .last()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("<environment>"));
    serde_yaml::from_value(merged).map_err(|e| PyscopeError::ConfigParseError {
        path: source,
        message: format!("Failed to parse merged config: {}", e),
    })
}

/// Load the effective configuration for this process.
pub fn load_config(cwd: &Path, explicit: Option<&Path>) -> Result<PyscopeConfig> {
    load_config_with_env(cwd, explicit, dirs::home_dir(), |key: &str| {
        std::env::var(key)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env::VarError;
    use tempfile::TempDir;

    fn no_env(_: &str) -> std::result::Result<String, VarError> {
        Err(VarError::NotPresent)
    }

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> std::result::Result<String, VarError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn no_files_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config_with_env(temp.path(), None, None, no_env).unwrap();
        assert_eq!(config, PyscopeConfig::default());
    }

    #[test]
    fn discover_finds_user_and_project_files() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        fs::create_dir_all(home.path().join(".pyscope")).unwrap();
        fs::write(home.path().join(".pyscope/config.yml"), "").unwrap();
        fs::write(cwd.path().join(PROJECT_CONFIG), "").unwrap();

        let paths =
            ConfigPaths::discover_with_home(cwd.path(), None, Some(home.path().to_path_buf()));
        assert!(paths.user_global.is_some());
        assert!(paths.project.is_some());
        assert_eq!(paths.layers().len(), 2);
    }

    #[test]
    fn layers_override_in_order() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        fs::create_dir_all(home.path().join(".pyscope")).unwrap();
        fs::write(
            home.path().join(".pyscope/config.yml"),
            "output: verbose\nindex:\n  retries: 5\n  max_parallel: 2\n",
        )
        .unwrap();
        fs::write(cwd.path().join(PROJECT_CONFIG), "index:\n  max_parallel: 6\n").unwrap();
        let explicit = cwd.path().join("custom.yml");
        fs::write(&explicit, "output: quiet\n").unwrap();

        let config = load_config_with_env(
            cwd.path(),
            Some(&explicit),
            Some(home.path().to_path_buf()),
            no_env,
        )
        .unwrap();
        assert_eq!(config.output, crate::config::OutputMode::Quiet);
        assert_eq!(config.index.retries, 5);
        assert_eq!(config.index.max_parallel, 6);
    }

    #[test]
    fn env_vars_override_files() {
        let cwd = TempDir::new().unwrap();
        fs::write(
            cwd.path().join(PROJECT_CONFIG),
            "index:\n  url: https://mirror.example\n  max_parallel: 6\n",
        )
        .unwrap();

        let env = env_from(&[
            ("PYSCOPE_INDEX_URL", "http://127.0.0.1:9000/"),
            ("PYSCOPE_MAX_PARALLEL", "2"),
        ]);
        let config = load_config_with_env(cwd.path(), None, None, env).unwrap();
        assert_eq!(config.index.url, "http://127.0.0.1:9000");
        assert_eq!(config.index.max_parallel, 2);
    }

    #[test]
    fn bad_max_parallel_env_is_rejected() {
        let cwd = TempDir::new().unwrap();
        let env = env_from(&[("PYSCOPE_MAX_PARALLEL", "many")]);
        let result = load_config_with_env(cwd.path(), None, None, env);
        assert!(matches!(
            result,
            Err(PyscopeError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_not_found() {
        let cwd = TempDir::new().unwrap();
        let missing = cwd.path().join("nope.yml");
        let result = load_config_with_env(cwd.path(), Some(&missing), None, no_env);
        assert!(matches!(result, Err(PyscopeError::ConfigNotFound { .. })));
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        let cwd = TempDir::new().unwrap();
        fs::write(cwd.path().join(PROJECT_CONFIG), "index: [unclosed").unwrap();
        let result = load_config_with_env(cwd.path(), None, None, no_env);
        assert!(matches!(result, Err(PyscopeError::ConfigParseError { .. })));
    }

    #[test]
    fn wrong_types_are_parse_errors() {
        let cwd = TempDir::new().unwrap();
        fs::write(cwd.path().join(PROJECT_CONFIG), "index:\n  retries: lots\n").unwrap();
        let result = load_config_with_env(cwd.path(), None, None, no_env);
        assert!(matches!(result, Err(PyscopeError::ConfigParseError { .. })));
    }
}
