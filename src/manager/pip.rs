//! pip, run as `<interpreter> -m pip` so it always targets that interpreter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::failure::{classify_failure, from_command_error, match_failure};
use super::parser::{parse_pip_freeze, parse_pip_json, parse_show_version};
use super::{Action, ActionFailure, ManagerSettings, PackageManager};
use crate::inventory::{InventoryError, Package};
use crate::session::CancelToken;
use crate::shell::{
    display_command, execute, execute_streaming, CommandError, CommandOptions, CommandResult,
    OutputCallback,
};

#[derive(Debug, Clone)]
pub struct PipManager {
    python: PathBuf,
    env: HashMap<String, String>,
    settings: ManagerSettings,
}

impl PipManager {
    pub fn new(python: &Path, settings: ManagerSettings) -> Self {
        Self {
            python: python.to_path_buf(),
            env: HashMap::new(),
            settings,
        }
    }

    /// Pin the pyenv version so shims resolve to this interpreter.
    pub fn with_pyenv_version(mut self, version: String) -> Self {
        self.env.insert("PYENV_VERSION".to_string(), version);
        self
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    fn args(&self, rest: &[&str]) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            "pip".to_string(),
            "--disable-pip-version-check".to_string(),
        ];
        args.extend(rest.iter().map(|s| s.to_string()));
        args
    }

    fn options(&self, timeout: std::time::Duration, cancel: Option<&CancelToken>) -> CommandOptions {
        CommandOptions {
            env: self.env.clone(),
            timeout: Some(timeout),
            cancel: cancel.cloned(),
            ..Default::default()
        }
    }

    fn list_command(&self, rest: &[&str], cancel: &CancelToken) -> Result<(String, CommandResult), InventoryError> {
        let args = self.args(rest);
        let command = display_command(&self.python, &args);
        let options = self.options(self.settings.list_timeout, Some(cancel));
        match execute(&self.python, &args, &options) {
            Ok(result) => Ok((command, result)),
            Err(err) => Err(list_error(command, err)),
        }
    }

    fn action_args(action: &Action) -> Vec<String> {
        match action {
            Action::Install { name, version } => {
                let spec = match version {
                    Some(v) => format!("{}=={}", name, v),
                    None => name.clone(),
                };
                vec!["install".into(), spec]
            }
            Action::Uninstall { name } => vec!["uninstall".into(), "-y".into(), name.clone()],
            Action::Update { name } => vec!["install".into(), "--upgrade".into(), name.clone()],
        }
    }
}

/// Map a failed list invocation.
pub(super) fn list_error(command: String, err: CommandError) -> InventoryError {
    match err {
        CommandError::Spawn { source, .. } => InventoryError::ManagerUnavailable {
            command,
            detail: source.to_string(),
        },
        CommandError::TimedOut { after, .. } => InventoryError::Timeout {
            command,
            seconds: after.as_secs(),
        },
        CommandError::Cancelled { .. } => InventoryError::Cancelled,
    }
}

/// Build a `CommandFailed` (or `ManagerUnavailable`) error from a result.
pub(super) fn failed_listing(command: String, result: &CommandResult) -> InventoryError {
    let output = result.combined_output();
    let detail = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
        .to_string();
    if output.contains("No module named pip") {
        InventoryError::ManagerUnavailable { command, detail }
    } else {
        InventoryError::CommandFailed {
            command,
            code: result.exit_code,
            detail,
        }
    }
}

impl PackageManager for PipManager {
    fn name(&self) -> &'static str {
        "pip"
    }

    fn list(&self, cancel: &CancelToken) -> Result<Vec<Package>, InventoryError> {
        let (command, result) = self.list_command(&["list", "--format=json"], cancel)?;
        if result.success {
            match parse_pip_json(&result.stdout) {
                Ok(packages) => return Ok(packages),
                Err(detail) => {
                    tracing::debug!("Unparseable pip list output ({}), trying freeze", detail)
                }
            }
        } else if result.combined_output().contains("No module named pip") {
            return Err(failed_listing(command, &result));
        } else {
            tracing::debug!("{} exited with {:?}, trying freeze", command, result.exit_code);
        }

        let (freeze_command, freeze) = self.list_command(&["freeze", "--all"], cancel)?;
        if freeze.success {
            return Ok(parse_pip_freeze(&freeze.stdout));
        }
        if result.success {
            // list succeeded but printed something we could not read
            return Err(InventoryError::MalformedOutput {
                command,
                detail: "expected a JSON package array".to_string(),
            });
        }
        Err(failed_listing(freeze_command, &freeze))
    }

    fn run(&self, action: &Action, output: Option<OutputCallback>) -> Result<CommandResult, ActionFailure> {
        let rest = Self::action_args(action);
        let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
        let args = self.args(&rest);
        let options = self.options(self.settings.action_timeout, None);
        tracing::info!("Running {}", display_command(&self.python, &args));

        let result = match output {
            Some(callback) => execute_streaming(&self.python, &args, &options, callback),
            None => execute(&self.python, &args, &options),
        }
        .map_err(from_command_error)?;

        if !result.success {
            return Err(classify_failure(action.package(), &result));
        }
        // pip exits 0 when asked to uninstall something that isn't there
        if let Action::Uninstall { name } = action {
            if let Some(failure) = match_failure(name, &result.combined_output()) {
                return Err(failure);
            }
        }
        Ok(result)
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        let args = self.args(&["show", name]);
        let options = self.options(self.settings.list_timeout, None);
        let result = execute(&self.python, &args, &options).ok()?;
        if !result.success {
            return None;
        }
        parse_show_version(&result.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Fake interpreter that answers `-m pip ...` by matching the pip
    /// subcommand in its arguments.
    fn fake_python(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("python");
        fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn manager(python: &Path) -> PipManager {
        PipManager::new(python, ManagerSettings::default())
    }

    #[test]
    fn lists_packages_from_json() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(
            temp.path(),
            r#"echo '[{"name": "requests", "version": "2.28.0"}]'"#,
        );
        let packages = manager(&python).list(&CancelToken::new()).unwrap();
        assert_eq!(packages, vec![Package::new("requests", "2.28.0")]);
    }

    #[test]
    fn falls_back_to_freeze_when_list_fails() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(
            temp.path(),
            r#"case "$4" in
  list) echo "no such option: --format" >&2; exit 2 ;;
  freeze) echo "six==1.16.0"; echo "-e git+https://x/y#egg=y" ;;
esac
"#,
        );
        let packages = manager(&python).list(&CancelToken::new()).unwrap();
        assert_eq!(packages, vec![Package::new("six", "1.16.0")]);
    }

    #[test]
    fn missing_pip_module_is_manager_unavailable() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(temp.path(), "echo 'python: No module named pip' >&2\nexit 1\n");
        let err = manager(&python).list(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, InventoryError::ManagerUnavailable { .. }));
    }

    #[test]
    fn missing_interpreter_is_manager_unavailable() {
        let temp = TempDir::new().unwrap();
        let err = manager(&temp.path().join("nope"))
            .list(&CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, InventoryError::ManagerUnavailable { .. }));
    }

    #[test]
    fn unreadable_list_output_is_malformed() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(
            temp.path(),
            r#"case "$4" in
  list) echo "garbage" ;;
  freeze) exit 1 ;;
esac
"#,
        );
        let err = manager(&python).list(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, InventoryError::MalformedOutput { .. }));
    }

    #[test]
    fn slow_listing_times_out() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(temp.path(), "sleep 5\n");
        let settings = ManagerSettings {
            list_timeout: std::time::Duration::from_millis(200),
            ..Default::default()
        };
        let err = PipManager::new(&python, settings)
            .list(&CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, InventoryError::Timeout { .. }));
    }

    #[test]
    fn install_passes_pinned_spec_as_single_argument() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("args.log");
        let python = fake_python(
            temp.path(),
            &format!("for a in \"$@\"; do echo \"$a\" >> {}; done\n", log.display()),
        );
        let action = Action::Install {
            name: "requests".into(),
            version: Some("2.31.0".into()),
        };
        manager(&python).run(&action, None).unwrap();
        let logged = fs::read_to_string(&log).unwrap();
        let args: Vec<&str> = logged.lines().collect();
        assert_eq!(
            args,
            vec!["-m", "pip", "--disable-pip-version-check", "install", "requests==2.31.0"]
        );
    }

    #[test]
    fn failed_install_is_classified() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(
            temp.path(),
            "echo 'ERROR: No matching distribution found for nosuchpkg' >&2\nexit 1\n",
        );
        let action = Action::Install {
            name: "nosuchpkg".into(),
            version: None,
        };
        let err = manager(&python).run(&action, None).unwrap_err();
        assert_eq!(
            err,
            ActionFailure::NotFound {
                package: "nosuchpkg".into()
            }
        );
    }

    #[test]
    fn uninstall_of_missing_package_is_not_found() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(
            temp.path(),
            "echo 'WARNING: Skipping ghost as it is not installed.' >&2\n",
        );
        let err = manager(&python)
            .run(&Action::Uninstall { name: "ghost".into() }, None)
            .unwrap_err();
        assert_eq!(err.reason(), "not_found");
    }

    #[test]
    fn pyenv_version_is_passed_in_environment() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(
            temp.path(),
            r#"echo "[{\"name\": \"pinned\", \"version\": \"$PYENV_VERSION\"}]""#,
        );
        let packages = manager(&python)
            .with_pyenv_version("3.11.7".into())
            .list(&CancelToken::new())
            .unwrap();
        assert_eq!(packages[0].version, "3.11.7");
    }

    #[test]
    fn installed_version_reads_show_output() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(temp.path(), "echo 'Name: rich'; echo 'Version: 13.7.0'\n");
        assert_eq!(
            manager(&python).installed_version("rich"),
            Some("13.7.0".to_string())
        );
    }
}
