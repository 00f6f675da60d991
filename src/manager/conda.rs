//! conda, addressing environments by prefix (`-p`).
//!
//! Packages that conda doesn't know about were usually installed with pip
//! inside the environment, so "not found" results are retried with pip.

use std::path::{Path, PathBuf};

use super::failure::{classify_failure, from_command_error};
use super::parser::parse_conda_json;
use super::pip::{failed_listing, list_error};
use super::{Action, ActionFailure, ManagerSettings, PackageManager, PipManager};
use crate::inventory::{InventoryError, Package};
use crate::session::CancelToken;
use crate::shell::{display_command, execute, execute_streaming, CommandOptions, CommandResult, OutputCallback};

#[derive(Debug, Clone)]
pub struct CondaManager {
    conda: PathBuf,
    prefix: PathBuf,
    pip: PipManager,
    settings: ManagerSettings,
}

impl CondaManager {
    pub fn new(conda: PathBuf, prefix: &Path, pip: PipManager, settings: ManagerSettings) -> Self {
        Self {
            conda,
            prefix: prefix.to_path_buf(),
            pip,
            settings,
        }
    }

    fn action_args(&self, action: &Action) -> Vec<String> {
        let prefix = self.prefix.display().to_string();
        let (sub, spec) = match action {
            Action::Install { name, version } => (
                "install",
                match version {
                    Some(v) => format!("{}=={}", name, v),
                    None => name.clone(),
                },
            ),
            Action::Uninstall { name } => ("remove", name.clone()),
            Action::Update { name } => ("update", name.clone()),
        };
        vec![sub.into(), "-y".into(), "-p".into(), prefix, spec]
    }
}

impl PackageManager for CondaManager {
    fn name(&self) -> &'static str {
        "conda"
    }

    fn list(&self, cancel: &CancelToken) -> Result<Vec<Package>, InventoryError> {
        let args = vec![
            "list".to_string(),
            "--json".to_string(),
            "-p".to_string(),
            self.prefix.display().to_string(),
        ];
        let command = display_command(&self.conda, &args);
        let options = CommandOptions {
            timeout: Some(self.settings.list_timeout),
            cancel: Some(cancel.clone()),
            ..Default::default()
        };
        let result = match execute(&self.conda, &args, &options) {
            Ok(result) => result,
            Err(err) => {
                let err = list_error(command, err);
                if matches!(err, InventoryError::ManagerUnavailable { .. }) {
                    tracing::debug!("conda unavailable ({}), listing with pip", err);
                    return self.pip.list(cancel);
                }
                return Err(err);
            }
        };

        if !result.success {
            tracing::debug!("{} failed, listing with pip", command);
            return self.pip.list(cancel).map_err(|pip_err| {
                tracing::debug!("pip fallback failed: {}", pip_err);
                failed_listing(command, &result)
            });
        }
        parse_conda_json(&result.stdout)
            .map_err(|detail| InventoryError::MalformedOutput { command, detail })
    }

    fn run(&self, action: &Action, output: Option<OutputCallback>) -> Result<CommandResult, ActionFailure> {
        let args = self.action_args(action);
        let options = CommandOptions {
            timeout: Some(self.settings.action_timeout),
            ..Default::default()
        };
        tracing::info!("Running {}", display_command(&self.conda, &args));

        // The callback can only be handed to one process; the pip retry
        // runs without streaming.
        let result = match output {
            Some(callback) => execute_streaming(&self.conda, &args, &options, callback),
            None => execute(&self.conda, &args, &options),
        }
        .map_err(from_command_error)?;

        if result.success {
            return Ok(result);
        }
        match classify_failure(action.package(), &result) {
            ActionFailure::NotFound { .. } => {
                tracing::info!("conda does not manage {}, retrying with pip", action.package());
                self.pip.run(action, None)
            }
            failure => Err(failure),
        }
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        let args = vec![
            "list".to_string(),
            "--json".to_string(),
            "-p".to_string(),
            self.prefix.display().to_string(),
            format!("^{}$", regex::escape(name)),
        ];
        let result = execute(
            &self.conda,
            &args,
            &CommandOptions::with_timeout(self.settings.list_timeout),
        )
        .ok()
        .filter(|r| r.success);
        let key = crate::inventory::normalize_name(name);
        result
            .and_then(|r| parse_conda_json(&r.stdout).ok())
            .and_then(|pkgs| pkgs.into_iter().find(|p| p.key() == key))
            .map(|p| p.version)
            .or_else(|| self.pip.installed_version(name))
    }
}
