//! Config command implementation.
//!
//! The `pyscope config` command shows the effective configuration.

use std::path::{Path, PathBuf};

use crate::cli::args::ConfigArgs;
use crate::config::{load_config, validate, ConfigPaths};
use crate::error::{PyscopeError, Result};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The config command implementation.
pub struct ConfigCommand {
    cwd: PathBuf,
    explicit: Option<PathBuf>,
    args: ConfigArgs,
}

impl ConfigCommand {
    /// Create a new config command.
    pub fn new(cwd: &Path, explicit: Option<PathBuf>, args: ConfigArgs) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            explicit,
            args,
        }
    }
}

impl Command for ConfigCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = load_config(&self.cwd, self.explicit.as_deref())?;

        if self.args.json {
            let json =
                serde_json::to_string_pretty(&config).map_err(|e| PyscopeError::Other(e.into()))?;
            ui.data(&json);
        } else {
            let paths = ConfigPaths::discover(&self.cwd, self.explicit.as_deref());
            let layers = paths.layers();
            if layers.is_empty() {
                ui.message("# built-in defaults");
            }
            for path in layers {
                ui.message(&format!("# {}", path.display()));
            }
            let yaml = serde_yaml::to_string(&config).map_err(|e| PyscopeError::Other(e.into()))?;
            ui.data(yaml.trim_end());
        }

        if let Err(err) = validate(&config) {
            ui.warning(&err.to_string());
            return Ok(CommandResult::failure(1));
        }
        Ok(CommandResult::success())
    }
}
