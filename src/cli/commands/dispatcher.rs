//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::app::AppContext;
use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `ui` - User interface for displaying output and prompts
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Exit code for a failed install, uninstall or update.
pub const EXIT_ACTION_FAILED: i32 = 3;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    cwd: PathBuf,
    config: Option<PathBuf>,
    use_cache: bool,
}

impl CommandDispatcher {
    /// Create a new dispatcher working in `cwd`.
    pub fn new(cwd: PathBuf, config: Option<PathBuf>, use_cache: bool) -> Self {
        Self {
            cwd,
            config,
            use_cache,
        }
    }

    /// Get the working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Load configuration for a command that needs it.
    pub fn context(&self) -> Result<AppContext> {
        AppContext::load(&self.cwd, self.config.as_deref(), self.use_cache)
    }

    /// Dispatch and execute a command.
    ///
    /// Routes the CLI subcommand to the appropriate command implementation
    /// and executes it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Envs(args) => {
                super::envs::EnvsCommand::new(self.context()?, args.clone()).execute(ui)
            }
            Commands::List(args) => {
                super::list::ListCommand::new(self.context()?, args.clone()).execute(ui)
            }
            Commands::Check(args) => {
                super::check::CheckCommand::new(self.context()?, args.clone()).execute(ui)
            }
            Commands::Install(args) => {
                super::install::InstallCommand::new(self.context()?, args.clone()).execute(ui)
            }
            Commands::Uninstall(args) => {
                super::uninstall::UninstallCommand::new(self.context()?, args.clone())
                    .execute(ui)
            }
            Commands::Update(args) => {
                super::update::UpdateCommand::new(self.context()?, args.clone()).execute(ui)
            }
            Commands::Search(args) => {
                super::search::SearchCommand::new(self.context()?, args.clone()).execute(ui)
            }
            Commands::Cache(args) => {
                super::cache::CacheCommand::new(self.context()?, args.clone()).execute(ui)
            }
            Commands::Config(args) => {
                super::config::ConfigCommand::new(
                    &self.cwd,
                    self.config.clone(),
                    args.clone(),
                )
                .execute(ui)
            }
            Commands::Completions(args) => {
                super::completions::CompletionsCommand::new(args.clone()).execute(ui)
            }
        }
    }
}
