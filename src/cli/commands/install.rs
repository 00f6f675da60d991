//! The `pyscope install` command.

use crate::app::AppContext;
use crate::cli::args::InstallArgs;
use crate::error::Result;
use crate::executor::Action;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::display::{load_inventory, report_action_failure, run_action};

/// The install command implementation.
pub struct InstallCommand {
    context: AppContext,
    args: InstallArgs,
}

impl InstallCommand {
    pub fn new(context: AppContext, args: InstallArgs) -> Self {
        Self { context, args }
    }
}

impl Command for InstallCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let env = self.context.resolve_environment(self.args.env.as_deref(), ui)?;
        let mut controller = self.context.controller()?;
        if let Err(failed) = load_inventory(&mut controller, &env, ui) {
            return Ok(failed);
        }

        if let Some(existing) = controller.session().find(&self.args.name) {
            if self.args.version.is_none() {
                ui.message(&format!(
                    "{} {} is already installed",
                    existing.name, existing.version
                ));
                ui.show_hint(&format!("Use `pyscope update {}` to upgrade", existing.name));
                return Ok(CommandResult::success());
            }
        }

        let action = Action::Install {
            name: self.args.name.clone(),
            version: self.args.version.clone(),
        };
        match run_action(&mut controller, action.clone(), ui) {
            Some(Ok(_)) => Ok(CommandResult::success()),
            Some(Err(failure)) => Ok(report_action_failure(ui, &env, &action, &failure)),
            None => Ok(CommandResult::failure(1)),
        }
    }
}
