//! The `pyscope uninstall` command.

use crate::app::AppContext;
use crate::cli::args::UninstallArgs;
use crate::error::Result;
use crate::executor::Action;
use crate::ui::{Prompt, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::display::{load_inventory, report_action_failure, run_action};

/// The uninstall command implementation.
pub struct UninstallCommand {
    context: AppContext,
    args: UninstallArgs,
}

impl UninstallCommand {
    pub fn new(context: AppContext, args: UninstallArgs) -> Self {
        Self { context, args }
    }
}

impl Command for UninstallCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let env = self.context.resolve_environment(self.args.env.as_deref(), ui)?;
        let mut controller = self.context.controller()?;
        if let Err(failed) = load_inventory(&mut controller, &env, ui) {
            return Ok(failed);
        }

        let action = Action::Uninstall {
            name: self.args.name.clone(),
        };

        // Absent packages fall through to the executor, which reports them.
        if let Some(pkg) = controller.session().find(&self.args.name) {
            if !self.args.yes && ui.is_interactive() {
                let prompt = Prompt::confirm(
                    "uninstall",
                    &format!("Uninstall {} {} from {}?", pkg.name, pkg.version, env.label),
                    false,
                );
                if !ui.prompt(&prompt)?.as_bool().unwrap_or(false) {
                    ui.message("Nothing uninstalled");
                    return Ok(CommandResult::success());
                }
            }
        }

        match run_action(&mut controller, action.clone(), ui) {
            Some(Ok(_)) => Ok(CommandResult::success()),
            Some(Err(failure)) => Ok(report_action_failure(ui, &env, &action, &failure)),
            None => Ok(CommandResult::failure(1)),
        }
    }
}
