//! The `pyscope update` command.

use crate::app::AppContext;
use crate::cli::args::UpdateArgs;
use crate::error::Result;
use crate::executor::Action;
use crate::inventory::StatusFilter;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, EXIT_ACTION_FAILED};
use super::display::{load_inventory, report_action_failure, run_action, run_check};

/// The update command implementation.
pub struct UpdateCommand {
    context: AppContext,
    args: UpdateArgs,
}

impl UpdateCommand {
    pub fn new(context: AppContext, args: UpdateArgs) -> Self {
        Self { context, args }
    }
}

impl Command for UpdateCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let env = self.context.resolve_environment(self.args.env.as_deref(), ui)?;
        let mut controller = self.context.controller()?;
        if let Err(failed) = load_inventory(&mut controller, &env, ui) {
            return Ok(failed);
        }

        let names: Vec<String> = if self.args.all {
            run_check(&mut controller, ui);
            controller
                .session()
                .filtered(StatusFilter::Outdated, None)
                .into_iter()
                .map(|p| p.name.clone())
                .collect()
        } else {
            self.args.names.clone()
        };

        if names.is_empty() {
            ui.success("Everything is up to date");
            return Ok(CommandResult::success());
        }

        let mut failed = 0;
        for name in &names {
            let action = Action::Update { name: name.clone() };
            match run_action(&mut controller, action.clone(), ui) {
                Some(Ok(_)) => {}
                Some(Err(failure)) => {
                    report_action_failure(ui, &env, &action, &failure);
                    failed += 1;
                }
                None => return Ok(CommandResult::failure(1)),
            }
        }

        if failed > 0 {
            ui.warning(&format!("{} of {} updates failed", failed, names.len()));
            return Ok(CommandResult::failure(EXIT_ACTION_FAILED));
        }
        Ok(CommandResult::success())
    }
}
