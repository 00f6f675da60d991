//! The `pyscope envs` command.

use serde::Serialize;

use crate::app::AppContext;
use crate::cli::args::EnvsArgs;
use crate::environment::Environment;
use crate::error::Result;
use crate::ui::{Table, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::display::print_json;

#[derive(Serialize)]
struct EnvRow<'a> {
    index: usize,
    #[serde(flatten)]
    env: &'a Environment,
}

/// The envs command implementation.
pub struct EnvsCommand {
    context: AppContext,
    args: EnvsArgs,
}

impl EnvsCommand {
    pub fn new(context: AppContext, args: EnvsArgs) -> Self {
        Self { context, args }
    }
}

impl Command for EnvsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let mut spinner = ui.start_spinner("Looking for Python environments");
        let discovery = self.context.discover();
        spinner.finish_success(&format!(
            "Found {} environments",
            discovery.environments.len()
        ));

        if !discovery.issues.is_empty() {
            ui.warning(&format!(
                "{} locations could not be read (run with --debug for details)",
                discovery.issues.len()
            ));
        }

        if self.args.json {
            let rows: Vec<EnvRow> = discovery
                .environments
                .iter()
                .enumerate()
                .map(|(i, env)| EnvRow { index: i + 1, env })
                .collect();
            print_json(ui, &rows)?;
            return Ok(CommandResult::success());
        }

        if discovery.environments.is_empty() {
            ui.message("No Python environments found");
            return Ok(CommandResult::success());
        }

        ui.data(&render(&discovery.environments));
        ui.show_hint("Select one with --env <number|path|name>");
        Ok(CommandResult::success())
    }
}

fn render(environments: &[Environment]) -> String {
    let mut table = Table::new(&["#", "Name", "Kind", "Interpreter"]);
    for (i, env) in environments.iter().enumerate() {
        let name = if env.active {
            format!("{} *", env.label)
        } else {
            env.label.clone()
        };
        table.add_row(vec![
            (i + 1).to_string(),
            name,
            env.kind.to_string(),
            env.interpreter.display().to_string(),
        ]);
    }
    table.render()
}
