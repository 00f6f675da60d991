//! The `pyscope search` command.

use crate::app::AppContext;
use crate::cli::args::SearchArgs;
use crate::error::Result;
use crate::index::{search, validate_term, PypiClient, SearchHit};
use crate::inventory::Package;
use crate::ui::{Table, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::display::print_json;

/// The search command implementation.
pub struct SearchCommand {
    context: AppContext,
    args: SearchArgs,
}

impl SearchCommand {
    pub fn new(context: AppContext, args: SearchArgs) -> Self {
        Self { context, args }
    }

    /// Packages to mark results against.
    ///
    /// An explicit `--env` must resolve; the default environment is best
    /// effort.
    fn installed(&self, ui: &mut dyn UserInterface) -> Result<Vec<Package>> {
        let env = match self.context.resolve_environment(self.args.env.as_deref(), ui) {
            Ok(env) => env,
            Err(err) if self.args.env.is_none() => {
                tracing::debug!("No default environment for search: {}", err);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        let mut controller = self.context.controller()?;
        match controller.load(env.clone()) {
            Ok(_) => Ok(controller.session().packages().to_vec()),
            Err(err) => {
                ui.warning(&format!(
                    "Could not read packages in {}: {}",
                    env.label, err
                ));
                Ok(Vec::new())
            }
        }
    }
}

impl Command for SearchCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let term = validate_term(&self.args.term)?;
        let installed = self.installed(ui)?;
        let client = PypiClient::new(&self.context.config.index_settings())?;

        let mut spinner = ui.start_spinner(&format!("Searching for '{}'", term));
        let hits = match search(&client, term, &installed) {
            Ok(hits) => {
                spinner.finish_success(&format!("{} results", hits.len()));
                hits
            }
            Err(err) => {
                spinner.finish_error("Search failed");
                return Err(err.into());
            }
        };

        if self.args.json {
            print_json(ui, &hits)?;
            return Ok(CommandResult::success());
        }
        if hits.is_empty() {
            ui.message(&format!("No packages found for '{}'", term));
            return Ok(CommandResult::success());
        }
        ui.data(&render(&hits));
        Ok(CommandResult::success())
    }
}

fn render(hits: &[SearchHit]) -> String {
    let mut table = Table::new(&["Name", "Latest", "Installed", "Summary"]);
    for hit in hits {
        table.add_row(vec![
            hit.name.clone(),
            hit.version.clone(),
            hit.installed.clone().unwrap_or_default(),
            hit.summary.clone().unwrap_or_default(),
        ]);
    }
    table.render()
}
