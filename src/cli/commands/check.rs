//! The `pyscope check` command.

use serde::Serialize;

use crate::app::AppContext;
use crate::cli::args::CheckArgs;
use crate::error::Result;
use crate::index::CheckReport;
use crate::inventory::{Package, PackageStatus, StatusFilter};
use crate::session::Summary;
use crate::ui::{OutputMode, PyscopeTheme, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::display::{load_inventory, package_table, print_json, run_check, summary_line};

#[derive(Serialize)]
struct CheckOutput<'a> {
    environment: String,
    report: CheckReport,
    summary: Summary,
    outdated: Vec<&'a Package>,
}

/// The check command implementation.
pub struct CheckCommand {
    context: AppContext,
    args: CheckArgs,
}

impl CheckCommand {
    pub fn new(context: AppContext, args: CheckArgs) -> Self {
        Self { context, args }
    }
}

impl Command for CheckCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let env = self.context.resolve_environment(self.args.env.as_deref(), ui)?;
        let mut controller = self.context.controller()?;

        if let Err(failed) = load_inventory(&mut controller, &env, ui) {
            return Ok(failed);
        }
        let report = run_check(&mut controller, ui).unwrap_or_default();

        let session = controller.session();
        let outdated = session.filtered(StatusFilter::Outdated, None);

        if self.args.json {
            let output = CheckOutput {
                environment: env.id(),
                report,
                summary: session.summary(),
                outdated,
            };
            print_json(ui, &output)?;
            return Ok(CommandResult::success());
        }

        ui.show_header(&env.label);
        if outdated.is_empty() {
            ui.success("Everything that could be checked is up to date");
        } else {
            ui.data(&package_table(&outdated, &PyscopeTheme::detect()).render());
            ui.show_hint("Update with `pyscope update --all`");
        }
        ui.message(&summary_line(&session.summary()));

        let unknown: Vec<&str> = session
            .packages()
            .iter()
            .filter(|p| p.status == PackageStatus::Unknown)
            .map(|p| p.name.as_str())
            .collect();
        if !unknown.is_empty() && ui.output_mode() == OutputMode::Verbose {
            ui.message(&format!("Unknown: {}", unknown.join(", ")));
        }
        Ok(CommandResult::success())
    }
}
