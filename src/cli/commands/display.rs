//! Shared rendering and job helpers for the package commands.

use serde::Serialize;

use crate::app::Controller;
use crate::environment::{Environment, EnvironmentKind};
use crate::error::{PyscopeError, Result};
use crate::executor::{Action, ActionFailure, ActionOutcome};
use crate::index::CheckReport;
use crate::inventory::Package;
use crate::session::Summary;
use crate::shell::permission_hint;
use crate::ui::{progress_callback, OutputMode, PyscopeTheme, Table, UserInterface};

use super::dispatcher::{CommandResult, EXIT_ACTION_FAILED};

/// Write `value` as pretty JSON on the data channel.
pub fn print_json<T: Serialize + ?Sized>(ui: &mut dyn UserInterface, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| PyscopeError::Other(e.into()))?;
    ui.data(&json);
    Ok(())
}

/// Name, installed, latest and status columns.
pub fn package_table(packages: &[&Package], theme: &PyscopeTheme) -> Table {
    let mut table = Table::new(&["Package", "Installed", "Latest", "Status"]);
    for pkg in packages {
        table.add_row(vec![
            pkg.name.clone(),
            pkg.version.clone(),
            pkg.latest.clone().unwrap_or_else(|| "-".to_string()),
            theme.format_status(pkg.status),
        ]);
    }
    table
}

pub fn summary_line(summary: &Summary) -> String {
    format!(
        "{} packages: {} outdated, {} up to date, {} unknown",
        summary.total, summary.outdated, summary.updated, summary.unknown
    )
}

/// Load `env`'s packages behind a spinner.
///
/// Returns the failure result to hand back when the list can't be read.
pub fn load_inventory(
    controller: &mut Controller,
    env: &Environment,
    ui: &mut dyn UserInterface,
) -> std::result::Result<usize, CommandResult> {
    let mut spinner = ui.start_spinner(&format!("Reading packages in {}", env.label));
    match controller.load(env.clone()) {
        Ok(count) => {
            spinner.finish_success(&format!("{} packages in {}", count, env.label));
            Ok(count)
        }
        Err(err) => {
            spinner.finish_error(&format!("Could not read packages in {}", env.label));
            ui.error(&err.to_string());
            Err(CommandResult::failure(1))
        }
    }
}

/// Check every loaded package against the index behind a spinner.
pub fn run_check(controller: &mut Controller, ui: &mut dyn UserInterface) -> Option<CheckReport> {
    let total = controller.session().packages().len();
    if total == 0 {
        return None;
    }
    let mut spinner = ui.start_spinner(&format!("Checking {} packages", total));
    let mut done = 0;
    let report = controller.check(|update| {
        done += 1;
        spinner.set_message(&format!("Checking packages ({}/{}) {}", done, total, update.name));
    });
    let Some(report) = report else {
        spinner.finish_skipped("Update check superseded");
        return None;
    };

    let summary = controller.session().summary();
    let message = format!("{} checked, {} outdated", report.checked, summary.outdated);
    if report.failed > 0 || report.skipped > 0 {
        spinner.finish_skipped(&message);
    } else {
        spinner.finish_success(&message);
    }

    if report.aborted {
        ui.warning("The package index kept failing; remaining packages were not checked");
    } else if report.deadline_reached {
        ui.warning("Update check ran out of time; remaining packages were not checked");
    }
    if report.failed > 0 {
        ui.warning(&format!(
            "{} packages could not be checked and are shown as unknown",
            report.failed
        ));
    }
    Some(report)
}

/// Run one action behind a spinner that follows package manager progress.
///
/// Returns `None` if the session was not ready.
pub fn run_action(
    controller: &mut Controller,
    action: Action,
    ui: &mut dyn UserInterface,
) -> Option<std::result::Result<ActionOutcome, ActionFailure>> {
    let title = progress_title(&action);
    let mut spinner = ui.start_spinner(&title);
    let progress = spinner
        .progress_bar()
        .map(|bar| progress_callback(bar, title.clone()));

    let Some(result) = controller.run_action(action.clone(), progress) else {
        spinner.finish_skipped(&format!("{} skipped", title));
        return None;
    };
    match &result {
        Ok(outcome) => {
            let done = match (&action, &outcome.version_after) {
                (Action::Uninstall { name }, _) => format!("Uninstalled {}", name),
                (_, Some(version)) => {
                    format!("{} {} {}", past_tense(&action), action.package(), version)
                }
                (_, None) => format!("{} {}", past_tense(&action), action.package()),
            };
            spinner.finish_success(&done);
            if ui.output_mode() == OutputMode::Verbose {
                ui.message(&format!("  took {:.1}s", outcome.duration.as_secs_f64()));
            }
        }
        Err(_) => spinner.finish_error(&format!("Could not {}", action)),
    }
    Some(result)
}

fn progress_title(action: &Action) -> String {
    match action {
        Action::Install { name, version: Some(v) } => format!("Installing {}=={}", name, v),
        Action::Install { name, .. } => format!("Installing {}", name),
        Action::Uninstall { name } => format!("Uninstalling {}", name),
        Action::Update { name } => format!("Updating {}", name),
    }
}

fn past_tense(action: &Action) -> &'static str {
    match action {
        Action::Install { .. } => "Installed",
        Action::Uninstall { .. } => "Uninstalled",
        Action::Update { .. } => "Updated",
    }
}

/// Show a structured action failure and produce exit code 3.
pub fn report_action_failure(
    ui: &mut dyn UserInterface,
    env: &Environment,
    action: &Action,
    failure: &ActionFailure,
) -> CommandResult {
    let hint = match failure {
        ActionFailure::PermissionDenied { .. } => {
            permission_hint(env.kind == EnvironmentKind::System)
        }
        ActionFailure::Network { .. } => Some("Check your connection or proxy settings"),
        ActionFailure::ManagerUnavailable { .. } => {
            Some("Install pip into the environment with `python -m ensurepip`")
        }
        _ => None,
    };
    ui.show_error_block(
        &format!("{} in {}", action, env.label),
        &failure.to_string(),
        hint,
    );
    CommandResult::failure(EXIT_ACTION_FAILED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::PackageStatus;
    use crate::ui::MockUI;
    use std::path::PathBuf;

    fn system_env() -> Environment {
        Environment {
            interpreter: PathBuf::from("/usr/bin/python3"),
            kind: EnvironmentKind::System,
            label: "System Python 3.11".to_string(),
            prefix: PathBuf::from("/usr"),
            version: Some("3.11.4".to_string()),
            active: false,
        }
    }

    #[test]
    fn table_shows_dash_for_unknown_latest() {
        let mut checked = Package::new("requests", "2.28.0");
        checked.latest = Some("2.31.0".into());
        checked.status = PackageStatus::Outdated;
        let unchecked = Package::new("black", "24.1.0");

        let rendered = package_table(&[&checked, &unchecked], &PyscopeTheme::plain()).render();
        assert!(rendered.contains("2.31.0"));
        assert!(rendered.contains("outdated"));
        assert!(rendered.lines().any(|l| l.contains("black") && l.contains('-')));
    }

    #[test]
    fn summary_line_counts() {
        let summary = Summary {
            total: 3,
            outdated: 1,
            updated: 1,
            unknown: 1,
        };
        assert_eq!(
            summary_line(&summary),
            "3 packages: 1 outdated, 1 up to date, 1 unknown"
        );
    }

    #[test]
    fn action_failure_exits_with_three() {
        let mut ui = MockUI::new();
        let action = Action::Uninstall {
            name: "flask".into(),
        };
        let failure = ActionFailure::NotFound {
            package: "flask".into(),
        };
        let result = report_action_failure(&mut ui, &system_env(), &action, &failure);
        assert_eq!(result.exit_code, 3);
        assert_eq!(ui.error_blocks().len(), 1);
    }

    #[test]
    fn json_goes_to_data() {
        let mut ui = MockUI::new();
        print_json(&mut ui, &vec![Package::new("a", "1")]).unwrap();
        assert!(ui.output().contains("\"name\": \"a\""));
    }

    #[test]
    fn progress_titles() {
        let install = Action::Install {
            name: "requests".into(),
            version: Some("2.31.0".into()),
        };
        assert_eq!(progress_title(&install), "Installing requests==2.31.0");
        assert_eq!(past_tense(&install), "Installed");
    }
}
