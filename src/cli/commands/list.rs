//! The `pyscope list` command.

use serde::Serialize;

use crate::app::AppContext;
use crate::cli::args::ListArgs;
use crate::environment::Environment;
use crate::error::Result;
use crate::inventory::Package;
use crate::session::Summary;
use crate::ui::{PyscopeTheme, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::display::{load_inventory, package_table, print_json, run_check, summary_line};

#[derive(Serialize)]
struct Listing<'a> {
    environment: &'a Environment,
    packages: Vec<&'a Package>,
    summary: Summary,
}

/// The list command implementation.
pub struct ListCommand {
    context: AppContext,
    args: ListArgs,
}

impl ListCommand {
    pub fn new(context: AppContext, args: ListArgs) -> Self {
        Self { context, args }
    }
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let env = self.context.resolve_environment(self.args.env.as_deref(), ui)?;
        let mut controller = self.context.controller()?;

        if let Err(failed) = load_inventory(&mut controller, &env, ui) {
            return Ok(failed);
        }
        if self.args.check {
            run_check(&mut controller, ui);
        }

        let session = controller.session();
        let packages = session.filtered(self.args.filter, self.args.search.as_deref());

        if self.args.json {
            let listing = Listing {
                environment: &env,
                packages,
                summary: session.summary(),
            };
            print_json(ui, &listing)?;
            return Ok(CommandResult::success());
        }

        ui.show_header(&env.label);
        if packages.is_empty() {
            ui.message("No packages match");
        } else {
            ui.data(&package_table(&packages, &PyscopeTheme::detect()).render());
        }
        ui.message(&summary_line(&session.summary()));
        if !self.args.check && session.summary().unknown > 0 {
            ui.show_hint("Run with --check to look up latest versions");
        }
        Ok(CommandResult::success())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::PyscopeConfig;
    use crate::inventory::StatusFilter;
    use crate::ui::MockUI;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn fake_python(dir: &Path) -> PathBuf {
        let bin = dir.join("venv").join("bin");
        fs::create_dir_all(&bin).unwrap();
        let path = bin.join("python");
        fs::write(
            &path,
            "#!/bin/sh\ncase \"$4\" in\n  list) echo '[{\"name\": \"requests\", \"version\": \"2.28.0\"}, {\"name\": \"black\", \"version\": \"24.1.0\"}]' ;;\n  *) exit 1 ;;\nesac\n",
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn context(dir: &Path, index_url: String) -> AppContext {
        let mut config = PyscopeConfig::default();
        config.discovery.probe_versions = false;
        config.index.url = index_url;
        config.index.min_interval_ms = 0;
        AppContext::new(config, dir.to_path_buf(), false)
    }

    fn args(python: &Path) -> ListArgs {
        ListArgs {
            env: Some(python.display().to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn lists_packages_without_checking() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(temp.path());
        let cmd = ListCommand::new(context(temp.path(), "http://127.0.0.1:9".into()), args(&python));
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();
        assert!(result.success);
        assert!(ui.output().contains("requests"));
        assert!(ui.has_message("2 packages: 0 outdated, 0 up to date, 2 unknown"));
        assert!(ui.has_hint("--check"));
    }

    #[test]
    fn check_and_filter_outdated_as_json() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(temp.path());
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/pypi/requests/json");
            then.status(200).json_body(json!({"info": {"version": "2.31.0"}}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/pypi/black/json");
            then.status(200).json_body(json!({"info": {"version": "24.1.0"}}));
        });

        let cmd = ListCommand::new(
            context(temp.path(), server.base_url()),
            ListArgs {
                filter: StatusFilter::Outdated,
                check: true,
                json: true,
                ..args(&python)
            },
        );
        let mut ui = MockUI::new();
        cmd.execute(&mut ui).unwrap();

        let value: serde_json::Value = serde_json::from_str(&ui.output()).unwrap();
        let packages = value["packages"].as_array().unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0]["name"], "requests");
        assert_eq!(packages[0]["status"], "outdated");
        assert_eq!(value["summary"]["updated"], 1);
    }

    #[test]
    fn unreadable_environment_fails_with_one() {
        let temp = TempDir::new().unwrap();
        let python = fake_python(temp.path());
        fs::write(&python, "#!/bin/sh\necho boom >&2\nexit 1\n").unwrap();
        let cmd = ListCommand::new(context(temp.path(), "http://127.0.0.1:9".into()), args(&python));
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(!ui.errors().is_empty());
    }
}
