//! pyscope CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use pyscope::cli::{Cli, CommandDispatcher};
use pyscope::config::load_config;
use pyscope::shell::is_ci;
use pyscope::ui::{create_ui, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
///
/// Logs go to stderr so JSON on stdout stays parseable.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("pyscope=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pyscope=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("pyscope starting with args: {:?}", cli);

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    let cwd = std::env::current_dir().unwrap_or_default();

    // Flags win; otherwise the configured mode. A broken config is reported
    // by the command itself.
    let output_mode = if cli.quiet {
        OutputMode::Quiet
    } else if cli.verbose {
        OutputMode::Verbose
    } else {
        load_config(&cwd, cli.config.as_deref())
            .map(|config| OutputMode::from(config.output))
            .unwrap_or(OutputMode::Normal)
    };

    let mut ui = create_ui(!is_ci(), output_mode);
    let dispatcher = CommandDispatcher::new(cwd, cli.config.clone(), !cli.no_cache);

    match dispatcher.dispatch(&cli, ui.as_mut()) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            ExitCode::from(e.exit_code())
        }
    }
}
