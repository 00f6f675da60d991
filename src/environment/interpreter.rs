//! Interpreter version probing.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use crate::shell::{execute, CommandOptions};

const VERSION_SCRIPT: &str =
    "import sys; print('.'.join(str(p) for p in sys.version_info[:3]))";

static VERSION_OUTPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.\d+\.\d+)\s*$").unwrap());

/// Ask an interpreter for its `major.minor.micro` version.
///
/// Returns `None` when the interpreter can't be run, exits non-zero, times
/// out, or prints something unexpected. A failed probe never hides the
/// environment; it only leaves the version blank.
pub fn probe_version(interpreter: &Path, timeout: Duration) -> Option<String> {
    let args = vec!["-c".to_string(), VERSION_SCRIPT.to_string()];
    match execute(interpreter, &args, &CommandOptions::with_timeout(timeout)) {
        Ok(result) if result.success => parse_version_output(&result.stdout),
        Ok(result) => {
            tracing::debug!(
                "Version probe for {} exited with {:?}",
                interpreter.display(),
                result.exit_code
            );
            None
        }
        Err(e) => {
            tracing::debug!("Version probe for {} failed: {}", interpreter.display(), e);
            None
        }
    }
}

fn parse_version_output(stdout: &str) -> Option<String> {
    let line = stdout.lines().find(|l| !l.trim().is_empty())?;
    VERSION_OUTPUT
        .captures(line.trim())
        .map(|caps| caps[1].to_string())
}
