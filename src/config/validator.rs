//! Range checks on a loaded configuration.

use crate::config::schema::PyscopeConfig;
use crate::error::{PyscopeError, Result};

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted key, e.g. `index.max_parallel`
    pub key: String,
    pub message: String,
}

fn check(errors: &mut Vec<ValidationError>, ok: bool, key: &str, message: &str) {
    if !ok {
        errors.push(ValidationError {
            key: key.to_string(),
            message: message.to_string(),
        });
    }
}

/// Collect every problem instead of stopping at the first.
pub fn validate_config(config: &PyscopeConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let index = &config.index;

    check(
        &mut errors,
        index.url.starts_with("http://") || index.url.starts_with("https://"),
        "index.url",
        "must start with http:// or https://",
    );
    check(&mut errors, index.timeout_secs > 0, "index.timeout_secs", "must be at least 1");
    check(&mut errors, index.retries > 0, "index.retries", "must be at least 1");
    check(
        &mut errors,
        (1..=32).contains(&index.max_parallel),
        "index.max_parallel",
        "must be between 1 and 32",
    );
    check(
        &mut errors,
        index.failure_threshold > 0,
        "index.failure_threshold",
        "must be at least 1",
    );
    check(&mut errors, index.deadline_secs > 0, "index.deadline_secs", "must be at least 1");
    check(
        &mut errors,
        config.discovery.max_depth <= 10,
        "discovery.max_depth",
        "must be 10 or less",
    );
    check(
        &mut errors,
        config.commands.list_timeout_secs > 0,
        "commands.list_timeout_secs",
        "must be at least 1",
    );
    check(
        &mut errors,
        config.commands.action_timeout_secs > 0,
        "commands.action_timeout_secs",
        "must be at least 1",
    );

    errors
}

/// Fail with all problems joined into one message.
pub fn validate(config: &PyscopeConfig) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors
        .iter()
        .map(|e| format!("{}: {}", e.key, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(PyscopeError::ConfigValidationError { message })
}
