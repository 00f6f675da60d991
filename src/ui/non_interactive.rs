//! UI for pipes, CI and scripts.

use std::collections::HashMap;

use crate::error::{PyscopeError, Result};

use super::terminal::error_block_lines;
use super::{
    prompts::parse_bool, OutputMode, Prompt, PromptResult, PromptType, PyscopeTheme,
    SpinnerHandle, UserInterface,
};

/// Prints plain lines and never blocks on input.
///
/// Prompts are answered from `PYSCOPE_PROMPT_<KEY>` variables or the prompt
/// default; a prompt with neither is an error.
pub struct NonInteractiveUI {
    mode: OutputMode,
    env_overrides: HashMap<String, String>,
}

impl NonInteractiveUI {
    pub fn new(mode: OutputMode) -> Self {
        let env_overrides = std::env::vars()
            .filter(|(k, _)| k.starts_with("PYSCOPE_PROMPT_"))
            .collect();
        Self {
            mode,
            env_overrides,
        }
    }

    /// Create with explicit overrides (for testing).
    pub fn with_overrides(mode: OutputMode, overrides: HashMap<String, String>) -> Self {
        Self {
            mode,
            env_overrides: overrides,
        }
    }

    fn answer(prompt: &Prompt, value: &str) -> PromptResult {
        match prompt.prompt_type {
            PromptType::Confirm => PromptResult::Bool(parse_bool(value)),
            PromptType::Select { .. } => PromptResult::String(value.to_string()),
        }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("✓ {}", msg);
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("⚠ {}", msg);
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn data(&mut self, text: &str) {
        println!("{}", text);
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        let env_key = format!("PYSCOPE_PROMPT_{}", prompt.key.to_uppercase());
        if let Some(value) = self.env_overrides.get(&env_key) {
            return Ok(Self::answer(prompt, value));
        }
        if let Some(default) = &prompt.default {
            return Ok(Self::answer(prompt, default));
        }
        Err(PyscopeError::ConfigValidationError {
            message: format!(
                "Cannot prompt for '{}' in non-interactive mode (no default value)",
                prompt.key
            ),
        })
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_spinners() {
            eprintln!("  {}", message);
        }
        Box::new(LineSpinner { mode: self.mode })
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            println!("\n{}\n", title);
        }
    }

    fn show_hint(&mut self, hint: &str) {
        if self.mode.shows_status() {
            println!("  {}", hint);
        }
    }

    fn show_error_block(&mut self, command: &str, output: &str, hint: Option<&str>) {
        let theme = PyscopeTheme::plain();
        for line in error_block_lines(&theme, command, output, hint) {
            eprintln!("  {}", line);
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner stand-in that prints only the final line.
struct LineSpinner {
    mode: OutputMode,
}

impl SpinnerHandle for LineSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("✓ {}", msg);
        }
    }

    fn finish_error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn finish_skipped(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("○ {}", msg);
        }
    }
}
