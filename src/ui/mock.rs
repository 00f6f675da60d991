//! Mock UI implementation for testing.
//!
//! `MockUI` implements [`UserInterface`] and records every interaction for
//! later assertion. Prompt answers are configured up front.
//!
//! # Example
//!
//! ```
//! use pyscope::ui::{MockUI, Prompt, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.set_prompt_response("uninstall", "yes");
//!
//! let answer = ui.prompt(&Prompt::confirm("uninstall", "Remove requests?", false)).unwrap();
//! assert_eq!(answer.as_bool(), Some(true));
//!
//! ui.success("Uninstalled requests");
//! assert!(ui.has_success("requests"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Result;

use super::prompts::parse_bool;
use super::{OutputMode, Prompt, PromptResult, PromptType, SpinnerHandle, UserInterface};

/// Mock UI implementation for testing.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    interactive: bool,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    data: Vec<String>,
    headers: Vec<String>,
    hints: Vec<String>,
    spinners: Vec<String>,
    spinner_log: Arc<Mutex<Vec<(SpinnerStatus, String)>>>,
    error_blocks: Vec<(String, String, Option<String>)>,
    prompt_responses: HashMap<String, String>,
    prompts_shown: Vec<String>,
}

impl MockUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Answer prompts with this key using `response`.
    pub fn set_prompt_response(&mut self, key: &str, response: &str) {
        self.prompt_responses
            .insert(key.to_string(), response.to_string());
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Everything printed through [`UserInterface::data`].
    pub fn data_lines(&self) -> &[String] {
        &self.data
    }

    /// All data output joined by newlines.
    pub fn output(&self) -> String {
        self.data.join("\n")
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    /// Messages of every spinner started.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// How each spinner finished, in order.
    pub fn spinner_results(&self) -> Vec<(SpinnerStatus, String)> {
        self.spinner_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Captured error blocks as (command, output, hint).
    pub fn error_blocks(&self) -> &[(String, String, Option<String>)] {
        &self.error_blocks
    }

    /// Keys of every prompt shown.
    pub fn prompts_shown(&self) -> &[String] {
        &self.prompts_shown
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.successes.iter().any(|m| m.contains(msg))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
    }

    pub fn has_hint(&self, msg: &str) -> bool {
        self.hints.iter().any(|m| m.contains(msg))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn data(&mut self, text: &str) {
        self.data.push(text.to_string());
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        self.prompts_shown.push(prompt.key.clone());

        let response = self
            .prompt_responses
            .get(&prompt.key)
            .or(prompt.default.as_ref());

        Ok(match (&prompt.prompt_type, response) {
            (PromptType::Confirm, Some(r)) => PromptResult::Bool(parse_bool(r)),
            (PromptType::Confirm, None) => PromptResult::Bool(false),
            (PromptType::Select { .. }, Some(r)) => PromptResult::String(r.clone()),
            (PromptType::Select { options }, None) => PromptResult::String(
                options.first().map(|o| o.value.clone()).unwrap_or_default(),
            ),
        })
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner {
            log: Arc::clone(&self.spinner_log),
            messages: Vec::new(),
        })
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn show_hint(&mut self, hint: &str) {
        self.hints.push(hint.to_string());
    }

    fn show_error_block(&mut self, command: &str, output: &str, hint: Option<&str>) {
        self.error_blocks.push((
            command.to_string(),
            output.to_string(),
            hint.map(str::to_string),
        ));
        if let Some(h) = hint {
            self.hints.push(h.to_string());
        }
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// Status of a mock spinner when finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerStatus {
    Success,
    Error,
    Skipped,
}

/// Spinner that reports how it finished back to its [`MockUI`].
#[derive(Debug)]
pub struct MockSpinner {
    log: Arc<Mutex<Vec<(SpinnerStatus, String)>>>,
    messages: Vec<String>,
}

impl MockSpinner {
    /// Messages set while spinning.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    fn finish(&mut self, status: SpinnerStatus, msg: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push((status, msg.to_string()));
        }
    }
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        self.finish(SpinnerStatus::Success, msg);
    }

    fn finish_error(&mut self, msg: &str) {
        self.finish(SpinnerStatus::Error, msg);
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.finish(SpinnerStatus::Skipped, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::PromptOption;

    #[test]
    fn captures_output() {
        let mut ui = MockUI::new();
        ui.message("Reading packages");
        ui.success("Done");
        ui.warning("Slow index");
        ui.error("Failed");
        ui.data("{\"ok\":true}");

        assert!(ui.has_message("Reading"));
        assert!(ui.has_success("Done"));
        assert!(ui.has_warning("Slow"));
        assert!(ui.has_error("Failed"));
        assert_eq!(ui.output(), "{\"ok\":true}");
        assert_eq!(ui.data_lines().len(), 1);
    }

    #[test]
    fn spinner_results_are_recorded() {
        let mut ui = MockUI::new();
        let mut spinner = ui.start_spinner("Checking");
        spinner.set_message("Checking 3/10");
        spinner.finish_error("Index unreachable");

        assert_eq!(ui.spinners(), &["Checking".to_string()]);
        assert_eq!(
            ui.spinner_results(),
            vec![(SpinnerStatus::Error, "Index unreachable".to_string())]
        );
    }

    #[test]
    fn prompt_uses_configured_response_then_default() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("uninstall", "y");

        let yes = ui.prompt(&Prompt::confirm("uninstall", "?", false)).unwrap();
        assert_eq!(yes.as_bool(), Some(true));

        let fallback = ui.prompt(&Prompt::confirm("update_all", "?", true)).unwrap();
        assert_eq!(fallback.as_bool(), Some(true));
        assert_eq!(ui.prompts_shown().len(), 2);
    }

    #[test]
    fn select_without_response_picks_first() {
        let mut ui = MockUI::new();
        let prompt = Prompt::select(
            "environment",
            "Which?",
            vec![PromptOption {
                label: "venv".into(),
                value: "3".into(),
            }],
        );
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "3");
    }

    #[test]
    fn error_block_hint_is_recorded() {
        let mut ui = MockUI::new();
        ui.show_error_block("python -m pip install x", "ERROR: nope", Some("Check the name"));
        assert_eq!(ui.error_blocks().len(), 1);
        assert!(ui.has_hint("Check the name"));
    }
}
