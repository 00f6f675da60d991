//! Terminal output, prompts and spinners.
//!
//! [`TerminalUI`] draws colors, spinners and dialoguer prompts.
//! [`NonInteractiveUI`] prints plain lines for pipes and CI, and
//! [`MockUI`] records everything for command tests. All three implement
//! [`UserInterface`].
//!
//! # Example
//!
//! ```
//! use pyscope::ui::{create_ui, OutputMode};
//!
//! let mut ui = create_ui(false, OutputMode::Quiet);
//! ui.show_header("Environments");
//! ui.success("Found 3 environments");
//! ```

pub mod mock;
pub mod non_interactive;
pub mod output;
pub mod prompts;
pub mod spinner;
pub mod table;
pub mod terminal;
pub mod theme;

pub use mock::{MockSpinner, MockUI, SpinnerStatus};
pub use non_interactive::NonInteractiveUI;
pub use output::OutputMode;
pub use prompts::prompt_user;
pub use spinner::{progress_callback, ProgressSpinner};
pub use table::Table;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, PyscopeTheme};

use crate::error::Result;

/// Everything a command prints or asks goes through here, so commands run
/// unchanged against [`MockUI`].
pub trait UserInterface {
    /// Verbosity chosen on the command line or in config.
    fn output_mode(&self) -> OutputMode;

    /// Progress or informational line.
    fn message(&mut self, msg: &str);

    fn success(&mut self, msg: &str);

    /// Non-fatal problem; goes to stderr.
    fn warning(&mut self, msg: &str);

    /// Always shown, on stderr.
    fn error(&mut self, msg: &str);

    /// Print command results (tables, JSON). Shown in every mode.
    fn data(&mut self, text: &str);

    /// Ask a question. Non-interactive UIs use the default or fail.
    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult>;

    /// Spinner for work running on a background thread.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    fn show_header(&mut self, title: &str);

    /// Follow-up suggestion, dimmed.
    fn show_hint(&mut self, hint: &str);

    /// Framed failure report: what was attempted, why it failed, what to try.
    fn show_error_block(&mut self, command: &str, output: &str, hint: Option<&str>);

    /// Both stdin and stdout are terminals and prompts can be answered.
    fn is_interactive(&self) -> bool;
}

/// A running spinner, finished exactly once.
pub trait SpinnerHandle {
    fn set_message(&mut self, msg: &str);

    fn finish_success(&mut self, msg: &str);

    fn finish_error(&mut self, msg: &str);

    fn finish_skipped(&mut self, msg: &str);

    /// The underlying bar, for updates from worker threads.
    fn progress_bar(&self) -> Option<indicatif::ProgressBar> {
        None
    }
}

/// A question for the user.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Key used by [`MockUI`] to look up canned answers.
    pub key: String,
    pub question: String,
    pub prompt_type: PromptType,
    /// Answer used on enter, and by non-interactive UIs.
    pub default: Option<String>,
}

impl Prompt {
    /// A yes/no question.
    pub fn confirm(key: &str, question: impl Into<String>, default: bool) -> Self {
        Self {
            key: key.to_string(),
            question: question.into(),
            prompt_type: PromptType::Confirm,
            default: Some(default.to_string()),
        }
    }

    /// Pick one of several options.
    pub fn select(key: &str, question: impl Into<String>, options: Vec<PromptOption>) -> Self {
        Self {
            key: key.to_string(),
            question: question.into(),
            prompt_type: PromptType::Select { options },
            default: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PromptType {
    Confirm,
    Select { options: Vec<PromptOption> },
}

/// One entry of a [`PromptType::Select`].
#[derive(Debug, Clone)]
pub struct PromptOption {
    pub label: String,
    /// Returned as [`PromptResult::String`] when picked.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResult {
    Bool(bool),
    String(String),
}

impl PromptResult {
    pub fn as_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::String(s) => s.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_result_conversions() {
        assert_eq!(PromptResult::Bool(true).as_string(), "true");
        assert_eq!(PromptResult::String("2".into()).as_string(), "2");
        assert_eq!(PromptResult::Bool(false).as_bool(), Some(false));
        assert_eq!(PromptResult::String("yes".into()).as_bool(), None);
    }

    #[test]
    fn confirm_builder_sets_default() {
        let prompt = Prompt::confirm("uninstall", "Remove requests?", false);
        assert!(matches!(prompt.prompt_type, PromptType::Confirm));
        assert_eq!(prompt.default.as_deref(), Some("false"));
    }

    #[test]
    fn select_builder_keeps_options() {
        let prompt = Prompt::select(
            "environment",
            "Which environment?",
            vec![
                PromptOption {
                    label: "venv: api/.venv".into(),
                    value: "1".into(),
                },
                PromptOption {
                    label: "conda: base".into(),
                    value: "2".into(),
                },
            ],
        );
        let PromptType::Select { options } = prompt.prompt_type else {
            panic!("expected select");
        };
        assert_eq!(options[1].value, "2");
        assert!(prompt.default.is_none());
    }
}
