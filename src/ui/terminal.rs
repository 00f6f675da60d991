//! Interactive terminal UI.

use console::Term;
use std::io::{IsTerminal, Write};

use crate::error::Result;

use super::{
    prompt_user, NonInteractiveUI, OutputMode, ProgressSpinner, Prompt, PromptResult,
    PyscopeTheme, SpinnerHandle, UserInterface,
};

const BLOCK_WIDTH: usize = 44;

/// Interactive terminal UI implementation.
///
/// Results go to stdout; status lines are suppressed below
/// [`OutputMode::Normal`]; problems go to stderr.
pub struct TerminalUI {
    out: Term,
    theme: PyscopeTheme,
    mode: OutputMode,
}

impl TerminalUI {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            out: Term::stdout(),
            theme: PyscopeTheme::detect(),
            mode,
        }
    }

    fn status(&mut self, line: String) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", line).ok();
        }
    }
}

/// Lines of a framed failure report: what was attempted, why it failed,
/// and an optional hint below the frame.
pub(crate) fn error_block_lines(
    theme: &PyscopeTheme,
    attempted: &str,
    reason: &str,
    hint: Option<&str>,
) -> Vec<String> {
    let frame = |label: &str, corner: &str| {
        let rule = "─".repeat(BLOCK_WIDTH.saturating_sub(label.chars().count() + 1));
        theme.border.apply_to(format!("{}─ {} {}", corner, label, rule)).to_string()
    };
    let bar = theme.border.apply_to("│").to_string();

    let mut lines = vec![
        frame("Failed", "┌"),
        format!("{} {}", bar, theme.command.apply_to(attempted)),
    ];
    if !reason.is_empty() {
        lines.push(frame("Reason", "├"));
        lines.extend(reason.lines().map(|l| format!("{} {}", bar, l)));
    }
    lines.push(
        theme
            .border
            .apply_to(format!("└{}", "─".repeat(BLOCK_WIDTH + 2)))
            .to_string(),
    );
    if let Some(hint) = hint {
        lines.push(format!(
            "{} {}",
            theme.hint.apply_to("Hint:"),
            theme.hint.apply_to(hint)
        ));
    }
    lines
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.status(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        let line = self.theme.format_success(msg);
        self.status(line);
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(Term::stderr(), "{}", self.theme.format_warning(msg)).ok();
        }
    }

    fn error(&mut self, msg: &str) {
        writeln!(Term::stderr(), "{}", self.theme.format_error(msg)).ok();
    }

    fn data(&mut self, text: &str) {
        writeln!(self.out, "{}", text).ok();
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        prompt_user(prompt, &self.out)
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        let spinner = if self.mode.shows_spinners() {
            ProgressSpinner::new(message)
        } else {
            ProgressSpinner::hidden()
        };
        Box::new(spinner)
    }

    fn show_header(&mut self, title: &str) {
        let line = format!("\n{}", self.theme.format_header(title));
        self.status(line);
    }

    fn show_hint(&mut self, hint: &str) {
        let line = format!("  {}", self.theme.hint.apply_to(hint));
        self.status(line);
    }

    fn show_error_block(&mut self, command: &str, output: &str, hint: Option<&str>) {
        let mut err = Term::stderr();
        for line in error_block_lines(&self.theme, command, output, hint) {
            writeln!(err, "  {}", line).ok();
        }
    }

    fn is_interactive(&self) -> bool {
        self.out.is_term() && std::io::stdin().is_terminal()
    }
}

/// Terminal UI when attached to a terminal, plain line output otherwise.
pub fn create_ui(interactive: bool, mode: OutputMode) -> Box<dyn UserInterface> {
    if interactive && Term::stdout().is_term() {
        Box::new(TerminalUI::new(mode))
    } else {
        Box::new(NonInteractiveUI::new(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_block_frames_reason_and_hint() {
        let lines = error_block_lines(
            &PyscopeTheme::plain(),
            "uninstall flask in venv",
            "Package 'flask' not found",
            Some("Check the name"),
        );
        assert!(lines[0].starts_with("┌─ Failed"));
        assert!(lines[1].contains("uninstall flask"));
        assert!(lines.iter().any(|l| l.starts_with("├─ Reason")));
        assert!(lines.iter().any(|l| l.contains("not found")));
        assert_eq!(lines.last().unwrap(), "Hint: Check the name");
    }

    #[test]
    fn error_block_without_reason_or_hint() {
        let lines = error_block_lines(&PyscopeTheme::plain(), "install rich", "", None);
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with('└'));
    }

    #[test]
    fn create_ui_non_interactive() {
        let ui = create_ui(false, OutputMode::Normal);
        assert!(!ui.is_interactive());
    }

    #[test]
    fn create_ui_respects_mode() {
        let ui = create_ui(false, OutputMode::Silent);
        assert_eq!(ui.output_mode(), OutputMode::Silent);
    }

    #[test]
    fn interactive_needs_both_terminals() {
        let ui = TerminalUI::new(OutputMode::Normal);
        let expected = console::Term::stdout().is_term() && std::io::stdin().is_terminal();
        assert_eq!(ui.is_interactive(), expected);
    }
}
