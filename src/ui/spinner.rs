//! Progress spinners.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::executor::{ProgressCallback, ProgressEvent};

use super::theme::PyscopeTheme;
use super::SpinnerHandle;

/// A progress spinner for long-running operations.
pub struct ProgressSpinner {
    bar: ProgressBar,
    theme: PyscopeTheme,
}

impl ProgressSpinner {
    /// Create a new spinner with a message.
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Self {
            bar,
            theme: PyscopeTheme::detect(),
        }
    }

    /// Create a spinner that doesn't draw.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            theme: PyscopeTheme::plain(),
        }
    }

    fn finish_with(&mut self, line: String) {
        self.bar.set_style(
            ProgressStyle::default_spinner()
                .template("{msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        self.bar.finish_with_message(line);
    }
}

impl SpinnerHandle for ProgressSpinner {
    fn set_message(&mut self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        let line = self.theme.format_success(msg);
        self.finish_with(line);
    }

    fn finish_error(&mut self, msg: &str) {
        let line = self.theme.format_error(msg);
        self.finish_with(line);
    }

    fn finish_skipped(&mut self, msg: &str) {
        let line = self.theme.format_skipped(msg);
        self.finish_with(line);
    }

    fn progress_bar(&self) -> Option<ProgressBar> {
        Some(self.bar.clone())
    }
}

/// Callback that shows package manager progress on a spinner.
///
/// The spinner message becomes `"<base> · <event>"` for each event.
pub fn progress_callback(bar: ProgressBar, base_message: String) -> ProgressCallback {
    Box::new(move |event: ProgressEvent| {
        let mut text = event.to_string();
        if text.chars().count() > 60 {
            text = text.chars().take(57).collect::<String>() + "...";
        }
        bar.set_message(format!("{} · {}", base_message, text));
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_lifecycle() {
        let mut spinner = ProgressSpinner::hidden();
        spinner.set_message("Reading packages");
        spinner.finish_success("Read 12 packages");
        assert!(spinner.bar.is_finished());
    }

    #[test]
    fn hidden_spinner_exposes_bar() {
        let spinner = ProgressSpinner::hidden();
        assert!(spinner.progress_bar().is_some());
    }

    #[test]
    fn progress_callback_updates_message() {
        let bar = ProgressBar::hidden();
        let callback = progress_callback(bar.clone(), "Installing requests".to_string());

        callback(ProgressEvent::Collecting("requests".into()));
        let msg = bar.message();
        assert!(msg.starts_with("Installing requests · "));
        assert!(msg.contains("requests"));
        bar.finish();
    }

    #[test]
    fn progress_callback_truncates_long_events() {
        let bar = ProgressBar::hidden();
        let callback = progress_callback(bar.clone(), "Installing".to_string());
        let names: Vec<String> = (0..40).map(|i| format!("package-{}", i)).collect();
        callback(ProgressEvent::Installed(names));
        assert!(bar.message().ends_with("..."));
        bar.finish();
    }
}
