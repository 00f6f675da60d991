//! Visual theme and styling.

use console::Style;

use crate::inventory::PackageStatus;

#[derive(Debug, Clone)]
pub struct PyscopeTheme {
    /// Success messages and up-to-date packages (green).
    pub success: Style,
    /// Warnings and outdated packages (orange).
    pub warning: Style,
    /// Errors (red bold).
    pub error: Style,
    /// Spinners and informational elements (cyan).
    pub info: Style,
    /// Secondary text.
    pub dim: Style,
    /// Important text (bold).
    pub highlight: Style,
    /// Headers (cyan bold).
    pub header: Style,
    /// Commands shown in error blocks (dim italic).
    pub command: Style,
    /// Box-drawing borders (dim).
    pub border: Style,
    /// Hints (cyan dim).
    pub hint: Style,
}

impl Default for PyscopeTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl PyscopeTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().cyan(),
            command: Style::new().dim().italic(),
            border: Style::new().dim(),
            hint: Style::new().cyan().dim(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            command: Style::new(),
            border: Style::new(),
            hint: Style::new(),
        }
    }

    /// Theme matching the current terminal.
    pub fn detect() -> Self {
        if should_use_colors() {
            Self::new()
        } else {
            Self::plain()
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_skipped(&self, msg: &str) -> String {
        format!("{}", self.dim.apply_to(format!("○ {}", msg)))
    }

    pub fn format_header(&self, title: &str) -> String {
        format!(
            "{} {}",
            self.header.apply_to("◆"),
            self.highlight.apply_to(title)
        )
    }

    /// Status word for a package, colored by status.
    pub fn format_status(&self, status: PackageStatus) -> String {
        let style = match status {
            PackageStatus::Updated => &self.success,
            PackageStatus::Outdated => &self.warning,
            PackageStatus::Unknown => &self.dim,
        };
        style.apply_to(status.to_string()).to_string()
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    console::Term::stdout().is_term()
}
