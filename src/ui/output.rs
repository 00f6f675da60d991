//! Output verbosity.

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Show progress, status and timings.
    Verbose,
    /// Show progress and status.
    #[default]
    Normal,
    /// Show results and final status only.
    Quiet,
    /// Show nothing except results and errors.
    Silent,
}

impl From<crate::config::OutputMode> for OutputMode {
    fn from(config_mode: crate::config::OutputMode) -> Self {
        match config_mode {
            crate::config::OutputMode::Verbose => Self::Verbose,
            crate::config::OutputMode::Normal => Self::Normal,
            crate::config::OutputMode::Quiet => Self::Quiet,
            crate::config::OutputMode::Silent => Self::Silent,
        }
    }
}

impl OutputMode {
    /// Spinners are drawn.
    pub fn shows_spinners(&self) -> bool {
        matches!(self, Self::Verbose | Self::Normal)
    }

    /// Status lines are printed.
    pub fn shows_status(&self) -> bool {
        !matches!(self, Self::Silent)
    }
}
