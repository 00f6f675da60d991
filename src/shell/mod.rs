//! Process execution and platform checks.

pub mod command;
pub mod platform;

pub use command::{
    display_command, execute, execute_streaming, CommandError, CommandOptions, CommandResult,
    OutputCallback, OutputLine,
};
pub use platform::{is_ci, is_elevated, permission_hint};
