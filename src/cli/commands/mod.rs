//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which loads the
//! configuration into an [`AppContext`](crate::app::AppContext) and routes
//! the subcommand to its implementation. Package commands resolve an
//! environment, drive a [`Controller`](crate::app::Controller) to
//! completion, and render through the [`UserInterface`](crate::ui::UserInterface).

pub mod cache;
pub mod check;
pub mod completions;
pub mod config;
pub mod dispatcher;
pub mod display;
pub mod envs;
pub mod install;
pub mod list;
pub mod search;
pub mod uninstall;
pub mod update;

pub use dispatcher::{Command, CommandDispatcher, CommandResult, EXIT_ACTION_FAILED};
