//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::inventory::StatusFilter;

use super::commands::cache::CacheArgs;

/// pyscope - find Python environments and manage their packages.
#[derive(Debug, Parser)]
#[command(name = "pyscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Extra config file, applied over ~/.pyscope/config.yml and .pyscope.yml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ignore the update-status cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Show verbose output, including timings and unchecked packages
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List Python environments on this machine
    Envs(EnvsArgs),

    /// List packages installed in an environment
    List(ListArgs),

    /// Check installed packages against the package index
    Check(CheckArgs),

    /// Install a package
    Install(InstallArgs),

    /// Uninstall a package
    Uninstall(UninstallArgs),

    /// Update packages to their latest version
    Update(UpdateArgs),

    /// Search the package index
    Search(SearchArgs),

    /// Manage the update-status cache
    Cache(CacheArgs),

    /// Show the effective configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `envs` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct EnvsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Environment: index from `envs`, interpreter or prefix path, or label
    #[arg(short, long, value_name = "SEL")]
    pub env: Option<String>,

    /// Show only packages with this status
    #[arg(long, value_enum, default_value = "all")]
    pub filter: StatusFilter,

    /// Show only packages whose name contains TERM
    #[arg(long, value_name = "TERM")]
    pub search: Option<String>,

    /// Check for updates before listing
    #[arg(long)]
    pub check: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `check` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CheckArgs {
    /// Environment: index from `envs`, interpreter or prefix path, or label
    #[arg(short, long, value_name = "SEL")]
    pub env: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `install` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct InstallArgs {
    /// Package to install
    pub name: String,

    /// Exact version to install (`--version` prints pyscope's own)
    #[arg(id = "pkg_version", long = "pkg-version", value_name = "V")]
    pub version: Option<String>,

    /// Environment: index from `envs`, interpreter or prefix path, or label
    #[arg(short, long, value_name = "SEL")]
    pub env: Option<String>,
}

/// Arguments for the `uninstall` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct UninstallArgs {
    /// Package to uninstall
    pub name: String,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Environment: index from `envs`, interpreter or prefix path, or label
    #[arg(short, long, value_name = "SEL")]
    pub env: Option<String>,
}

/// Arguments for the `update` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct UpdateArgs {
    /// Packages to update
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub names: Vec<String>,

    /// Update every outdated package
    #[arg(long)]
    pub all: bool,

    /// Environment: index from `envs`, interpreter or prefix path, or label
    #[arg(short, long, value_name = "SEL")]
    pub env: Option<String>,
}

/// Arguments for the `search` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SearchArgs {
    /// Project name or search term
    pub term: String,

    /// Environment used to mark installed results
    #[arg(short, long, value_name = "SEL")]
    pub env: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `config` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
