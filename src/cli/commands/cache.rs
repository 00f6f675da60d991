//! Cache command implementation.
//!
//! Provides `pyscope cache clear` and `pyscope cache stats`.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::cache::{format_duration, StatusCache};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Arguments for the cache command.
#[derive(Debug, Clone, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

/// Cache subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum CacheSubcommand {
    /// Remove every cached update status.
    Clear,
    /// Show cache statistics.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// The cache command implementation.
pub struct CacheCommand {
    context: AppContext,
    args: CacheArgs,
}

impl CacheCommand {
    /// Create a new cache command.
    pub fn new(context: AppContext, args: CacheArgs) -> Self {
        Self { context, args }
    }
}

impl Command for CacheCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> crate::error::Result<CommandResult> {
        let store = self.context.cache_store();

        match &self.args.command {
            CacheSubcommand::Clear => clear_cache(&store, ui)?,
            CacheSubcommand::Stats { json } => show_stats(&store, *json, ui)?,
        }
        Ok(CommandResult::success())
    }
}

fn clear_cache(store: &StatusCache, ui: &mut dyn UserInterface) -> Result<()> {
    let removed = store.clear()?;
    if removed == 0 {
        ui.message("Cache is already empty");
    } else {
        ui.success(&format!("Removed {} cached environments", removed));
    }
    Ok(())
}

fn show_stats(store: &StatusCache, json: bool, ui: &mut dyn UserInterface) -> Result<()> {
    let stats = store.stats()?;

    if json {
        ui.data(&serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    ui.data(&format!("Location: {}", store.root().display()));
    ui.data(&format!("Environments: {}", stats.entries));
    ui.data(&format!("Expired: {}", stats.expired));
    ui.data(&format!("Size: {}", format_size(stats.size_bytes)));
    let ttl = chrono::Duration::seconds(store.ttl_secs() as i64);
    ui.data(&format!("TTL: {}", format_duration(ttl)));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
