//! The active environment and its package list.
//!
//! A [`Session`] holds exactly one active environment at a time. Every
//! background job gets a [`Ticket`] naming the environment and generation it
//! was started for; results are applied only while that ticket is still
//! current. Switching environments (or starting a new refresh) cancels the
//! previous ticket and bumps the generation, so late results from superseded
//! work are discarded instead of merged.

mod cancel;

pub use cancel::CancelToken;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::cache::CachedStatus;
use crate::environment::Environment;
use crate::index::StatusUpdate;
use crate::inventory::{reconcile, Package, PackageStatus, StatusFilter};

/// Identifies the environment and generation a background job belongs to.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub environment_id: String,
    pub generation: u64,
    pub cancel: CancelToken,
}

/// Package counts for the active environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub outdated: usize,
    pub updated: usize,
    pub unknown: usize,
}

/// State scoped to the active environment.
#[derive(Debug, Default)]
pub struct Session {
    active: Option<Environment>,
    generation: u64,
    cancel: CancelToken,
    packages: Vec<Package>,
    loaded: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active environment, if one has been selected.
    pub fn active(&self) -> Option<&Environment> {
        self.active.as_ref()
    }

    /// Current generation number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an inventory has been committed for the active environment.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Make `env` the active environment.
    ///
    /// Cancels outstanding work, drops the previous package list, and
    /// returns the ticket for loading the new environment.
    pub fn switch_environment(&mut self, env: Environment) -> Ticket {
        tracing::debug!("Switching to environment {}", env.id());
        self.packages.clear();
        self.loaded = false;
        self.active = Some(env);
        self.supersede()
    }

    /// Start a new refresh of the active environment, superseding any
    /// refresh or check still running. Keeps the current list on screen.
    pub fn begin_refresh(&mut self) -> Option<Ticket> {
        self.active.as_ref()?;
        Some(self.supersede())
    }

    /// Ticket for work that should not supersede a running job (such as
    /// an update check started after a load).
    pub fn current_ticket(&self) -> Option<Ticket> {
        self.active.as_ref().map(|env| Ticket {
            environment_id: env.id(),
            generation: self.generation,
            cancel: self.cancel.clone(),
        })
    }

    /// Whether results for `ticket` may still be applied.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
            && self
                .active
                .as_ref()
                .is_some_and(|env| env.id() == ticket.environment_id)
    }

    fn supersede(&mut self) -> Ticket {
        self.cancel.cancel();
        self.cancel = CancelToken::new();
        self.generation += 1;
        Ticket {
            environment_id: self.active.as_ref().map(|e| e.id()).unwrap_or_default(),
            generation: self.generation,
            cancel: self.cancel.clone(),
        }
    }

    /// Replace the package list with a freshly read inventory.
    ///
    /// Returns `false` (and changes nothing) when the ticket is stale.
    pub fn commit_inventory(
        &mut self,
        ticket: &Ticket,
        fresh: Vec<Package>,
        cached: Option<&BTreeMap<String, CachedStatus>>,
    ) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                "Discarding inventory for stale generation {} (current {})",
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.packages = reconcile(fresh, &self.packages, cached);
        self.loaded = true;
        true
    }

    /// Apply one update-check result.
    ///
    /// Returns `false` when the ticket is stale or the package is no longer
    /// in the list.
    pub fn apply_status(&mut self, ticket: &Ticket, update: &StatusUpdate) -> bool {
        if !self.is_current(ticket) {
            tracing::trace!("Discarding stale status for {}", update.name);
            return false;
        }
        let key = crate::inventory::normalize_name(&update.name);
        match self.packages.iter_mut().find(|p| p.key() == key) {
            Some(pkg) => {
                pkg.status = update.status;
                if update.latest.is_some() {
                    pkg.latest = update.latest.clone();
                }
                true
            }
            None => false,
        }
    }

    /// All packages of the active environment.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Look up a package by name (normalized).
    pub fn find(&self, name: &str) -> Option<&Package> {
        let key = crate::inventory::normalize_name(name);
        self.packages.iter().find(|p| p.key() == key)
    }

    /// Packages passing a status filter and an optional name search.
    pub fn filtered(&self, filter: StatusFilter, search: Option<&str>) -> Vec<&Package> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        self.packages
            .iter()
            .filter(|p| filter.matches(p))
            .filter(|p| {
                needle
                    .as_ref()
                    .is_none_or(|n| p.name.to_lowercase().contains(n))
            })
            .collect()
    }

    /// Counts by status.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.packages.len(),
            ..Default::default()
        };
        for pkg in &self.packages {
            match pkg.status {
                PackageStatus::Outdated => summary.outdated += 1,
                PackageStatus::Updated => summary.updated += 1,
                PackageStatus::Unknown => summary.unknown += 1,
            }
        }
        summary
    }
}
