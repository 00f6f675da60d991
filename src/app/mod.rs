//! Background jobs for the active environment.
//!
//! The [`Controller`] owns the [`Session`]. Inventory loads, update checks
//! and actions run on worker threads and report back as [`Event`]s over a
//! channel; the front-end thread pulls them with [`Controller::next_event`]
//! and hands them to [`Controller::apply`], which drops anything whose
//! ticket is no longer current.

mod context;

pub use context::AppContext;

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cache::StatusCache;
use crate::config::PyscopeConfig;
use crate::environment::Environment;
use crate::error::Result;
use crate::executor::{Action, ActionExecutor, ActionFailure, ActionOutcome, ProgressCallback};
use crate::index::{
    CheckReport, IndexClient, IndexSettings, PypiClient, StatusUpdate, UpdateOracle,
};
use crate::inventory::{InventoryError, InventoryReader};
use crate::manager::{self, ManagerSettings, PackageManager};
use crate::session::{Session, Ticket};

/// Builds the package manager for an environment.
pub type ManagerFactory = Arc<dyn Fn(&Environment) -> Box<dyn PackageManager> + Send + Sync>;

/// Result of a background job.
#[derive(Debug)]
pub enum Event {
    InventoryLoaded {
        ticket: Ticket,
        result: std::result::Result<Vec<crate::inventory::Package>, InventoryError>,
    },
    StatusChecked {
        ticket: Ticket,
        update: StatusUpdate,
    },
    CheckFinished {
        ticket: Ticket,
        report: CheckReport,
    },
    ActionFinished {
        ticket: Ticket,
        result: std::result::Result<ActionOutcome, ActionFailure>,
    },
}

impl Event {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Self::InventoryLoaded { ticket, .. }
            | Self::StatusChecked { ticket, .. }
            | Self::CheckFinished { ticket, .. }
            | Self::ActionFinished { ticket, .. } => ticket,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::InventoryLoaded { .. } => "inventory",
            Self::StatusChecked { .. } => "status",
            Self::CheckFinished { .. } => "check report",
            Self::ActionFinished { .. } => "action result",
        }
    }
}

/// What applying an event did to the session.
#[derive(Debug)]
pub enum Applied {
    /// Package count, or why the list could not be read.
    Inventory(std::result::Result<usize, InventoryError>),
    Status(StatusUpdate),
    CheckFinished(CheckReport),
    Action(std::result::Result<ActionOutcome, ActionFailure>),
    /// The event belonged to superseded work and was dropped.
    Stale,
}

pub struct Controller {
    session: Session,
    reader: InventoryReader,
    oracle: Arc<UpdateOracle>,
    executor: Arc<ActionExecutor>,
    managers: ManagerFactory,
    cache: Option<StatusCache>,
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Controller {
    /// Controller talking to the configured index and real package managers.
    pub fn new(config: &PyscopeConfig, cache: Option<StatusCache>) -> Result<Self> {
        let index = config.index_settings();
        let client = PypiClient::new(&index)?;
        let settings = config.manager_settings();
        let managers: ManagerFactory =
            Arc::new(move |env: &Environment| manager::for_environment(env, settings));
        Ok(Self::with_parts(
            Arc::new(client),
            index,
            settings,
            managers,
            cache,
        ))
    }

    /// Controller with explicit collaborators.
    pub fn with_parts(
        client: Arc<dyn IndexClient>,
        index: IndexSettings,
        settings: ManagerSettings,
        managers: ManagerFactory,
        cache: Option<StatusCache>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            session: Session::new(),
            reader: InventoryReader::new(settings),
            oracle: Arc::new(UpdateOracle::new(client, index)),
            executor: Arc::new(ActionExecutor::new(settings)),
            managers,
            cache,
            tx,
            rx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Make `env` active and start loading its packages.
    pub fn select(&mut self, env: Environment) -> Ticket {
        let ticket = self.session.switch_environment(env.clone());
        self.spawn_load(env, ticket.clone());
        ticket
    }

    /// Reload the active environment, superseding running work.
    pub fn refresh(&mut self) -> Option<Ticket> {
        let env = self.session.active()?.clone();
        let ticket = self.session.begin_refresh()?;
        self.spawn_load(env, ticket.clone());
        Some(ticket)
    }

    fn spawn_load(&self, env: Environment, ticket: Ticket) {
        let tx = self.tx.clone();
        let reader = self.reader;
        let managers = Arc::clone(&self.managers);
        thread::spawn(move || {
            let manager = managers(&env);
            let result = reader.read_with(manager.as_ref(), &ticket.cancel);
            match &result {
                Ok(packages) => tracing::info!(
                    "Read {} packages from {} via {}",
                    packages.len(),
                    env.label,
                    manager.name()
                ),
                Err(err) => tracing::warn!("Reading packages of {} failed: {}", env.label, err),
            }
            let _ = tx.send(Event::InventoryLoaded { ticket, result });
        });
    }

    /// Look up the latest version of every loaded package.
    ///
    /// Returns `None` until an inventory has been committed.
    pub fn start_check(&mut self) -> Option<Ticket> {
        if !self.session.is_loaded() {
            return None;
        }
        let ticket = self.session.current_ticket()?;
        let packages = self.session.packages().to_vec();
        let oracle = Arc::clone(&self.oracle);
        let tx = self.tx.clone();
        let job = ticket.clone();
        thread::spawn(move || {
            let report = oracle.check(&packages, &job.cancel, |update| {
                let _ = tx.send(Event::StatusChecked {
                    ticket: job.clone(),
                    update,
                });
            });
            let _ = tx.send(Event::CheckFinished { ticket: job, report });
        });
        Some(ticket)
    }

    /// Run an install, uninstall or update against the active environment.
    ///
    /// Returns `None` until an inventory has been committed.
    pub fn start_action(
        &mut self,
        action: Action,
        progress: Option<ProgressCallback>,
    ) -> Option<Ticket> {
        if !self.session.is_loaded() {
            return None;
        }
        let env = self.session.active()?.clone();
        let ticket = self.session.current_ticket()?;
        let inventory = self.session.packages().to_vec();
        let executor = Arc::clone(&self.executor);
        let managers = Arc::clone(&self.managers);
        let tx = self.tx.clone();
        let job = ticket.clone();
        thread::spawn(move || {
            let manager = managers(&env);
            let result =
                executor.execute_with(&env.id(), manager.as_ref(), &action, &inventory, progress);
            let _ = tx.send(Event::ActionFinished { ticket: job, result });
        });
        Some(ticket)
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_event(&self, timeout: Duration) -> Option<Event> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            // The controller holds a sender, so this can't happen.
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Apply an event to the session.
    pub fn apply(&mut self, event: Event) -> Applied {
        if !self.session.is_current(event.ticket()) {
            tracing::debug!(
                "Discarding stale {} from generation {}",
                event.kind(),
                event.ticket().generation
            );
            return Applied::Stale;
        }

        match event {
            Event::InventoryLoaded { ticket, result } => match result {
                Ok(packages) => {
                    let count = packages.len();
                    let cached = self
                        .load_cached(&ticket.environment_id)
                        .map(|snapshot| snapshot.packages);
                    self.session
                        .commit_inventory(&ticket, packages, cached.as_ref());
                    Applied::Inventory(Ok(count))
                }
                Err(err) => Applied::Inventory(Err(err)),
            },
            Event::StatusChecked { ticket, update } => {
                self.session.apply_status(&ticket, &update);
                Applied::Status(update)
            }
            Event::CheckFinished { ticket, report } => {
                if !report.cancelled {
                    self.store_cache(&ticket.environment_id);
                }
                Applied::CheckFinished(report)
            }
            Event::ActionFinished { ticket, result } => {
                if let Ok(ActionOutcome {
                    inventory: Some(packages),
                    ..
                }) = &result
                {
                    self.session
                        .commit_inventory(&ticket, packages.clone(), None);
                    self.store_cache(&ticket.environment_id);
                }
                Applied::Action(result)
            }
        }
    }

    fn load_cached(&self, environment_id: &str) -> Option<crate::cache::StatusSnapshot> {
        let cache = self.cache.as_ref()?;
        match cache.load(environment_id) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!("Ignoring status cache: {}", err);
                None
            }
        }
    }

    fn store_cache(&self, environment_id: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Err(err) = cache.save(environment_id, self.session.packages()) {
            tracing::warn!("Could not write status cache: {}", err);
        }
    }

    /// Select `env` and wait for its inventory.
    pub fn load(&mut self, env: Environment) -> std::result::Result<usize, InventoryError> {
        let ticket = self.select(env);
        self.wait(&ticket, |applied| match applied {
            Applied::Inventory(result) => Some(result),
            _ => None,
        })
        .unwrap_or(Err(InventoryError::Cancelled))
    }

    /// Run an update check to completion, calling `on_status` per package.
    pub fn check<F>(&mut self, mut on_status: F) -> Option<CheckReport>
    where
        F: FnMut(&StatusUpdate),
    {
        let ticket = self.start_check()?;
        self.wait(&ticket, |applied| match applied {
            Applied::Status(update) => {
                on_status(&update);
                None
            }
            Applied::CheckFinished(report) => Some(report),
            _ => None,
        })
    }

    /// Run an action to completion.
    pub fn run_action(
        &mut self,
        action: Action,
        progress: Option<ProgressCallback>,
    ) -> Option<std::result::Result<ActionOutcome, ActionFailure>> {
        let ticket = self.start_action(action, progress)?;
        self.wait(&ticket, |applied| match applied {
            Applied::Action(result) => Some(result),
            _ => None,
        })
    }

    /// Apply events until `done` yields a value for `ticket`'s job.
    ///
    /// Returns `None` if the ticket is superseded first.
    fn wait<T, F>(&mut self, ticket: &Ticket, mut done: F) -> Option<T>
    where
        F: FnMut(Applied) -> Option<T>,
    {
        loop {
            if !self.session.is_current(ticket) {
                return None;
            }
            let Some(event) = self.next_event(Duration::from_millis(100)) else {
                continue;
            };
            let own = event.ticket().generation == ticket.generation;
            let applied = self.apply(event);
            if own {
                if let Some(value) = done(applied) {
                    return Some(value);
                }
            }
        }
    }
}
