//! Install, uninstall and update packages.
//!
//! Requests are validated before anything runs. Actions against the same
//! environment are serialized by a per-environment lock, and a successful
//! action is followed by a fresh inventory read under the same lock.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::{Duration, Instant};

pub use crate::manager::{Action, ActionFailure, ProgressEvent};

use crate::environment::Environment;
use crate::inventory::{normalize_name, InventoryReader, Package};
use crate::manager::{self, parse_progress_line, ManagerSettings, PackageManager};
use crate::session::CancelToken;
use crate::shell::OutputCallback;

/// Receives progress steps while an action runs.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send>;

const MAX_NAME_LEN: usize = 100;
const MAX_VERSION_LEN: usize = 64;

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$").unwrap());

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9.+!_-]*[A-Za-z0-9])?$").unwrap());

/// Result of a successful action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: Action,
    /// Version installed afterwards, `None` after an uninstall.
    pub version_after: Option<String>,
    /// Inventory read after the action, when the read succeeded.
    pub inventory: Option<Vec<Package>>,
    pub duration: Duration,
}

/// Check a package name.
pub fn validate_name(name: &str) -> Result<(), ActionFailure> {
    let invalid = |detail: String| Err(ActionFailure::InvalidRequest { detail });
    if name.is_empty() {
        return invalid("package name is empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return invalid(format!("package name longer than {} characters", MAX_NAME_LEN));
    }
    if !NAME.is_match(name) {
        return invalid(format!("'{}' is not a valid package name", name));
    }
    Ok(())
}

/// Check a requested version string.
pub fn validate_version(version: &str) -> Result<(), ActionFailure> {
    if version.len() > MAX_VERSION_LEN || !VERSION.is_match(version) {
        return Err(ActionFailure::InvalidRequest {
            detail: format!("'{}' is not a valid version", version),
        });
    }
    Ok(())
}

fn validate(action: &Action) -> Result<(), ActionFailure> {
    validate_name(action.package())?;
    if let Action::Install {
        version: Some(version),
        ..
    } = action
    {
        validate_version(version)?;
    }
    Ok(())
}

/// Runs actions, one at a time per environment.
#[derive(Default)]
pub struct ActionExecutor {
    settings: ManagerSettings,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ActionExecutor {
    pub fn new(settings: ManagerSettings) -> Self {
        Self {
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, environment_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(locks.entry(environment_id.to_string()).or_default())
    }

    /// Run `action` in `env` with its package manager.
    ///
    /// `inventory` is the current package list; uninstalling or updating
    /// something not in it fails with `NotFound` without running anything.
    pub fn execute(
        &self,
        env: &Environment,
        action: &Action,
        inventory: &[Package],
        progress: Option<ProgressCallback>,
    ) -> Result<ActionOutcome, ActionFailure> {
        let manager = manager::for_environment(env, self.settings);
        self.execute_with(&env.id(), manager.as_ref(), action, inventory, progress)
    }

    /// Run `action` with an explicit manager.
    pub fn execute_with(
        &self,
        environment_id: &str,
        manager: &dyn PackageManager,
        action: &Action,
        inventory: &[Package],
        progress: Option<ProgressCallback>,
    ) -> Result<ActionOutcome, ActionFailure> {
        validate(action)?;

        let key = normalize_name(action.package());
        let installed = inventory.iter().any(|p| p.key() == key);
        if !installed && !matches!(action, Action::Install { .. }) {
            tracing::info!("{} is not installed, not running {}", action.package(), action.verb());
            return Err(ActionFailure::NotFound {
                package: action.package().to_string(),
            });
        }

        let lock = self.lock_for(environment_id);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());

        let started = Instant::now();
        let output: Option<OutputCallback> = progress.map(|callback| -> OutputCallback {
            Box::new(move |line| {
                tracing::trace!("{}", line.text());
                if let Some(event) = parse_progress_line(line.text()) {
                    callback(event);
                }
            })
        });

        match manager.run(action, output) {
            Ok(_) => {}
            Err(failure) => {
                tracing::warn!("{} failed: {}", action, failure);
                return Err(failure);
            }
        }
        let duration = started.elapsed();
        tracing::info!("{} succeeded in {:.1}s", action, duration.as_secs_f64());

        let inventory = match InventoryReader::new(self.settings).read_with(manager, &CancelToken::new()) {
            Ok(packages) => Some(packages),
            Err(err) => {
                tracing::warn!("Could not refresh packages after {}: {}", action, err);
                None
            }
        };

        let version_after = match action {
            Action::Uninstall { .. } => None,
            _ => inventory
                .as_ref()
                .and_then(|pkgs| pkgs.iter().find(|p| p.key() == key))
                .map(|p| p.version.clone())
                .or_else(|| manager.installed_version(action.package())),
        };

        Ok(ActionOutcome {
            action: action.clone(),
            version_after,
            inventory,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryError;
    use crate::shell::{CommandResult, OutputLine};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Manager stub holding an in-memory package list.
    struct FakeManager {
        packages: Mutex<Vec<Package>>,
        failure: Option<ActionFailure>,
        runs: AtomicUsize,
        running: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    impl FakeManager {
        fn new(packages: Vec<Package>) -> Self {
            Self {
                packages: Mutex::new(packages),
                failure: None,
                runs: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn failing(failure: ActionFailure) -> Self {
            Self {
                failure: Some(failure),
                ..Self::new(vec![])
            }
        }
    }

    fn ok_result(stdout: &str) -> CommandResult {
        CommandResult {
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
            duration: Duration::from_millis(1),
            success: true,
        }
    }

    impl PackageManager for FakeManager {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn list(&self, _cancel: &CancelToken) -> Result<Vec<Package>, InventoryError> {
            Ok(self.packages.lock().unwrap().clone())
        }

        fn run(&self, action: &Action, output: Option<OutputCallback>) -> Result<CommandResult, ActionFailure> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.running.fetch_sub(1, Ordering::SeqCst);

            if let Some(failure) = &self.failure {
                return Err(failure.clone());
            }
            let mut packages = self.packages.lock().unwrap();
            let key = normalize_name(action.package());
            packages.retain(|p| p.key() != key);
            let line = match action {
                Action::Uninstall { name } => format!("Successfully uninstalled {}-1.0", name),
                Action::Install { name, version } => {
                    let version = version.clone().unwrap_or_else(|| "2.0".to_string());
                    packages.push(Package::new(name, &version));
                    format!("Successfully installed {}-{}", name, version)
                }
                Action::Update { name } => {
                    packages.push(Package::new(name, "2.0"));
                    format!("Successfully installed {}-2.0", name)
                }
            };
            if let Some(output) = output {
                output(OutputLine::Stdout(format!("Collecting {}", action.package())));
                output(OutputLine::Stdout(line.clone()));
            }
            Ok(ok_result(&line))
        }

        fn installed_version(&self, name: &str) -> Option<String> {
            let key = normalize_name(name);
            self.packages
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.key() == key)
                .map(|p| p.version.clone())
        }
    }

    #[test]
    fn install_refreshes_inventory() {
        let manager = FakeManager::new(vec![Package::new("six", "1.16.0")]);
        let executor = ActionExecutor::default();
        let action = Action::Install {
            name: "requests".into(),
            version: Some("2.31.0".into()),
        };
        let outcome = executor
            .execute_with("/usr/bin/python3", &manager, &action, &[], None)
            .unwrap();

        assert_eq!(outcome.version_after.as_deref(), Some("2.31.0"));
        let names: Vec<_> = outcome
            .inventory
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["requests", "six"]);
    }

    #[test]
    fn uninstall_of_absent_package_does_not_run() {
        let manager = FakeManager::new(vec![Package::new("six", "1.16.0")]);
        let executor = ActionExecutor::default();
        let inventory = vec![Package::new("six", "1.16.0")];

        let err = executor
            .execute_with(
                "/usr/bin/python3",
                &manager,
                &Action::Uninstall { name: "ghost".into() },
                &inventory,
                None,
            )
            .unwrap_err();

        assert_eq!(err, ActionFailure::NotFound { package: "ghost".into() });
        assert_eq!(manager.runs.load(Ordering::SeqCst), 0);
        assert_eq!(manager.packages.lock().unwrap().len(), 1);
    }

    #[test]
    fn update_of_absent_package_is_not_found() {
        let manager = FakeManager::new(vec![]);
        let err = ActionExecutor::default()
            .execute_with("e", &manager, &Action::Update { name: "black".into() }, &[], None)
            .unwrap_err();
        assert_eq!(err.reason(), "not_found");
    }

    #[test]
    fn uninstall_reports_no_version_after() {
        let inventory = vec![Package::new("Six", "1.16.0")];
        let manager = FakeManager::new(inventory.clone());
        let outcome = ActionExecutor::default()
            .execute_with("e", &manager, &Action::Uninstall { name: "six".into() }, &inventory, None)
            .unwrap();
        assert!(outcome.version_after.is_none());
        assert!(outcome.inventory.unwrap().is_empty());
    }

    #[test]
    fn invalid_names_are_rejected_before_running() {
        let manager = FakeManager::new(vec![]);
        let executor = ActionExecutor::default();
        let long = "x".repeat(101);
        for name in ["", "-rf", "foo;rm", "a b", "pkg-", long.as_str()] {
            let action = Action::Install {
                name: name.to_string(),
                version: None,
            };
            let err = executor.execute_with("e", &manager, &action, &[], None).unwrap_err();
            assert_eq!(err.reason(), "invalid_request", "name {:?}", name);
        }
        assert_eq!(manager.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_versions_are_rejected() {
        assert!(validate_version("2.31.0").is_ok());
        assert!(validate_version("1.0rc1").is_ok());
        assert!(validate_version("1.0+local.1").is_ok());
        assert!(validate_version(">=1.0").is_err());
        assert!(validate_version("1.0; rm").is_err());
        assert!(validate_version("").is_err());
    }

    #[test]
    fn valid_names_pass() {
        for name in ["requests", "zope.interface", "typing_extensions", "Django", "a"] {
            assert!(validate_name(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn failures_are_returned_unchanged() {
        let manager = FakeManager::failing(ActionFailure::PermissionDenied {
            detail: "[Errno 13]".into(),
        });
        let err = ActionExecutor::default()
            .execute_with(
                "e",
                &manager,
                &Action::Install {
                    name: "requests".into(),
                    version: None,
                },
                &[],
                None,
            )
            .unwrap_err();
        assert_eq!(err.reason(), "permission_denied");
    }

    #[test]
    fn progress_events_are_forwarded() {
        let manager = FakeManager::new(vec![]);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        ActionExecutor::default()
            .execute_with(
                "e",
                &manager,
                &Action::Install {
                    name: "rich".into(),
                    version: None,
                },
                &[],
                Some(Box::new(move |event| sink.lock().unwrap().push(event))),
            )
            .unwrap();
        let events = events.lock().unwrap();
        assert_eq!(events[0], ProgressEvent::Collecting("rich".into()));
        assert!(matches!(events[1], ProgressEvent::Installed(_)));
    }

    #[test]
    fn actions_on_one_environment_are_serialized() {
        let manager = FakeManager {
            delay: Duration::from_millis(30),
            ..FakeManager::new(vec![])
        };
        let executor = ActionExecutor::default();
        thread::scope(|s| {
            for i in 0..4 {
                let (executor, manager) = (&executor, &manager);
                s.spawn(move || {
                    let action = Action::Install {
                        name: format!("pkg{}", i),
                        version: None,
                    };
                    executor
                        .execute_with("/same/python", manager, &action, &[], None)
                        .unwrap();
                });
            }
        });
        assert_eq!(manager.runs.load(Ordering::SeqCst), 4);
        assert_eq!(manager.peak.load(Ordering::SeqCst), 1);
    }
}
