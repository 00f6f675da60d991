//! Reading the package list of an environment.

use std::collections::HashSet;

use super::{InventoryError, Package};
use crate::environment::Environment;
use crate::manager::{self, ManagerSettings, PackageManager};
use crate::session::CancelToken;

/// Reads installed packages through the environment's package manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryReader {
    settings: ManagerSettings,
}

impl InventoryReader {
    pub fn new(settings: ManagerSettings) -> Self {
        Self { settings }
    }

    /// List packages installed in `env`.
    ///
    /// The result has one entry per normalized name, sorted by name, with
    /// every status `unknown`.
    pub fn read(&self, env: &Environment, cancel: &CancelToken) -> Result<Vec<Package>, InventoryError> {
        let manager = manager::for_environment(env, self.settings);
        let packages = self.read_with(manager.as_ref(), cancel)?;
        tracing::info!(
            "Read {} packages from {} via {}",
            packages.len(),
            env.label,
            manager.name()
        );
        Ok(packages)
    }

    /// List packages with an explicit manager.
    pub fn read_with(
        &self,
        manager: &dyn PackageManager,
        cancel: &CancelToken,
    ) -> Result<Vec<Package>, InventoryError> {
        if cancel.is_cancelled() {
            return Err(InventoryError::Cancelled);
        }
        let listed = manager.list(cancel)?;
        let mut seen = HashSet::new();
        let mut packages: Vec<Package> = listed
            .into_iter()
            .filter(|p| !p.name.trim().is_empty())
            .filter(|p| seen.insert(p.key()))
            .map(|p| Package::new(p.name, p.version))
            .collect();
        packages.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{Action, ActionFailure};
    use crate::shell::{CommandResult, OutputCallback};

    struct Listing(Result<Vec<Package>, InventoryError>);

    impl PackageManager for Listing {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn list(&self, _cancel: &CancelToken) -> Result<Vec<Package>, InventoryError> {
            self.0.clone()
        }

        fn run(&self, _action: &Action, _output: Option<OutputCallback>) -> Result<CommandResult, ActionFailure> {
            unreachable!("listing only")
        }

        fn installed_version(&self, _name: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn sorts_and_dedupes_by_normalized_name() {
        let manager = Listing(Ok(vec![
            Package::new("requests", "2.28.0"),
            Package::new("Black", "23.1.0"),
            Package::new("black", "23.1.0"),
            Package::new("", "1.0"),
        ]));
        let packages = InventoryReader::default()
            .read_with(&manager, &CancelToken::new())
            .unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Black", "requests"]);
    }

    #[test]
    fn listed_status_is_reset_to_unknown() {
        let mut pkg = Package::new("rich", "13.0.0");
        pkg.status = crate::inventory::PackageStatus::Updated;
        let manager = Listing(Ok(vec![pkg]));
        let packages = InventoryReader::default()
            .read_with(&manager, &CancelToken::new())
            .unwrap();
        assert_eq!(packages[0].status, crate::inventory::PackageStatus::Unknown);
    }

    #[test]
    fn empty_environment_is_empty_list() {
        let manager = Listing(Ok(vec![]));
        let packages = InventoryReader::default()
            .read_with(&manager, &CancelToken::new())
            .unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn manager_errors_propagate() {
        let manager = Listing(Err(InventoryError::Timeout {
            command: "pip list".into(),
            seconds: 15,
        }));
        let err = InventoryReader::default()
            .read_with(&manager, &CancelToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("timed out after 15s"));
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let token = CancelToken::new();
        token.cancel();
        let manager = Listing(Ok(vec![Package::new("x", "1")]));
        let err = InventoryReader::default().read_with(&manager, &token).unwrap_err();
        assert_eq!(err, InventoryError::Cancelled);
    }
}
