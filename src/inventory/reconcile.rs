//! Carrying known update statuses over to a freshly read inventory.

use std::collections::{BTreeMap, HashMap};

use crate::cache::CachedStatus;
use crate::index::compare_versions;

use super::package::{Package, PackageStatus};

/// Merge status knowledge into a fresh package list.
///
/// For each package, in order of preference:
/// 1. the previous in-memory record, when it has the same version and a
///    known status
/// 2. the cached record for the same version
/// 3. any previously known latest version, re-compared against the newly
///    installed version (so an update to the latest shows as updated)
///
/// Packages with no prior knowledge stay `unknown`.
pub fn reconcile(
    fresh: Vec<Package>,
    previous: &[Package],
    cached: Option<&BTreeMap<String, CachedStatus>>,
) -> Vec<Package> {
    let previous: HashMap<String, &Package> = previous.iter().map(|p| (p.key(), p)).collect();

    fresh
        .into_iter()
        .map(|mut pkg| {
            let key = pkg.key();
            let prior = previous.get(&key).copied();
            let cached = cached.and_then(|c| c.get(&key));

            if let Some(prior) = prior.filter(|p| {
                p.version == pkg.version && p.status != PackageStatus::Unknown
            }) {
                pkg.latest = prior.latest.clone();
                pkg.status = prior.status;
                return pkg;
            }

            if let Some(entry) = cached.filter(|c| c.version == pkg.version) {
                pkg.latest = entry.latest.clone();
                pkg.status = entry.status;
                return pkg;
            }

            let known_latest = prior
                .and_then(|p| p.latest.clone())
                .or_else(|| cached.and_then(|c| c.latest.clone()));
            if let Some(latest) = known_latest {
                pkg.status = compare_versions(&pkg.version, &latest);
                if pkg.status != PackageStatus::Unknown {
                    pkg.latest = Some(latest);
                }
            }
            pkg
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(name: &str, version: &str, latest: &str, status: PackageStatus) -> Package {
        Package {
            name: name.to_string(),
            version: version.to_string(),
            latest: Some(latest.to_string()),
            status,
        }
    }

    fn cached(version: &str, latest: Option<&str>, status: PackageStatus) -> CachedStatus {
        CachedStatus {
            version: version.to_string(),
            latest: latest.map(str::to_string),
            status,
        }
    }

    #[test]
    fn fresh_packages_without_history_stay_unknown() {
        let result = reconcile(vec![Package::new("rich", "13.0.0")], &[], None);
        assert_eq!(result[0].status, PackageStatus::Unknown);
        assert!(result[0].latest.is_none());
    }

    #[test]
    fn same_version_keeps_previous_status() {
        let previous = vec![checked("requests", "2.28.0", "2.31.0", PackageStatus::Outdated)];
        let result = reconcile(vec![Package::new("requests", "2.28.0")], &previous, None);
        assert_eq!(result[0].status, PackageStatus::Outdated);
        assert_eq!(result[0].latest.as_deref(), Some("2.31.0"));
    }

    #[test]
    fn upgraded_to_latest_becomes_updated() {
        let previous = vec![checked("requests", "2.28.0", "2.31.0", PackageStatus::Outdated)];
        let result = reconcile(vec![Package::new("requests", "2.31.0")], &previous, None);
        assert_eq!(result[0].status, PackageStatus::Updated);
    }

    #[test]
    fn cache_entry_for_same_version_is_adopted() {
        let mut cache = BTreeMap::new();
        cache.insert(
            "black".to_string(),
            cached("23.1.0", Some("24.2.0"), PackageStatus::Outdated),
        );
        let result = reconcile(vec![Package::new("black", "23.1.0")], &[], Some(&cache));
        assert_eq!(result[0].status, PackageStatus::Outdated);
        assert_eq!(result[0].latest.as_deref(), Some("24.2.0"));
    }

    #[test]
    fn cached_latest_equal_to_installed_is_updated() {
        let mut cache = BTreeMap::new();
        cache.insert(
            "black".to_string(),
            cached("23.1.0", Some("24.2.0"), PackageStatus::Outdated),
        );
        let result = reconcile(vec![Package::new("black", "24.2.0")], &[], Some(&cache));
        assert_eq!(result[0].status, PackageStatus::Updated);
    }

    #[test]
    fn lookup_uses_normalized_names() {
        let previous = vec![checked("PyYAML", "6.0", "6.0.1", PackageStatus::Outdated)];
        let result = reconcile(vec![Package::new("pyyaml", "6.0")], &previous, None);
        assert_eq!(result[0].status, PackageStatus::Outdated);
    }

    #[test]
    fn unknown_previous_status_is_not_carried() {
        let previous = vec![Package::new("numpy", "1.26.0")];
        let result = reconcile(vec![Package::new("numpy", "1.26.0")], &previous, None);
        assert_eq!(result[0].status, PackageStatus::Unknown);
    }
}
