//! Installed package records and update status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Update status of an installed package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    /// Installed version is the latest published release (or newer).
    Updated,
    /// A newer release is available.
    Outdated,
    /// Not checked yet, or the index query failed.
    #[default]
    Unknown,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Outdated => "outdated",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A package installed in one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Distribution name as reported by the package manager.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Latest version known from the index, once checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    /// Update status.
    #[serde(default)]
    pub status: PackageStatus,
}

impl Package {
    /// Create an unchecked package record.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            latest: None,
            status: PackageStatus::Unknown,
        }
    }

    /// Normalized name used for identity within an environment.
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Normalize a distribution name the way the package index does.
///
/// Runs of `-`, `_` and `.` collapse to a single `-` and the result is
/// lowercased, so `Foo_Bar`, `foo.bar` and `foo-bar` are the same package.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
        } else {
            out.push(ch.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Which packages a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Outdated,
    Updated,
    Unknown,
}

impl StatusFilter {
    /// Whether a package passes this filter.
    pub fn matches(&self, package: &Package) -> bool {
        match self {
            Self::All => true,
            Self::Outdated => package.status == PackageStatus::Outdated,
            Self::Updated => package.status == PackageStatus::Updated,
            Self::Unknown => package.status == PackageStatus::Unknown,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "outdated" => Ok(Self::Outdated),
            "updated" => Ok(Self::Updated),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("unknown status filter: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_package_is_unknown() {
        let pkg = Package::new("requests", "2.28.0");
        assert_eq!(pkg.status, PackageStatus::Unknown);
        assert!(pkg.latest.is_none());
    }

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize_name("Foo_Bar"), "foo-bar");
        assert_eq!(normalize_name("foo.bar"), "foo-bar");
        assert_eq!(normalize_name("foo__-.bar"), "foo-bar");
        assert_eq!(normalize_name("  Django "), "django");
    }

    #[test]
    fn key_uses_normalized_name() {
        assert_eq!(Package::new("PyYAML", "6.0").key(), "pyyaml");
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&PackageStatus::Outdated).unwrap();
        assert_eq!(json, "\"outdated\"");
    }

    #[test]
    fn filter_matches_status() {
        let mut pkg = Package::new("black", "23.1.0");
        assert!(StatusFilter::All.matches(&pkg));
        assert!(StatusFilter::Unknown.matches(&pkg));
        assert!(!StatusFilter::Outdated.matches(&pkg));

        pkg.status = PackageStatus::Outdated;
        assert!(StatusFilter::Outdated.matches(&pkg));
        assert!(!StatusFilter::Updated.matches(&pkg));
    }

    #[test]
    fn filter_parses_from_str() {
        assert_eq!("Outdated".parse::<StatusFilter>().unwrap(), StatusFilter::Outdated);
        assert!("bogus".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn package_round_trips_json_without_latest() {
        let pkg = Package::new("rich", "13.0.0");
        let json = serde_json::to_string(&pkg).unwrap();
        assert!(!json.contains("latest"));
        let back: Package = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pkg);
    }
}
