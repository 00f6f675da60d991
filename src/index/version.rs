//! Package version parsing and ordering.
//!
//! Implements the ordering rules Python packaging tools use (PEP 440):
//! epochs, release segments, pre/post/dev releases, and local versions,
//! including the alternate spellings pip accepts (`alpha`, `c`, `rev`,
//! `-1` as an implicit post release, and so on).

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::inventory::PackageStatus;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?P<pre>[-_.]?(?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)[-_.]?(?P<pre_n>[0-9]+)?)?
        (?P<post>(?:-(?P<post_n1>[0-9]+))|(?:[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>[0-9]+)?))?
        (?P<dev>[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>[0-9]+)?)?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$",
    )
    .expect("version pattern is valid")
});

/// Pre-release phase, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PreRelease {
    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "a" | "alpha" => Self::Alpha,
            "b" | "beta" => Self::Beta,
            _ => Self::ReleaseCandidate,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::ReleaseCandidate => "rc",
        }
    }
}

/// One dot-separated piece of a local version label.
///
/// Numeric segments sort after alphanumeric ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LocalSegment {
    Text(String),
    Number(u64),
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Error returned when a string is not a valid package version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version: '{0}'")]
pub struct InvalidVersion(pub String);

/// A parsed package version.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<Vec<LocalSegment>>,
}

// Sort key for the pre-release slot. Variant order is the sort order:
// a bare dev release sorts before any pre-release of the same release.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreRelease, u64),
    Final,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    None,
}

impl Version {
    /// Parse a version string.
    pub fn parse(input: &str) -> Result<Self, InvalidVersion> {
        let invalid = || InvalidVersion(input.to_string());
        let caps = VERSION_PATTERN.captures(input).ok_or_else(invalid)?;

        let number = |name: &str| -> Result<Option<u64>, InvalidVersion> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u64>().map_err(|_| invalid()))
                .transpose()
        };

        let epoch = number("epoch")?.unwrap_or(0);

        let release = caps
            .name("release")
            .ok_or_else(invalid)?
            .as_str()
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => Some((
                PreRelease::from_label(label.as_str()),
                number("pre_n")?.unwrap_or(0),
            )),
            None => None,
        };

        let post = if caps.name("post_n1").is_some() {
            number("post_n1")?
        } else if caps.name("post_l").is_some() {
            Some(number("post_n2")?.unwrap_or(0))
        } else {
            None
        };

        let dev = if caps.name("dev_l").is_some() {
            Some(number("dev_n")?.unwrap_or(0))
        } else {
            None
        };

        let local = caps.name("local").map(|m| {
            m.as_str()
                .split(['-', '_', '.'])
                .map(|seg| match seg.parse::<u64>() {
                    Ok(n) => LocalSegment::Number(n),
                    Err(_) => LocalSegment::Text(seg.to_ascii_lowercase()),
                })
                .collect()
        });

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    /// Release segments as written (trailing zeros kept).
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Whether this is a pre-release or development release.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Whether the version carries a local label (`+ubuntu1`).
    pub fn is_local(&self) -> bool {
        self.local.is_some()
    }

    fn trimmed_release(&self) -> &[u64] {
        let end = self
            .release
            .iter()
            .rposition(|&n| n != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.release[..end]
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (Some((phase, n)), _, _) => PreKey::Pre(phase, n),
            (None, _, _) => PreKey::Final,
        }
    }

    fn dev_key(&self) -> DevKey {
        match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::None,
        }
    }
}

impl FromStr for Version {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.trimmed_release().cmp(other.trimmed_release()))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((phase, n)) = self.pre {
            write!(f, "{}{}", phase.as_str(), n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        if let Some(local) = &self.local {
            let parts: Vec<String> = local.iter().map(|s| s.to_string()).collect();
            write!(f, "+{}", parts.join("."))?;
        }
        Ok(())
    }
}

/// Loose normalization used when a version cannot be parsed.
fn normalize_loose(v: &str) -> String {
    let v = v.trim().to_ascii_lowercase();
    v.strip_prefix('v').map(str::to_string).unwrap_or(v)
}

/// Classify an installed version against the index's latest version.
///
/// An installed version at or above the latest is up to date (local and dev
/// builds can sort above the published release). When either side cannot be
/// parsed, only an exact normalized match counts as up to date.
pub fn compare_versions(installed: &str, latest: &str) -> PackageStatus {
    match (Version::parse(installed), Version::parse(latest)) {
        (Ok(installed), Ok(latest)) => {
            if installed >= latest {
                PackageStatus::Updated
            } else {
                PackageStatus::Outdated
            }
        }
        _ => {
            if normalize_loose(installed) == normalize_loose(latest) {
                PackageStatus::Updated
            } else {
                PackageStatus::Unknown
            }
        }
    }
}
