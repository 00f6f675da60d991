//! Interpreter discovery at conventional install locations.
//!
//! The [`SearchPlan`] lists where to look; the [`EnvironmentLocator`] walks
//! it. Unreadable locations become [`ScanIssue`]s instead of errors so one
//! broken directory never hides the rest.

use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use super::classify::{interpreter_in_prefix, prefix_of, KnownRoots};
use super::interpreter::probe_version;
use super::Environment;

static PYTHON_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^python(\d+(\.\d+)?)?(\.exe)?$").unwrap());

/// Directory names that never contain environments worth walking into.
const IGNORED_DIRS: &[&str] = &[
    "__pycache__",
    "node_modules",
    "site-packages",
    "venv",
    "env",
    "Lib",
    "Include",
    "Scripts",
    "build",
    "dist",
    "target",
    "Library",
    "AppData",
    "Program Files",
    "Program Files (x86)",
    "Windows",
    "$RECYCLE.BIN",
    "System Volume Information",
];

/// Subdirectory names checked for a virtual environment at every level.
const VENV_DIR_NAMES: &[&str] = &["venv", ".venv", "env", ".env"];

/// Paths longer than this are skipped during the venv walk.
const MAX_PATH_LEN: usize = 300;

/// Check whether a file name looks like a Python interpreter
/// (`python`, `python3`, `python3.12`, `python.exe`).
pub fn is_python_executable_name(name: &str) -> bool {
    PYTHON_NAME.is_match(name)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

/// Options that shape discovery.
#[derive(Debug, Clone)]
pub struct LocatorOptions {
    /// Additional directories to search for virtual environments.
    pub extra_roots: Vec<PathBuf>,
    /// How many directory levels below each root to search for venvs.
    pub max_depth: usize,
    /// Whether to run each interpreter to learn its version.
    pub probe_versions: bool,
    /// Time limit for each version probe.
    pub probe_timeout: Duration,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            extra_roots: Vec::new(),
            max_depth: 3,
            probe_versions: true,
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// A directory to search for virtual environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvRoot {
    pub path: PathBuf,
    pub max_depth: usize,
}

/// Every location the locator will look at.
#[derive(Debug, Clone, Default)]
pub struct SearchPlan {
    /// Entries of `PATH`; only `python`/`python3` are taken from these.
    pub path_dirs: Vec<PathBuf>,
    /// Directories scanned for any python-named executable.
    pub system_dirs: Vec<PathBuf>,
    /// Roots walked for virtual environments.
    pub venv_roots: Vec<VenvRoot>,
    /// Conda and pyenv roots, also used for classification.
    pub known: KnownRoots,
}

impl SearchPlan {
    /// Build the plan for this machine from the real environment.
    pub fn for_host(options: &LocatorOptions) -> Self {
        Self::for_host_with_env(options, std::env::current_dir().ok(), |key: &str| {
            std::env::var(key)
        })
    }

    /// Build the plan with a custom env var lookup function.
    ///
    /// This allows testing without modifying actual environment variables.
    pub fn for_host_with_env<F>(options: &LocatorOptions, cwd: Option<PathBuf>, env_fn: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let home_var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
        let home = env_fn(home_var)
            .ok()
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir);

        let path_dirs = env_fn("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();

        let mut plan = Self {
            path_dirs,
            ..Default::default()
        };

        if let Ok(root) = env_fn("PYENV_ROOT") {
            plan.known.pyenv_roots.push(PathBuf::from(root));
        }
        if let Ok(prefix) = env_fn("CONDA_PREFIX") {
            if !prefix.is_empty() {
                plan.known.active_conda = Some(PathBuf::from(prefix));
            }
        }

        if cfg!(windows) {
            plan.add_windows_locations(home.as_deref(), &env_fn);
        } else {
            plan.system_dirs.extend(
                ["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"]
                    .iter()
                    .map(PathBuf::from),
            );
        }

        if let Some(home) = &home {
            if !cfg!(windows) {
                plan.system_dirs.push(home.join(".local/bin"));
                plan.known.pyenv_roots.push(home.join(".pyenv"));
            }
            for name in ["anaconda3", "miniconda3", "miniforge3", "mambaforge", ".conda"] {
                plan.known.conda_roots.push(home.join(name));
            }
        }

        if let Some(cwd) = &cwd {
            plan.add_venv_root(cwd.clone(), options.max_depth);
            for parent in cwd.ancestors().skip(1).take(3) {
                plan.add_venv_root(parent.to_path_buf(), 0);
            }
        }
        if let Some(home) = &home {
            plan.add_venv_root(home.clone(), options.max_depth);
            for sub in ["Projects", "Code", "Documents", "Desktop"] {
                plan.add_venv_root(home.join(sub), options.max_depth);
            }
        }
        for root in &options.extra_roots {
            plan.add_venv_root(root.clone(), options.max_depth);
        }

        plan
    }

    fn add_venv_root(&mut self, path: PathBuf, max_depth: usize) {
        if let Some(existing) = self.venv_roots.iter_mut().find(|r| r.path == path) {
            existing.max_depth = existing.max_depth.max(max_depth);
        } else {
            self.venv_roots.push(VenvRoot { path, max_depth });
        }
    }

    fn add_windows_locations<F>(&mut self, home: Option<&Path>, env_fn: &F)
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let var_dir = |key: &str| env_fn(key).ok().map(PathBuf::from);

        let mut install_parents = Vec::new();
        if let Some(local) = var_dir("LOCALAPPDATA") {
            install_parents.push(local.join("Programs").join("Python"));
            self.known
                .conda_roots
                .push(local.join("Continuum").join("anaconda3"));
        }
        for key in ["ProgramFiles", "ProgramFiles(x86)"] {
            if let Some(dir) = var_dir(key) {
                install_parents.push(dir);
            }
        }
        if let Some(drive) = var_dir("SystemDrive") {
            install_parents.push(drive.join("\\"));
        }

        for parent in install_parents {
            self.system_dirs
                .extend(children_with_prefix(&parent, "Python"));
        }

        if let Some(home) = home {
            self.known
                .pyenv_roots
                .push(home.join(".pyenv").join("pyenv-win"));
            self.known.conda_roots.push(home.join("Anaconda3"));
            self.known.conda_roots.push(home.join("Miniconda3"));
        }
    }
}

fn children_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(prefix))
                .unwrap_or(false)
        })
        .collect();
    dirs.sort();
    dirs
}

/// A location that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a discovery run.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Deduplicated environments in display order.
    pub environments: Vec<Environment>,
    /// Locations that were skipped because they couldn't be read.
    pub issues: Vec<ScanIssue>,
}

#[derive(Default)]
struct Scan {
    candidates: Vec<PathBuf>,
    issues: Vec<ScanIssue>,
}

impl Scan {
    fn push(&mut self, interpreter: PathBuf) {
        tracing::trace!("Candidate interpreter: {}", interpreter.display());
        self.candidates.push(interpreter);
    }

    /// List a directory's entries in sorted order, recording failures.
    fn list_dir(&mut self, dir: &Path) -> Vec<PathBuf> {
        match fs::read_dir(dir) {
            Ok(entries) => {
                let mut paths: Vec<PathBuf> =
                    entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
                paths.sort();
                paths
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::debug!("Skipping {}: {}", dir.display(), e);
                self.issues.push(ScanIssue {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                });
                Vec::new()
            }
        }
    }
}

/// Discovers Python environments according to a [`SearchPlan`].
#[derive(Debug, Clone)]
pub struct EnvironmentLocator {
    plan: SearchPlan,
    probe_timeout: Option<Duration>,
}

impl EnvironmentLocator {
    /// Create a locator for a plan.
    pub fn new(plan: SearchPlan, options: &LocatorOptions) -> Self {
        Self {
            plan,
            probe_timeout: options.probe_versions.then_some(options.probe_timeout),
        }
    }

    /// The plan this locator walks.
    pub fn plan(&self) -> &SearchPlan {
        &self.plan
    }

    /// Roots used for classifying interpreters.
    pub fn known_roots(&self) -> &KnownRoots {
        &self.plan.known
    }

    /// Scan every planned location.
    pub fn discover(&self) -> Discovery {
        let mut scan = Scan::default();

        self.scan_path_dirs(&mut scan);
        self.scan_system_dirs(&mut scan);
        self.scan_pyenv(&mut scan);
        self.scan_conda(&mut scan);
        for root in &self.plan.venv_roots {
            scan_venv_root(&mut scan, root);
        }

        let mut environments = self.dedupe(scan.candidates);

        if let Some(timeout) = self.probe_timeout {
            let versions: Vec<Option<String>> = thread::scope(|s| {
                let handles: Vec<_> = environments
                    .iter()
                    .map(|env| s.spawn(move || probe_version(&env.interpreter, timeout)))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or(None))
                    .collect()
            });
            environments = environments
                .into_iter()
                .zip(versions)
                .map(|(env, version)| env.with_version(version))
                .collect();
        }

        environments.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| a.label.cmp(&b.label))
                .then_with(|| a.interpreter.cmp(&b.interpreter))
        });

        tracing::info!(
            "Discovered {} environments ({} locations skipped)",
            environments.len(),
            scan.issues.len()
        );

        Discovery {
            environments,
            issues: scan.issues,
        }
    }

    fn scan_path_dirs(&self, scan: &mut Scan) {
        let names: &[&str] = if cfg!(windows) {
            &["python.exe"]
        } else {
            &["python3", "python"]
        };
        for dir in &self.plan.path_dirs {
            let skip = dir
                .components()
                .any(|c| matches!(c.as_os_str().to_str(), Some("shims" | "WindowsApps")));
            if skip {
                continue;
            }
            for name in names {
                let candidate = dir.join(name);
                if candidate.is_file() && is_executable(&candidate) {
                    scan.push(candidate);
                }
            }
        }
    }

    fn scan_system_dirs(&self, scan: &mut Scan) {
        for dir in &self.plan.system_dirs {
            for path in scan.list_dir(dir) {
                let named = path
                    .file_name()
                    .map(|n| is_python_executable_name(&n.to_string_lossy()))
                    .unwrap_or(false);
                if named && path.is_file() && is_executable(&path) {
                    scan.push(path);
                }
            }
        }
    }

    fn scan_pyenv(&self, scan: &mut Scan) {
        for root in &self.plan.known.pyenv_roots {
            for version_dir in scan.list_dir(&root.join("versions")) {
                if let Some(python) = interpreter_in_prefix(&version_dir) {
                    scan.push(python);
                }
            }
        }
    }

    fn scan_conda(&self, scan: &mut Scan) {
        let mut prefixes = Vec::new();
        for root in &self.plan.known.conda_roots {
            if root.join("conda-meta").is_dir() {
                prefixes.push(root.clone());
            }
            prefixes.extend(scan.list_dir(&root.join("envs")));
        }
        if let Some(active) = &self.plan.known.active_conda {
            prefixes.push(active.clone());
        }
        for prefix in prefixes {
            if !prefix.join("conda-meta").is_dir() {
                continue;
            }
            if let Some(python) = interpreter_in_prefix(&prefix) {
                scan.push(python);
            }
        }
    }

    /// Collapse candidates that share a prefix and resolve to the same
    /// binary. A venv whose `python` links to the system interpreter keeps
    /// its own prefix, so it stays a separate environment.
    fn dedupe(&self, candidates: Vec<PathBuf>) -> Vec<Environment> {
        let mut seen = HashSet::new();
        let mut environments = Vec::new();
        for interpreter in candidates {
            // Resolve the directory, not the file: `/bin -> usr/bin` must
            // land on `/usr`, while a venv's `bin/python` link keeps the venv.
            let located = match (interpreter.parent(), interpreter.file_name()) {
                (Some(dir), Some(name)) => dir
                    .canonicalize()
                    .map(|dir| dir.join(name))
                    .unwrap_or_else(|_| interpreter.clone()),
                _ => interpreter.clone(),
            };
            let key = (
                prefix_of(&located),
                interpreter
                    .canonicalize()
                    .unwrap_or_else(|_| interpreter.clone()),
            );
            if seen.insert(key) {
                environments.push(Environment::from_interpreter(&interpreter, &self.plan.known));
            }
        }
        environments
    }
}

fn has_site_packages(dir: &Path) -> bool {
    if dir.join("Lib").join("site-packages").is_dir() {
        return true;
    }
    let Ok(entries) = fs::read_dir(dir.join("lib")) else {
        return false;
    };
    entries.filter_map(|e| e.ok()).any(|e| {
        e.file_name().to_string_lossy().starts_with("python")
            && e.path().join("site-packages").is_dir()
    })
}

fn venv_interpreter(dir: &Path) -> Option<PathBuf> {
    let python = interpreter_in_prefix(dir)?;
    if dir.join("pyvenv.cfg").is_file() || has_site_packages(dir) {
        Some(python)
    } else {
        None
    }
}

fn scan_venv_root(scan: &mut Scan, root: &VenvRoot) {
    if !root.path.is_dir() {
        return;
    }
    let canonical_root = root
        .path
        .canonicalize()
        .unwrap_or_else(|_| root.path.clone());
    walk_venvs(scan, &canonical_root, &root.path, 0, root.max_depth);
}

fn walk_venvs(scan: &mut Scan, canonical_root: &Path, dir: &Path, depth: usize, max_depth: usize) {
    if dir.as_os_str().len() > MAX_PATH_LEN {
        return;
    }
    if let Some(python) = venv_interpreter(dir) {
        scan.push(python);
        return;
    }
    for name in VENV_DIR_NAMES {
        if let Some(python) = venv_interpreter(&dir.join(name)) {
            scan.push(python);
        }
    }
    if depth >= max_depth {
        return;
    }

    for child in scan.list_dir(dir) {
        let Some(name) = child.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        if name.starts_with('.') || IGNORED_DIRS.contains(&name.as_str()) {
            continue;
        }
        let Ok(meta) = child.symlink_metadata() else {
            continue;
        };
        if meta.file_type().is_symlink() {
            match child.canonicalize() {
                Ok(target) if target.starts_with(canonical_root) && target.is_dir() => {}
                _ => continue,
            }
        } else if !meta.is_dir() {
            continue;
        }
        walk_venvs(scan, canonical_root, &child, depth + 1, max_depth);
    }
}
