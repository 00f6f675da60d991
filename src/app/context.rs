//! Per-invocation setup shared by the CLI commands.

use std::path::{Path, PathBuf};

use crate::cache::{default_cache_dir, StatusCache};
use crate::config::{self, PyscopeConfig};
use crate::environment::{
    default_interpreter, probe_version, select_environment, Discovery, Environment,
    EnvironmentLocator, SearchPlan,
};
use crate::error::{PyscopeError, Result};
use crate::ui::{Prompt, PromptOption, PromptType, UserInterface};

use super::Controller;

/// Loaded configuration plus the process-level switches.
pub struct AppContext {
    pub config: PyscopeConfig,
    pub cwd: PathBuf,
    pub use_cache: bool,
}

impl AppContext {
    /// Load and validate configuration for `cwd`.
    pub fn load(cwd: &Path, explicit_config: Option<&Path>, use_cache: bool) -> Result<Self> {
        let config = config::load_config(cwd, explicit_config)?;
        config::validate(&config)?;
        Ok(Self::new(config, cwd.to_path_buf(), use_cache))
    }

    pub fn new(config: PyscopeConfig, cwd: PathBuf, use_cache: bool) -> Self {
        Self {
            config,
            cwd,
            use_cache,
        }
    }

    /// The status cache, unless disabled by flag or config.
    pub fn cache(&self) -> Option<StatusCache> {
        if !self.use_cache || !self.config.cache.enabled {
            return None;
        }
        let dir = self
            .config
            .cache
            .dir
            .clone()
            .unwrap_or_else(default_cache_dir);
        Some(StatusCache::new(dir, self.config.cache.ttl_secs))
    }

    /// Cache location even when caching is turned off, for `cache` commands.
    pub fn cache_store(&self) -> StatusCache {
        let dir = self
            .config
            .cache
            .dir
            .clone()
            .unwrap_or_else(default_cache_dir);
        StatusCache::new(dir, self.config.cache.ttl_secs)
    }

    pub fn locator(&self) -> EnvironmentLocator {
        let options = self.config.locator_options();
        let plan = SearchPlan::for_host_with_env(&options, Some(self.cwd.clone()), |key: &str| {
            std::env::var(key)
        });
        EnvironmentLocator::new(plan, &options)
    }

    /// Scan the machine for environments.
    pub fn discover(&self) -> Discovery {
        let discovery = self.locator().discover();
        for issue in &discovery.issues {
            tracing::debug!("Skipped {}: {}", issue.path.display(), issue.message);
        }
        discovery
    }

    /// Turn an optional `--env` selector into one environment.
    ///
    /// Without a selector the activated or first-on-`PATH` interpreter is
    /// used, falling back to the first discovered environment. An ambiguous
    /// label is offered as a choice when the UI is interactive.
    pub fn resolve_environment(
        &self,
        selector: Option<&str>,
        ui: &mut dyn UserInterface,
    ) -> Result<Environment> {
        let locator = self.locator();

        let env = match selector {
            Some(selector) if Path::new(selector.trim()).exists() => {
                select_environment(&[], selector, locator.known_roots())?
            }
            Some(selector) => {
                let discovery = locator.discover();
                match select_environment(&discovery.environments, selector, locator.known_roots())
                {
                    Err(PyscopeError::AmbiguousEnvironment { .. }) if ui.is_interactive() => {
                        choose(&discovery.environments, selector, ui)?
                    }
                    other => other?,
                }
            }
            None => match default_interpreter(|key: &str| std::env::var(key)) {
                Some(python) => Environment::from_interpreter(&python, locator.known_roots()),
                None => locator
                    .discover()
                    .environments
                    .into_iter()
                    .next()
                    .ok_or_else(|| PyscopeError::EnvironmentNotFound {
                        selector: "default".to_string(),
                    })?,
            },
        };

        if env.version.is_none() && self.config.discovery.probe_versions {
            let timeout = self.config.locator_options().probe_timeout;
            let version = probe_version(&env.interpreter, timeout);
            return Ok(env.with_version(version));
        }
        Ok(env)
    }

    /// Controller wired to this configuration.
    pub fn controller(&self) -> Result<Controller> {
        Controller::new(&self.config, self.cache())
    }
}

fn choose(
    environments: &[Environment],
    selector: &str,
    ui: &mut dyn UserInterface,
) -> Result<Environment> {
    let needle = selector.trim().to_lowercase();
    let matches: Vec<&Environment> = environments
        .iter()
        .filter(|e| e.label.to_lowercase().contains(&needle))
        .collect();
    let prompt = Prompt {
        key: "environment".to_string(),
        question: format!("Several environments match '{}'. Which one?", selector.trim()),
        prompt_type: PromptType::Select {
            options: matches
                .iter()
                .map(|e| PromptOption {
                    label: format!("{} ({})", e.label, e.interpreter.display()),
                    value: e.id(),
                })
                .collect(),
        },
        default: None,
    };
    let picked = ui.prompt(&prompt)?.as_string();
    matches
        .into_iter()
        .find(|e| e.id() == picked)
        .cloned()
        .ok_or_else(|| PyscopeError::EnvironmentNotFound {
            selector: picked,
        })
}
