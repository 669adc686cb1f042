//! Catalog ingest across configured repositories.
//!
//! [`Catalog::load`] materializes every configured repository in order,
//! discovers its modules, and aggregates them. Per-URL failures are recorded
//! and ingest continues, so one unreachable repository does not hide the
//! others; the collected failures surface afterwards as
//! [`Error::PartialIngest`].

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{CatalogSettings, Experiments};
use crate::finder::Module;
use crate::repo::{Repo, RepoOptions};
use crate::utils::{dedup_preserving_order, encode_base64_sha1};
use crate::{Error, Result};

/// Environment variable overriding the clone cache base directory.
///
/// Defaults to the system temp directory.
pub const CACHE_DIR_ENV: &str = "TFMOD_CACHE_DIR";

/// Constructs repository handles. Injectable so tests can build repositories
/// from fixtures instead of cloning.
#[async_trait]
pub trait RepoFactory: Send + Sync {
    /// Materialize the repository at `url` under `base_path`.
    async fn new_repo(&self, url: &str, base_path: &Path, options: RepoOptions) -> Result<Repo>;
}

/// Factory backed by [`Repo::init`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRepoFactory;

#[async_trait]
impl RepoFactory for DefaultRepoFactory {
    async fn new_repo(&self, url: &str, base_path: &Path, options: RepoOptions) -> Result<Repo> {
        Repo::init(url, base_path, options).await
    }
}

/// Scaffolds a working configuration from a catalog module.
///
/// The interactive browser invokes this seam; implementations live outside
/// the core.
#[async_trait]
pub trait Scaffolder: Send + Sync {
    /// Generate scaffolding for `module` into `output_dir`.
    async fn scaffold(&self, module: &Module, output_dir: &Path) -> Result<()>;
}

/// Aggregated module catalog over one or more repositories.
pub struct Catalog {
    repo_url: Option<String>,
    factory: Arc<dyn RepoFactory>,
    repos: Vec<Arc<Repo>>,
    modules: Vec<Module>,
}

impl Catalog {
    /// Creates an empty catalog using the default repository factory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            repo_url: None,
            factory: Arc::new(DefaultRepoFactory),
            repos: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Restrict ingest to a single repository URL, ignoring the configured
    /// list.
    #[must_use]
    pub fn with_repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = Some(url.into());
        self
    }

    /// Replace the repository factory (test seam).
    #[must_use]
    pub fn with_repo_factory(mut self, factory: Arc<dyn RepoFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Discovered modules, in URL order then walk order. Duplicates across
    /// overlapping repositories are kept.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Repositories materialized by the last [`Catalog::load`].
    #[must_use]
    pub fn repos(&self) -> &[Arc<Repo>] {
        &self.repos
    }

    /// Ingest modules from the override URL or the configured list.
    ///
    /// URLs are deduplicated preserving first-seen order; empty entries are
    /// dropped with a warning. Each URL clones into a deterministic cache
    /// directory named after its SHA-1 hash.
    pub async fn load(&mut self, settings: &CatalogSettings, experiments: Experiments) -> Result<()> {
        let urls = match &self.repo_url {
            Some(url) => vec![url.clone()],
            None => settings.urls.clone(),
        };
        let mut urls = dedup_preserving_order(urls);
        urls.retain(|url| {
            if url.trim().is_empty() {
                warn!("ignoring empty catalog URL");
                false
            } else {
                true
            }
        });
        if urls.is_empty() {
            return Err(Error::NoCatalogUrls);
        }

        let base = cache_base_dir();
        let mut errors = Vec::new();
        self.repos.clear();
        self.modules.clear();

        for url in &urls {
            let clone_dir = base.join(format!("catalog-{}", encode_base64_sha1(url)));
            let options = RepoOptions {
                walk_symlinks: experiments.walk_symlinks,
                allow_minimal_clone: experiments.content_addressed_clone,
                ..RepoOptions::default()
            };
            let repo = match self.factory.new_repo(url, &clone_dir, options).await {
                Ok(repo) => Arc::new(repo),
                Err(err) => {
                    warn!(url = %url, error = %err, "failed to materialize catalog repository");
                    errors.push(err);
                    continue;
                },
            };
            match Arc::clone(&repo).find_modules() {
                Ok(mut found) => {
                    debug!(url = %url, count = found.len(), "discovered modules");
                    self.modules.append(&mut found);
                    self.repos.push(repo);
                },
                Err(err) => {
                    warn!(url = %url, error = %err, "failed to discover modules");
                    errors.push(err);
                },
            }
        }

        if !errors.is_empty() {
            return Err(Error::PartialIngest(errors));
        }
        if self.modules.is_empty() {
            return Err(Error::NoModulesFound);
        }
        Ok(())
    }

    /// Delegate scaffolding of `module` to the given collaborator.
    pub async fn scaffold(
        &self,
        scaffolder: &dyn Scaffolder,
        module: &Module,
        output_dir: &Path,
    ) -> Result<()> {
        debug!(module = %module.module_dir(), "scaffolding module");
        scaffolder.scaffold(module, output_dir).await
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_base_dir() -> PathBuf {
    env::var(CACHE_DIR_ENV).map_or_else(|_| env::temp_dir(), PathBuf::from)
}
