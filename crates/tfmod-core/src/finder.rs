//! Module discovery within a materialized repository.
//!
//! A module is a directory containing at least one non-ignored source file
//! with a recognized extension. The repository root is tested first, then
//! every configured sub-path is walked recursively in lexicographic order, so
//! the resulting module list is deterministic for a stable filesystem.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use crate::doc::{self, ModuleDoc};
use crate::repo::Repo;
use crate::{Error, Result};

/// Maximum module description length presented by the catalog, in characters.
const DESCRIPTION_MAX_LENGTH: usize = 200;

/// Fallback description for modules whose README yields nothing.
const NO_DESCRIPTION: &str = "(no description found)";

/// File names that never qualify a directory as a module.
const IGNORED_FILES: &[&str] =
    &["terraform-cloud-enterprise-private-module-registry-placeholder.tf"];

/// A discovered module: the unit the catalog presents.
#[derive(Debug, Clone)]
pub struct Module {
    title: String,
    description: String,
    url: Option<String>,
    module_dir: String,
    repo: Arc<Repo>,
    doc: ModuleDoc,
}

impl Module {
    fn new(repo: &Arc<Repo>, dir: &Path) -> Result<Self> {
        let module_dir = relative_module_dir(repo.path(), dir);
        let doc = doc::find_doc(dir)?;

        let mut title = doc.title().trim().to_string();
        if title.is_empty() {
            title = dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        let mut description = doc.description(DESCRIPTION_MAX_LENGTH);
        if description.is_empty() {
            description = NO_DESCRIPTION.to_string();
        }
        let url = repo.module_url(&module_dir);

        Ok(Self {
            title,
            description,
            url,
            module_dir,
            repo: Arc::clone(repo),
            doc,
        })
    }

    /// Module title, falling back to the base name of the module directory.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Module description, falling back to a placeholder.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Canonical web URL of the module, when the hosting is recognized.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Module directory relative to the repository root, with forward
    /// slashes. Empty for a root module.
    #[must_use]
    pub fn module_dir(&self) -> &str {
        &self.module_dir
    }

    /// The repository this module was discovered in.
    #[must_use]
    pub fn repo(&self) -> &Arc<Repo> {
        &self.repo
    }

    /// The parsed module documentation.
    #[must_use]
    pub fn doc(&self) -> &ModuleDoc {
        &self.doc
    }
}

impl Repo {
    /// Enumerate the valid module directories of this repository, in
    /// deterministic walk order.
    pub fn find_modules(self: Arc<Self>) -> Result<Vec<Module>> {
        let mut modules = Vec::new();

        if is_module_dir(self.path(), &self.source_extensions)? {
            modules.push(Module::new(&self, self.path())?);
        }

        for sub_path in &self.module_paths {
            let dir = self.path().join(sub_path);
            if !dir.is_dir() {
                continue;
            }
            let walker = WalkDir::new(&dir)
                .follow_links(self.walk_symlinks)
                .sort_by_file_name();
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) if err.loop_ancestor().is_some() => {
                        debug!(error = %err, "skipping symlink cycle");
                        continue;
                    },
                    Err(err) => return Err(Error::Io(err.into())),
                };
                if !entry.file_type().is_dir() {
                    continue;
                }
                if is_module_dir(entry.path(), &self.source_extensions)? {
                    modules.push(Module::new(&self, entry.path())?);
                }
            }
        }

        debug!(
            path = %self.path().display(),
            count = modules.len(),
            "module discovery finished"
        );
        Ok(modules)
    }
}

/// A directory qualifies as a module when it directly contains at least one
/// regular, non-ignored file with a recognized extension.
fn is_module_dir(dir: &Path, extensions: &[String]) -> Result<bool> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if IGNORED_FILES.contains(&name.as_str()) {
            continue;
        }
        let matches = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext));
        if matches {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Path from the repository root to `dir`, joined with forward slashes
/// regardless of the host filesystem.
fn relative_module_dir(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    rel.components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
