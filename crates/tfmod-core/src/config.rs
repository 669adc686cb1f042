//! Root configuration discovery and the catalog settings block.
//!
//! The catalog reads a single `catalog { urls = [...] }` block from the root
//! configuration file. Experiment toggles are resolved separately from the
//! experiment name set passed on the command line.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// File name of the root configuration, searched for in the working
/// directory and its ancestors.
pub const ROOT_CONFIG_NAME: &str = "tfmod.hcl";

#[derive(Debug, Default, Deserialize)]
struct RootConfig {
    #[serde(default)]
    catalog: Option<CatalogSettings>,
}

/// The `catalog { urls = [...] }` block of the root configuration.
///
/// Unknown attributes inside the block are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSettings {
    /// Local paths or clone URLs of module repositories.
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Locate the root configuration by walking up from `dir`.
pub fn find_root_config(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(ROOT_CONFIG_NAME))
        .find(|candidate| candidate.is_file())
}

/// Read the catalog settings from the root configuration at `path`.
pub fn read_catalog_settings(path: &Path) -> Result<CatalogSettings> {
    let content = fs::read_to_string(path)?;
    let root: RootConfig = hcl::from_str(&content)
        .map_err(|err| Error::Config(format!("{}: {err}", path.display())))?;
    Ok(root.catalog.unwrap_or_default())
}

/// Read the catalog settings for a working directory.
///
/// Returns defaults (an empty URL list) when no root configuration exists
/// anywhere above `working_dir`.
pub fn load_catalog_settings(working_dir: &Path) -> Result<CatalogSettings> {
    match find_root_config(working_dir) {
        Some(path) => read_catalog_settings(&path),
        None => Ok(CatalogSettings::default()),
    }
}

/// Feature toggles resolved from the experiment name set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Experiments {
    /// Follow symbolic links while walking module directories.
    pub walk_symlinks: bool,
    /// Try the minimal content-addressed fetch before a full clone.
    pub content_addressed_clone: bool,
}

impl Experiments {
    /// Resolve a list of experiment names into toggles.
    ///
    /// Recognized names are `symlinks` and `cas`; anything else is a
    /// configuration error.
    pub fn from_names<'a, I>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut experiments = Self::default();
        for name in names {
            match name {
                "symlinks" => experiments.walk_symlinks = true,
                "cas" => experiments.content_addressed_clone = true,
                other => {
                    return Err(Error::Config(format!("unknown experiment '{other}'")));
                },
            }
        }
        Ok(experiments)
    }
}
