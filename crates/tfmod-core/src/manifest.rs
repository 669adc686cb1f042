//! Discovery of module source files via the orchestrator's manifest.
//!
//! The wrapped tool records every fetched module in
//! `<data_dir>/modules/modules.json`. The patch command uses that manifest as
//! its file source instead of walking the whole working directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct ModulesManifest {
    #[serde(rename = "Modules", default)]
    modules: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "Key", default)]
    key: String,
    #[serde(rename = "Source", default)]
    source: String,
    #[serde(rename = "Dir", default)]
    dir: String,
}

/// Collect every `.tf` file of the modules recorded in
/// `<data_dir>/modules/modules.json`.
///
/// A missing manifest yields an empty list without error. Relative module
/// directories are resolved against `working_dir`. The result keeps manifest
/// order, then glob order within each module, without duplicates. Other file
/// types (such as `.tf.json`) are out of scope.
pub fn find_source_files(data_dir: &Path, working_dir: &Path) -> Result<Vec<PathBuf>> {
    let manifest_path = data_dir.join("modules").join("modules.json");
    if !manifest_path.is_file() {
        debug!(path = %manifest_path.display(), "no module manifest found");
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(&manifest_path)?;
    let manifest: ModulesManifest = serde_json::from_str(&raw)
        .map_err(|err| Error::Parse(format!("{}: {err}", manifest_path.display())))?;

    let mut files = Vec::new();
    let mut seen = HashSet::new();
    for entry in &manifest.modules {
        if entry.key.is_empty() || entry.dir.is_empty() {
            continue;
        }
        debug!(key = %entry.key, source = %entry.source, "collecting module source files");

        let dir = if Path::new(&entry.dir).is_absolute() {
            PathBuf::from(&entry.dir)
        } else {
            working_dir.join(&entry.dir)
        };
        let pattern = dir.join("**").join("*.tf");
        let pattern = pattern.to_string_lossy();
        let matches = glob::glob(&pattern)
            .map_err(|err| Error::Parse(format!("invalid glob pattern '{pattern}': {err}")))?;
        for path in matches {
            let path = path.map_err(glob::GlobError::into_error)?;
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }
    Ok(files)
}
