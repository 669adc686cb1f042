//! Hidden `aws-provider-patch` command implementation.
//!
//! Rewrites the requested attributes inside `provider "aws"` blocks of every
//! module source file recorded in the orchestrator's manifest. Files are
//! rewritten in place, and only when something actually changed.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};
use tfmod_core::{Error, find_source_files, patch_provider_blocks};

/// Environment variable naming the orchestrator's data directory.
const DATA_DIR_ENV: &str = "TF_DATA_DIR";

/// Default data directory, relative to the working directory.
const DEFAULT_DATA_DIR: &str = ".terraform";

/// Apply attribute overrides to every fetched module source file.
pub fn execute(working_dir: &Path, override_attrs: &[String]) -> Result<()> {
    let overrides = parse_overrides(override_attrs)?;
    if overrides.is_empty() {
        return Err(Error::MissingOverrideAttr.into());
    }

    let data_dir = data_dir(working_dir);
    let files = find_source_files(&data_dir, working_dir)?;
    debug!(count = files.len(), "found module source files");

    let mut patched = 0_usize;
    for path in &files {
        let code = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let (new_code, updated) = patch_provider_blocks(&code, path, &overrides)?;
        if updated {
            fs::write(path, new_code)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "patched provider attributes");
            patched += 1;
        }
    }

    println!("Patched {patched} of {} files", files.len());
    Ok(())
}

/// Parse repeated `KEY=VALUE` arguments into an override map.
fn parse_overrides(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut overrides = HashMap::new();
    for item in raw {
        let Some((key, value)) = item.split_once('=') else {
            bail!("invalid --override-attr '{item}': expected KEY=VALUE");
        };
        overrides.insert(key.trim().to_string(), value.to_string());
    }
    Ok(overrides)
}

/// Resolve the orchestrator data directory: `TF_DATA_DIR` if set (relative
/// values resolve against the working directory), else `.terraform`.
fn data_dir(working_dir: &Path) -> PathBuf {
    let dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let dir = PathBuf::from(dir);
    if dir.is_absolute() {
        dir
    } else {
        working_dir.join(dir)
    }
}
