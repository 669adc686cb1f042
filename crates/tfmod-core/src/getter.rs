//! Delegated acquisition of repository sources.
//!
//! Fetching is delegated to the `git` binary rather than implemented in
//! process; the [`SourceGetter`] trait is the seam that keeps repository
//! materialization testable without network access or an installed `git`.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// Acquires a source into a destination directory.
#[async_trait]
pub trait SourceGetter: Send + Sync {
    /// Fetch `src` into the directory `dst`.
    ///
    /// `src` may carry a `ref` query parameter naming the revision to check
    /// out; `HEAD` means the remote default branch.
    async fn get(&self, src: &str, dst: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    Full,
    Minimal,
}

/// Source getter that shells out to the `git` binary.
///
/// The minimal mode performs a blobless single-branch clone: repository
/// metadata plus only the blobs reachable from the requested ref. It fails
/// for sources that need a full history (for example commit-hash refs), which
/// is why callers fall back to [`GitGetter::full`].
#[derive(Debug, Clone, Copy)]
pub struct GitGetter {
    mode: FetchMode,
}

impl GitGetter {
    /// Getter performing a full clone.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            mode: FetchMode::Full,
        }
    }

    /// Getter performing the minimal content-addressed fetch.
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            mode: FetchMode::Minimal,
        }
    }

    async fn run(mut command: Command, url: &str) -> Result<()> {
        // kill_on_drop ties the child's lifetime to the caller's future, so
        // cancelling a clone does not leave a git process writing into the
        // destination.
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let output = command.output().await?;
        if output.status.success() {
            return Ok(());
        }
        Err(Error::CloneFailed {
            url: url.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[async_trait]
impl SourceGetter for GitGetter {
    async fn get(&self, src: &str, dst: &Path) -> Result<()> {
        let (repo_url, reference) = split_source_ref(src);
        debug!(url = %repo_url, reference = %reference, dst = %dst.display(), "cloning repository");

        let mut clone = Command::new("git");
        clone.arg("clone");
        if self.mode == FetchMode::Minimal {
            clone.args(["--filter=blob:none", "--single-branch"]);
            if reference != "HEAD" {
                clone.args(["--branch", &reference]);
            }
        }
        clone.arg("--").arg(&repo_url).arg(dst);
        Self::run(clone, &repo_url).await?;

        // A full clone checks the requested revision out afterwards so that
        // tags and commit hashes work, not just branch names.
        if self.mode == FetchMode::Full && reference != "HEAD" {
            let mut checkout = Command::new("git");
            checkout.args(["checkout", &reference]).current_dir(dst);
            Self::run(checkout, &repo_url).await?;
        }
        Ok(())
    }
}

/// Split a `?ref=` query off a source URL, defaulting to `HEAD`.
pub(crate) fn split_source_ref(src: &str) -> (String, String) {
    if let Some((base, query)) = src.split_once('?') {
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("ref=") {
                if !value.is_empty() {
                    return (base.to_string(), value.to_string());
                }
            }
        }
        return (base.to_string(), "HEAD".to_string());
    }
    (src.to_string(), "HEAD".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_query_is_split_off() {
        let (url, reference) = split_source_ref("https://github.com/acme/mods.git?ref=v1.2.0");
        assert_eq!(url, "https://github.com/acme/mods.git");
        assert_eq!(reference, "v1.2.0");
    }

    #[test]
    fn missing_ref_defaults_to_head() {
        let (url, reference) = split_source_ref("git@github.com:acme/mods.git");
        assert_eq!(url, "git@github.com:acme/mods.git");
        assert_eq!(reference, "HEAD");
    }

    #[test]
    fn unrelated_query_parameters_keep_the_default_ref() {
        let (url, reference) = split_source_ref("https://example.com/mods.git?depth=1");
        assert_eq!(url, "https://example.com/mods.git");
        assert_eq!(reference, "HEAD");
    }
}
