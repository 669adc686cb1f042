//! Repository materialization and metadata.
//!
//! A [`Repo`] turns a URL-or-path into a local, inspectable working copy plus
//! its remote and branch metadata. Remote clones are cached under a base
//! directory and reused across runs via a sentinel file; local directories
//! are adopted in place without cloning.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::getter::{GitGetter, SourceGetter};
use crate::{Error, Result};

/// Marker file recording that a prior clone into a directory completed.
///
/// Written as the very last step of a successful fetch, so a destination that
/// exists without it is a broken prior attempt and gets removed before the
/// next fetch.
pub const CLONE_COMPLETE_SENTINEL: &str = ".catalog-clone-complete";

/// Default repository sub-paths searched for modules.
const DEFAULT_MODULE_PATHS: &[&str] = &["modules"];

/// Default source file extensions that qualify a directory as a module.
const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["tf"];

/// Options controlling repository materialization and module discovery.
#[derive(Clone, Default)]
pub struct RepoOptions {
    /// Follow symbolic links during the module walk.
    pub walk_symlinks: bool,
    /// Attempt the minimal content-addressed fetch before a full clone.
    pub allow_minimal_clone: bool,
    /// Repository sub-paths to search for modules instead of the default
    /// (`["modules"]`).
    pub module_paths: Option<Vec<String>>,
    /// Source file extensions instead of the default (`["tf"]`).
    pub source_extensions: Option<Vec<String>>,
    /// Source getter override; tests use this to avoid invoking `git`.
    pub getter: Option<Arc<dyn SourceGetter>>,
}

/// A materialized, inspectable local copy of a module repository.
#[derive(Debug)]
pub struct Repo {
    clone_url: String,
    path: PathBuf,
    remote_url: Option<String>,
    branch_name: String,
    pub(crate) walk_symlinks: bool,
    pub(crate) module_paths: Vec<String>,
    pub(crate) source_extensions: Vec<String>,
}

impl Repo {
    /// Materialize the repository at `clone_url` under `base_path` and read
    /// its metadata.
    ///
    /// An empty `clone_url` resolves to the current working directory. Local
    /// directories are adopted in place; anything else is fetched through the
    /// source getter with idempotent reuse across runs (see
    /// [`CLONE_COMPLETE_SENTINEL`]).
    pub async fn init(clone_url: &str, base_path: &Path, options: RepoOptions) -> Result<Self> {
        let source = if clone_url.is_empty() {
            env::current_dir()?.to_string_lossy().into_owned()
        } else {
            clone_url.to_string()
        };

        let path = materialize(&source, base_path, &options).await?;
        let remote_url = parse_remote_url(&path)?;
        let branch_name = parse_branch_name(&path)?;
        debug!(path = %path.display(), branch = %branch_name, "initialized repository");

        Ok(Self {
            clone_url: source,
            path,
            remote_url,
            branch_name,
            walk_symlinks: options.walk_symlinks,
            module_paths: options.module_paths.unwrap_or_else(|| {
                DEFAULT_MODULE_PATHS.iter().map(ToString::to_string).collect()
            }),
            source_extensions: options.source_extensions.unwrap_or_else(|| {
                DEFAULT_SOURCE_EXTENSIONS
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            }),
        })
    }

    /// The URL or path this repository was created from.
    #[must_use]
    pub fn clone_url(&self) -> &str {
        &self.clone_url
    }

    /// Absolute path of the local working copy.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URL of the first remote (`origin` preferred), if the repository has
    /// one.
    #[must_use]
    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref()
    }

    /// Current branch name, taken from `.git/HEAD`.
    #[must_use]
    pub fn branch_name(&self) -> &str {
        &self.branch_name
    }

    /// Canonical web URL rendering `module_dir` on the repository's hosting
    /// provider.
    ///
    /// Repositories without a remote resolve to the local filesystem path.
    /// Returns `None` when the hosting provider is unrecognized.
    #[must_use]
    pub fn module_url(&self, module_dir: &str) -> Option<String> {
        static GITHUB_HOST: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^github\..+").expect("valid host regex"));
        static GITLAB_HOST: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^gitlab\..+").expect("valid host regex"));

        let Some(remote) = &self.remote_url else {
            return Some(self.path.join(module_dir).to_string_lossy().into_owned());
        };
        let (host, owner_repo) = split_remote(remote)?;
        let branch = &self.branch_name;

        let github =
            |host: &str| format!("https://{host}/{owner_repo}/tree/{branch}/{module_dir}");
        let gitlab =
            |host: &str| format!("https://{host}/{owner_repo}/-/tree/{branch}/{module_dir}");

        let url = match host.as_str() {
            "github.com" => github(&host),
            "gitlab.com" => gitlab(&host),
            "bitbucket.org" => {
                format!("https://{host}/{owner_repo}/browse/{module_dir}?at={branch}")
            },
            "dev.azure.com" => {
                format!("https://{host}/_git/{owner_repo}?path={module_dir}&version=GB{branch}")
            },
            _ if GITHUB_HOST.is_match(&host) => github(&host),
            _ if GITLAB_HOST.is_match(&host) => gitlab(&host),
            _ => return None,
        };
        Some(url)
    }
}

async fn materialize(source: &str, base_path: &Path, options: &RepoOptions) -> Result<PathBuf> {
    let as_path = Path::new(source);
    if as_path.is_dir() {
        return Ok(fs::canonicalize(as_path)?);
    }

    fs::create_dir_all(base_path)?;
    let path = base_path.join(repo_name_from_url(source));
    let sentinel = path.join(CLONE_COMPLETE_SENTINEL);

    if path.exists() && !sentinel.exists() {
        warn!(path = %path.display(), "removing incomplete prior clone");
        fs::remove_dir_all(&path)?;
    }

    if path.exists() {
        debug!(path = %path.display(), "reusing previously cloned repository");
    } else {
        let src = with_default_ref(source);
        fetch_into(&src, &path, options).await?;
        fs::write(&sentinel, b"")?;
    }
    Ok(path)
}

async fn fetch_into(src: &str, dst: &Path, options: &RepoOptions) -> Result<()> {
    if let Some(getter) = &options.getter {
        return getter.get(src, dst).await;
    }
    if options.allow_minimal_clone {
        match GitGetter::minimal().get(src, dst).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(error = %err, "minimal fetch failed, falling back to a full clone");
                if dst.exists() {
                    fs::remove_dir_all(dst)?;
                }
            },
        }
    }
    GitGetter::full().get(src, dst).await
}

/// Derive a repository directory name from the last path segment of `source`,
/// stripping a `.git` suffix. Falls back to `temp`.
fn repo_name_from_url(source: &str) -> String {
    let base = source.split(['?', '#']).next().unwrap_or(source);
    let base = base.trim_end_matches('/');
    let segment = base.rsplit(['/', ':']).next().unwrap_or("");
    let name = segment.strip_suffix(".git").unwrap_or(segment);
    if name.is_empty() {
        "temp".to_string()
    } else {
        name.to_string()
    }
}

/// Attach `ref=HEAD` to `source` unless it already carries a `ref` query
/// parameter.
fn with_default_ref(source: &str) -> String {
    if let Ok(parsed) = Url::parse(source) {
        if parsed.query_pairs().any(|(key, _)| key == "ref") {
            return source.to_string();
        }
        let mut parsed = parsed;
        parsed.query_pairs_mut().append_pair("ref", "HEAD");
        return parsed.to_string();
    }
    if source.contains("ref=") {
        source.to_string()
    } else {
        format!("{source}?ref=HEAD")
    }
}

/// Read the remote URL from `.git/config`.
///
/// Sections are scanned in file order; the first whose name starts with
/// `remote` is chosen, except that a section named exactly `remote "origin"`
/// always wins. A missing `url` key (or no remote section at all) is
/// non-fatal and leaves the remote unset.
fn parse_remote_url(path: &Path) -> Result<Option<String>> {
    static SECTION: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\s*\[\s*([^\]]+?)\s*\]\s*$").expect("valid section regex"));
    static URL_KEY: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\s*url\s*=\s*(.+?)\s*$").expect("valid url-key regex"));

    let config_path = path.join(".git").join("config");
    let content = read_repo_file(&config_path, path)?;

    let mut sections: Vec<(String, Option<String>)> = Vec::new();
    for line in content.lines() {
        if let Some(caps) = SECTION.captures(line) {
            sections.push((caps[1].to_string(), None));
        } else if let Some(caps) = URL_KEY.captures(line) {
            if let Some(current) = sections.last_mut() {
                if current.1.is_none() {
                    current.1 = Some(caps[1].to_string());
                }
            }
        }
    }

    let remotes: Vec<&(String, Option<String>)> = sections
        .iter()
        .filter(|(name, _)| name.starts_with("remote"))
        .collect();
    let chosen = remotes
        .iter()
        .find(|(name, _)| name == "remote \"origin\"")
        .or_else(|| remotes.first());
    Ok(chosen.and_then(|(_, url)| url.clone()))
}

/// Read the branch name from `.git/HEAD`: the trailing non-slash segment.
fn parse_branch_name(path: &Path) -> Result<String> {
    static BRANCH: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^.*?([^/]+)$").expect("valid branch regex"));

    let head_path = path.join(".git").join("HEAD");
    let content = read_repo_file(&head_path, path)?;
    Ok(BRANCH
        .captures(content.trim())
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default())
}

fn read_repo_file(file: &Path, repo_path: &Path) -> Result<String> {
    fs::read_to_string(file).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotARepository {
                path: repo_path.to_path_buf(),
            }
        } else {
            Error::Io(err)
        }
    })
}

/// Split a remote URL into `(host, owner/repo)`, tolerating https, ssh, git,
/// and scp-like syntaxes.
fn split_remote(remote: &str) -> Option<(String, String)> {
    let mut rest = remote.trim();
    for prefix in ["https://", "http://", "ssh://", "git://"] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    if let Some((_, after)) = rest.split_once('@') {
        rest = after;
    }
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    // scp-like "host:owner/repo" becomes "host/owner/repo"
    let normalized = match (rest.find(':'), rest.find('/')) {
        (Some(colon), Some(slash)) if colon < slash => rest.replacen(':', "/", 1),
        (Some(_), None) => rest.replacen(':', "/", 1),
        _ => rest.to_string(),
    };

    let (host, owner_repo) = normalized.split_once('/')?;
    if host.is_empty() || owner_repo.is_empty() {
        return None;
    }
    Some((host.to_string(), owner_repo.to_string()))
}

#[cfg(test)]
impl Repo {
    /// Build a repository handle directly from parts, skipping
    /// materialization. Test-only.
    pub(crate) fn fixture(
        path: PathBuf,
        remote_url: Option<String>,
        branch_name: &str,
        walk_symlinks: bool,
    ) -> Self {
        Self {
            clone_url: String::new(),
            path,
            remote_url,
            branch_name: branch_name.to_string(),
            walk_symlinks,
            module_paths: DEFAULT_MODULE_PATHS.iter().map(ToString::to_string).collect(),
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[test]
    fn repo_names_derive_from_the_last_url_segment() {
        assert_eq!(
            repo_name_from_url("https://github.com/acme/infra-modules.git"),
            "infra-modules"
        );
        assert_eq!(
            repo_name_from_url("git@gitlab.com:team/widgets.git?ref=v2"),
            "widgets"
        );
        assert_eq!(repo_name_from_url("https://example.com/"), "temp");
    }

    #[test]
    fn default_ref_is_attached_once() {
        assert_eq!(
            with_default_ref("https://github.com/acme/mods.git"),
            "https://github.com/acme/mods.git?ref=HEAD"
        );
        assert_eq!(
            with_default_ref("https://github.com/acme/mods.git?ref=v1"),
            "https://github.com/acme/mods.git?ref=v1"
        );
        assert_eq!(
            with_default_ref("git@github.com:acme/mods.git"),
            "git@github.com:acme/mods.git?ref=HEAD"
        );
    }

    #[test]
    fn remote_urls_split_into_host_and_owner_repo() {
        assert_eq!(
            split_remote("https://github.com/acme/widgets.git"),
            Some(("github.com".to_string(), "acme/widgets".to_string()))
        );
        assert_eq!(
            split_remote("git@github.com:acme/widgets.git"),
            Some(("github.com".to_string(), "acme/widgets".to_string()))
        );
        assert_eq!(
            split_remote("ssh://git@gitlab.example.io/team/infra"),
            Some(("gitlab.example.io".to_string(), "team/infra".to_string()))
        );
        assert_eq!(split_remote("not-a-remote"), None);
    }

    fn fixture_with_remote(remote: &str) -> Repo {
        Repo::fixture(
            PathBuf::from("/tmp/repo"),
            Some(remote.to_string()),
            "main",
            false,
        )
    }

    #[test]
    fn module_urls_follow_the_hosting_table() {
        let cases = [
            (
                "https://github.com/acme/widgets.git",
                "https://github.com/acme/widgets/tree/main/modules/vpc",
            ),
            (
                "https://gitlab.com/acme/widgets.git",
                "https://gitlab.com/acme/widgets/-/tree/main/modules/vpc",
            ),
            (
                "https://bitbucket.org/acme/widgets.git",
                "https://bitbucket.org/acme/widgets/browse/modules/vpc?at=main",
            ),
            (
                "https://dev.azure.com/acme/widgets.git",
                "https://dev.azure.com/_git/acme/widgets?path=modules/vpc&version=GBmain",
            ),
            (
                "https://github.example.io/acme/widgets.git",
                "https://github.example.io/acme/widgets/tree/main/modules/vpc",
            ),
            (
                "https://gitlab.internal.net/acme/widgets.git",
                "https://gitlab.internal.net/acme/widgets/-/tree/main/modules/vpc",
            ),
        ];
        for (remote, expected) in cases {
            let repo = fixture_with_remote(remote);
            assert_eq!(repo.module_url("modules/vpc").as_deref(), Some(expected));
        }
    }

    #[test]
    fn unrecognized_hosting_yields_no_url() {
        let repo = fixture_with_remote("https://code.example.org/acme/widgets.git");
        assert_eq!(repo.module_url("modules/vpc"), None);
    }

    #[test]
    fn local_repositories_resolve_to_filesystem_paths() {
        let repo = Repo::fixture(PathBuf::from("/tmp/repo"), None, "main", false);
        let url = repo.module_url("modules/vpc").unwrap();
        assert!(url.ends_with("modules/vpc"));
        assert!(url.starts_with("/tmp/repo"));
    }

    fn write_git_fixture(repo: &Path, config: &str, head: &str) {
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::write(repo.join(".git").join("config"), config).unwrap();
        fs::write(repo.join(".git").join("HEAD"), head).unwrap();
    }

    #[test]
    fn origin_wins_over_earlier_remotes() {
        let dir = tempfile::tempdir().unwrap();
        write_git_fixture(
            dir.path(),
            "[remote \"upstream\"]\n\turl = https://example.com/upstream.git\n[remote \"origin\"]\n\turl = https://example.com/origin.git\n",
            "ref: refs/heads/main\n",
        );

        let remote = parse_remote_url(dir.path()).unwrap();
        assert_eq!(remote.as_deref(), Some("https://example.com/origin.git"));
    }

    #[test]
    fn first_remote_wins_without_origin() {
        let dir = tempfile::tempdir().unwrap();
        write_git_fixture(
            dir.path(),
            "[core]\n\tbare = false\n[remote \"mirror\"]\n\turl = https://example.com/mirror.git\n[remote \"backup\"]\n\turl = https://example.com/backup.git\n",
            "ref: refs/heads/main\n",
        );

        let remote = parse_remote_url(dir.path()).unwrap();
        assert_eq!(remote.as_deref(), Some("https://example.com/mirror.git"));
    }

    #[test]
    fn missing_remote_section_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_git_fixture(dir.path(), "[core]\n\tbare = false\n", "ref: refs/heads/main\n");

        assert_eq!(parse_remote_url(dir.path()).unwrap(), None);
    }

    #[test]
    fn missing_git_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_remote_url(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotARepository { .. }));
    }

    #[test]
    fn branch_name_is_the_trailing_head_segment() {
        let dir = tempfile::tempdir().unwrap();
        write_git_fixture(
            dir.path(),
            "[core]\n",
            "ref: refs/heads/feature/nested-branch\n",
        );
        assert_eq!(parse_branch_name(dir.path()).unwrap(), "nested-branch");
    }

    #[test]
    fn detached_head_falls_back_to_the_commit_hash() {
        let dir = tempfile::tempdir().unwrap();
        write_git_fixture(
            dir.path(),
            "[core]\n",
            "8c8ad5a370b8e5f3c2d91e07a4f6b21c9d3e0f47\n",
        );
        assert_eq!(
            parse_branch_name(dir.path()).unwrap(),
            "8c8ad5a370b8e5f3c2d91e07a4f6b21c9d3e0f47"
        );
    }

    struct FakeGetter {
        calls: AtomicUsize,
    }

    impl FakeGetter {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceGetter for FakeGetter {
        async fn get(&self, _src: &str, dst: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::create_dir_all(dst.join(".git"))?;
            fs::write(
                dst.join(".git").join("config"),
                "[remote \"origin\"]\n\turl = https://github.com/acme/widgets.git\n",
            )?;
            fs::write(dst.join(".git").join("HEAD"), "ref: refs/heads/main\n")?;
            fs::write(dst.join("main.tf"), "# module\n")?;
            Ok(())
        }
    }

    fn remote_options(getter: &Arc<FakeGetter>) -> RepoOptions {
        RepoOptions {
            getter: Some(Arc::clone(getter) as Arc<dyn SourceGetter>),
            ..RepoOptions::default()
        }
    }

    #[tokio::test]
    async fn clone_writes_the_sentinel_and_is_reused() {
        let base = tempfile::tempdir().unwrap();
        let getter = Arc::new(FakeGetter::new());
        let url = "https://github.com/acme/widgets.git";

        let repo = Repo::init(url, base.path(), remote_options(&getter))
            .await
            .unwrap();
        assert_eq!(getter.calls.load(Ordering::SeqCst), 1);
        assert!(repo.path().join(CLONE_COMPLETE_SENTINEL).exists());
        assert_eq!(repo.branch_name(), "main");

        // Second run reuses the clone without touching the getter.
        let repo = Repo::init(url, base.path(), remote_options(&getter))
            .await
            .unwrap();
        assert_eq!(getter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            repo.remote_url(),
            Some("https://github.com/acme/widgets.git")
        );
    }

    #[tokio::test]
    async fn broken_prior_clone_is_removed_and_refetched() {
        let base = tempfile::tempdir().unwrap();
        let getter = Arc::new(FakeGetter::new());
        let url = "https://github.com/acme/widgets.git";

        // A destination without the sentinel counts as broken.
        let stale = base.path().join("widgets");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("leftover.txt"), "partial clone").unwrap();

        let repo = Repo::init(url, base.path(), remote_options(&getter))
            .await
            .unwrap();
        assert_eq!(getter.calls.load(Ordering::SeqCst), 1);
        assert!(!repo.path().join("leftover.txt").exists());
        assert!(repo.path().join(CLONE_COMPLETE_SENTINEL).exists());
    }

    #[tokio::test]
    async fn local_directories_are_adopted_without_cloning() {
        let dir = tempfile::tempdir().unwrap();
        write_git_fixture(dir.path(), "[core]\n", "ref: refs/heads/trunk\n");
        let getter = Arc::new(FakeGetter::new());

        let repo = Repo::init(
            dir.path().to_string_lossy().as_ref(),
            Path::new("/nonexistent-base"),
            remote_options(&getter),
        )
        .await
        .unwrap();

        assert_eq!(getter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(repo.branch_name(), "trunk");
        assert!(!repo.path().join(CLONE_COMPLETE_SENTINEL).exists());
    }
}
