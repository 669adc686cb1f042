#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

//! End-to-end catalog ingest over local fixture repositories.

use std::fs;
use std::path::Path;

use tfmod_core::{Catalog, CatalogSettings, Experiments, Module, config};

fn write_git_metadata(root: &Path, remote: &str, branch: &str) {
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(
        root.join(".git").join("HEAD"),
        format!("ref: refs/heads/{branch}\n"),
    )
    .unwrap();
    fs::write(
        root.join(".git").join("config"),
        format!("[remote \"origin\"]\n\turl = {remote}\n"),
    )
    .unwrap();
}

fn write_module(root: &Path, name: &str, readme_name: &str, readme: &str) {
    let dir = root.join("modules").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("main.tf"), "# resources\n").unwrap();
    fs::write(dir.join(readme_name), readme).unwrap();
}

#[tokio::test]
async fn ingest_aggregates_modules_across_repositories_in_order() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    write_git_metadata(
        first.path(),
        "https://github.com/acme/network-modules.git",
        "main",
    );
    write_module(
        first.path(),
        "vpc",
        "README.md",
        "# VPC\n\nProvisions a VPC with public and private subnets.\n",
    );

    write_git_metadata(
        second.path(),
        "https://gitlab.com/acme/compute-modules.git",
        "trunk",
    );
    write_module(
        second.path(),
        "cluster",
        "README.adoc",
        "= Cluster\n\nRuns the compute cluster.\n\ntoc::[]\n",
    );

    let settings = CatalogSettings {
        urls: vec![
            first.path().to_string_lossy().into_owned(),
            second.path().to_string_lossy().into_owned(),
        ],
    };
    let mut catalog = Catalog::new();
    catalog.load(&settings, Experiments::default()).await.unwrap();

    let titles: Vec<&str> = catalog.modules().iter().map(Module::title).collect();
    assert_eq!(titles, vec!["VPC", "Cluster"]);

    let urls: Vec<Option<&str>> = catalog.modules().iter().map(Module::url).collect();
    assert_eq!(
        urls,
        vec![
            Some("https://github.com/acme/network-modules/tree/main/modules/vpc"),
            Some("https://gitlab.com/acme/compute-modules/-/tree/trunk/modules/cluster"),
        ]
    );

    let cluster = &catalog.modules()[1];
    assert!(cluster.description().contains("Runs the compute cluster."));
    assert!(!cluster.description().contains("toc"));
}

#[tokio::test]
async fn ingest_reads_urls_from_the_root_configuration() {
    let repo = tempfile::tempdir().unwrap();
    write_git_metadata(repo.path(), "https://github.com/acme/widgets.git", "main");
    write_module(repo.path(), "vpc", "README.md", "# VPC\n\nNetworking.\n");

    let working = tempfile::tempdir().unwrap();
    fs::write(
        working.path().join(config::ROOT_CONFIG_NAME),
        format!(
            "catalog {{\n  urls = [\"{}\"]\n}}\n",
            repo.path().to_string_lossy()
        ),
    )
    .unwrap();

    let settings = config::load_catalog_settings(working.path()).unwrap();
    let mut catalog = Catalog::new();
    catalog.load(&settings, Experiments::default()).await.unwrap();

    assert_eq!(catalog.modules().len(), 1);
    assert_eq!(catalog.modules()[0].title(), "VPC");
    assert_eq!(catalog.repos()[0].branch_name(), "main");
}

#[tokio::test]
async fn repeated_loads_over_a_stable_tree_are_deterministic() {
    let repo = tempfile::tempdir().unwrap();
    write_git_metadata(repo.path(), "https://github.com/acme/widgets.git", "main");
    write_module(repo.path(), "alpha", "README.md", "# Alpha\n");
    write_module(repo.path(), "beta", "README.md", "# Beta\n");
    write_module(repo.path(), "gamma", "README.md", "# Gamma\n");

    let settings = CatalogSettings {
        urls: vec![repo.path().to_string_lossy().into_owned()],
    };

    let mut first = Catalog::new();
    first.load(&settings, Experiments::default()).await.unwrap();
    let mut second = Catalog::new();
    second.load(&settings, Experiments::default()).await.unwrap();

    let order = |catalog: &Catalog| -> Vec<String> {
        catalog
            .modules()
            .iter()
            .map(|m| m.module_dir().to_string())
            .collect()
    };
    assert_eq!(order(&first), order(&second));
    assert_eq!(
        order(&first),
        vec!["modules/alpha", "modules/beta", "modules/gamma"]
    );
}
