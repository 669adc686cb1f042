//! Catalog command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use tfmod_core::{Catalog, CatalogSettings, Experiments, config};

use crate::cli::Cli;

/// Load the module catalog and render it as a listing.
///
/// A positional repository URL overrides the configured list; otherwise the
/// URLs come from the `catalog` block of the root configuration.
pub async fn execute(cli: &Cli, working_dir: &Path, repo_url: Option<&str>) -> Result<()> {
    let experiments = Experiments::from_names(cli.experiments.iter().map(String::as_str))?;

    let settings = if repo_url.is_some() {
        CatalogSettings::default()
    } else if let Some(path) = &cli.config {
        config::read_catalog_settings(path)?
    } else {
        config::load_catalog_settings(working_dir)?
    };

    let mut catalog = Catalog::new();
    if let Some(url) = repo_url {
        catalog = catalog.with_repo_url(url);
    }
    catalog
        .load(&settings, experiments)
        .await
        .context("failed to load the module catalog")?;

    render(&catalog);
    Ok(())
}

fn render(catalog: &Catalog) {
    for repo in catalog.repos() {
        let origin = repo
            .remote_url()
            .map_or_else(|| repo.path().display().to_string(), ToString::to_string);
        println!(
            "{} {} ({} modules, branch {})",
            "repo".dimmed(),
            origin,
            catalog
                .modules()
                .iter()
                .filter(|module| std::sync::Arc::ptr_eq(module.repo(), repo))
                .count(),
            repo.branch_name(),
        );
    }

    for module in catalog.modules() {
        println!();
        println!("{}", module.title().bold());
        println!("  {}", module.description());
        if let Some(url) = module.url() {
            println!("  {}", url.dimmed());
        }
    }
}
