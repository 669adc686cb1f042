//! # tfmod-core
//!
//! Core engines for `tfmod`: catalog ingest over remote or local module
//! repositories, and structure-preserving attribute overrides inside
//! `provider "aws"` blocks.
//!
//! ## Architecture
//!
//! The crate is organized around two independent cores:
//!
//! - **Catalog ingest**: [`Catalog`] materializes every configured repository
//!   ([`Repo`]) through a delegated source getter, walks its module
//!   directories, and parses each module's README ([`ModuleDoc`]) into a
//!   [`Module`] record with a title, description, and canonical web URL.
//! - **Provider patching**: [`patch_provider_blocks`] rewrites selected
//!   attributes inside `provider "aws"` blocks while keeping the rest of the
//!   file byte-identical, fed by the module manifest scanner
//!   ([`find_source_files`]).
//!
//! ## Quick start
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::path::Path;
//!
//! let code = "provider \"aws\" {\n  region = var.aws_region\n}\n";
//! let overrides = HashMap::from([
//!     ("region".to_string(), "\"eu-west-1\"".to_string()),
//! ]);
//!
//! let (patched, updated) =
//!     tfmod_core::patch_provider_blocks(code, Path::new("main.tf"), &overrides)?;
//! assert!(updated);
//! assert!(patched.contains(r#"region = "eu-west-1""#));
//! # Ok::<(), tfmod_core::Error>(())
//! ```
//!
//! ## Error handling
//!
//! All operations return [`Result<T, Error>`](Result). Catalog ingest records
//! per-repository failures and keeps going; the aggregate surfaces as
//! [`Error::PartialIngest`] once the remaining repositories have loaded.

/// Catalog ingest across configured repositories
pub mod catalog;
/// Root configuration discovery and experiment toggles
pub mod config;
/// README discovery and parsing
pub mod doc;
/// Error types and result alias
pub mod error;
/// Module discovery within a repository
pub mod finder;
/// Delegated source acquisition
pub mod getter;
/// Module source-file manifest scanning
pub mod manifest;
/// Provider block attribute overrides
pub mod patch;
/// Repository materialization and metadata
pub mod repo;
/// Small shared helpers
pub mod utils;

// Re-export commonly used types
pub use catalog::{CACHE_DIR_ENV, Catalog, DefaultRepoFactory, RepoFactory, Scaffolder};
pub use config::{CatalogSettings, Experiments, ROOT_CONFIG_NAME};
pub use doc::{DocKind, ModuleDoc, find_doc};
pub use error::{Error, Result};
pub use finder::Module;
pub use getter::{GitGetter, SourceGetter};
pub use manifest::find_source_files;
pub use patch::patch_provider_blocks;
pub use repo::{CLONE_COMPLETE_SENTINEL, Repo, RepoOptions};
