//! Error types and handling for tfmod-core operations.
//!
//! Catalog ingest deliberately collects per-repository failures instead of
//! aborting on the first one, so the variants here split into fatal errors
//! (I/O, HCL parse, malformed override values) and the aggregating
//! [`Error::PartialIngest`]. All public functions in this crate return
//! [`Result<T>`](Result).

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for tfmod-core operations.
///
/// `Display` provides user-facing messages carrying the offending path, URL,
/// or value; the wrapper command decides exit codes and formatting.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem read/write/stat failure.
    ///
    /// The underlying `std::io::Error` is preserved to keep detailed error
    /// information available through `source()`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory expected to be a git working copy is missing its
    /// `.git/config` or `.git/HEAD`.
    #[error("'{}' does not appear to be a git repository", .path.display())]
    NotARepository {
        /// Local path that failed the repository check.
        path: PathBuf,
    },

    /// The delegated source getter failed to materialize a repository.
    ///
    /// Recorded per URL during catalog ingest; ingest continues with the
    /// remaining URLs.
    #[error("failed to clone '{url}': {reason}")]
    CloneFailed {
        /// Clone URL that failed.
        url: String,
        /// Captured failure output from the getter.
        reason: String,
    },

    /// A source file could not be parsed as HCL.
    #[error("failed to parse HCL in {}: {message}", .path.display())]
    HclParse {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// An override value is not parseable as JSON, so no HCL type can be
    /// inferred for it.
    #[error("could not infer an HCL type for override value '{value}'")]
    TypeInference {
        /// The offending override value.
        value: String,
    },

    /// An override value parsed as JSON but could not be converted into an
    /// HCL expression.
    #[error("override value '{value}' does not decode as its inferred type: {message}")]
    MalformedJson {
        /// The offending override value.
        value: String,
        /// Conversion diagnostic.
        message: String,
    },

    /// The patch command was invoked without any `--override-attr`.
    #[error("at least one --override-attr KEY=VALUE is required")]
    MissingOverrideAttr,

    /// Neither the configuration nor the command line supplied any catalog
    /// repository URLs.
    #[error("no catalog repository URLs were found in the configuration")]
    NoCatalogUrls,

    /// Ingest completed but produced zero modules.
    #[error("no modules were found in any catalog repository")]
    NoModulesFound,

    /// One or more catalog repositories failed to load.
    ///
    /// The aggregated list of modules from the repositories that did load is
    /// still available on the catalog.
    #[error("{}", render_partial_ingest(.0))]
    PartialIngest(Vec<Error>),

    /// Configuration is invalid or inaccessible.
    #[error("configuration error: {0}")]
    Config(String),

    /// Content parsing or format conversion failed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

fn render_partial_ingest(errors: &[Error]) -> String {
    let details = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "{} catalog repositor{} failed to load: {details}",
        errors.len(),
        if errors.len() == 1 { "y" } else { "ies" },
    )
}

/// A specialized `Result` type for tfmod-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn partial_ingest_lists_underlying_errors() {
        let err = Error::PartialIngest(vec![
            Error::CloneFailed {
                url: "https://example.com/a.git".to_string(),
                reason: "connection refused".to_string(),
            },
            Error::NoCatalogUrls,
        ]);

        let message = err.to_string();
        assert!(message.starts_with("2 catalog repositories failed"));
        assert!(message.contains("https://example.com/a.git"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn io_errors_convert_automatically() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
