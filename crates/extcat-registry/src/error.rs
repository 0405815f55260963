//! Error types for the registry crate.

use extcat_utils::error::FileSystemError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while building a catalog.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(extcat_registry::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Failed to fetch from remote source: {0}")]
    #[diagnostic(
        code(extcat_registry::fetch_remote),
        help("Verify the URL is correct and accessible, and that the API quota is not exhausted")
    )]
    FailedToFetchRemote(String),

    #[error("No GitHub token found")]
    #[diagnostic(
        code(extcat_registry::missing_token),
        help("Export GITHUB_TOKEN or GH_TOKEN, or set `github.require_token = false`")
    )]
    MissingToken,

    #[error(transparent)]
    #[diagnostic(
        code(extcat_registry::json),
        help("The catalog data could not be serialized")
    )]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid base64 content: {0}")]
    #[diagnostic(code(extcat_registry::base64))]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid YAML: {0}")]
    #[diagnostic(code(extcat_registry::yaml))]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    #[diagnostic(code(extcat_registry::config))]
    Config(#[from] extcat_config::error::ConfigError),

    #[error(transparent)]
    #[diagnostic(
        code(extcat_registry::output),
        help("Check that the output directory is writable")
    )]
    Output(#[from] FileSystemError),
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RegistryError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
