use extcat_utils::error::PathError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(extcat_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(extcat_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists at {0}")]
    #[diagnostic(
        code(extcat_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists(String),

    #[error("Invalid duration for `{field}`: {value:?}")]
    #[diagnostic(
        code(extcat_config::invalid_duration),
        help("Use a duration like `500ms`, `30s`, `1m` or `1m30s`")
    )]
    InvalidDuration { field: &'static str, value: String },

    #[error("`github.max_retries` must be at least 1")]
    #[diagnostic(code(extcat_config::invalid_retries))]
    InvalidRetries,

    #[error("`{0}` must not be empty")]
    #[diagnostic(
        code(extcat_config::empty_value),
        help("Remove the key to fall back to the default")
    )]
    EmptyValue(&'static str),

    #[error("IO error: {0}")]
    #[diagnostic(code(extcat_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(
        code(extcat_config::path),
        help("Check the path settings and the environment variables they reference")
    )]
    Path(#[from] PathError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(extcat_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(extcat_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
