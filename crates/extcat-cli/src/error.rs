use extcat_config::error::ConfigError;
use extcat_registry::RegistryError;
use extcat_utils::error::PathError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid config path: {0}")]
    #[diagnostic(code(extcat::config_path))]
    ConfigPath(#[from] PathError),

    #[error("Invalid proxy `{proxy}`: {source}")]
    #[diagnostic(
        code(extcat::proxy),
        help("Use a proxy URL such as `http://host:port` or `socks5://host:port`")
    )]
    InvalidProxy {
        proxy: String,
        source: ureq::Error,
    },

    #[error("Invalid header `{0}`")]
    #[diagnostic(code(extcat::header), help("Headers are passed as `Name: value`"))]
    InvalidHeader(String),

    #[error("Unable to read the GitHub rate limit")]
    #[diagnostic(
        code(extcat::rate_limit),
        help("Check your network connection and token")
    )]
    RateLimitUnavailable,

    #[error("{0} catalog(s) failed to build")]
    #[diagnostic(code(extcat::sync), help("See the errors logged above"))]
    CatalogsFailed(usize),
}

pub type Result<T> = std::result::Result<T, CliError>;
