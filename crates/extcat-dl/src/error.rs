use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(extcat_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    #[diagnostic(
        code(extcat_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("Request timed out: {url}")]
    #[diagnostic(code(extcat_dl::timeout))]
    Timeout { url: String },

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(extcat_dl::http_error))]
    HttpError { status: u16, url: String },

    #[error("Invalid JSON from {url}: {source}")]
    #[diagnostic(code(extcat_dl::invalid_json))]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl From<ureq::Error> for ApiError {
    /// Converts a `ureq::Error` into an [`ApiError::Network`].
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}
