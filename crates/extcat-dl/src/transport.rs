//! The single-request layer underneath the rate-limited client.

use std::time::Duration;

use tracing::trace;
use ureq::{http::HeaderMap, Agent};
use url::Url;

use crate::{
    error::ApiError,
    http::JSON_BODY_LIMIT,
    http_client::{apply_headers, shared_config, AgentConfig},
};

/// Status, headers and body of one HTTP exchange.
///
/// Non-2xx responses are returned as values; only failures to obtain a response at all
/// (DNS, connect, timeout, unreadable body) are errors.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP GET.
pub trait Transport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<RawResponse, ApiError>;
}

/// [`Transport`] backed by a dedicated `ureq` agent.
pub struct UreqTransport {
    agent: Agent,
    extra_headers: Option<HeaderMap>,
}

impl UreqTransport {
    /// Builds a transport from the shared agent settings with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let config = AgentConfig {
            timeout: Some(timeout),
            ..shared_config()
        };
        Self::with_config(&config)
    }

    pub fn with_config(config: &AgentConfig) -> Self {
        Self {
            agent: config.build(),
            extra_headers: config.headers.clone(),
        }
    }
}

impl Transport for UreqTransport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &HeaderMap,
    ) -> Result<RawResponse, ApiError> {
        Url::parse(url).map_err(|source| {
            ApiError::InvalidUrl {
                url: url.to_string(),
                source,
            }
        })?;

        let mut req = apply_headers(self.agent.get(url), &self.extra_headers);
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
        for (key, value) in query {
            req = req.query(*key, *value);
        }

        trace!("GET {url}");
        let mut resp = req.call().map_err(|err| map_call_error(url, err))?;

        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp
            .body_mut()
            .with_config()
            .limit(JSON_BODY_LIMIT)
            .read_to_vec()
            .map_err(|err| map_call_error(url, err))?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Maps a `ureq` failure to an [`ApiError`], keeping timeouts distinguishable.
pub(crate) fn map_call_error(url: &str, err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Timeout(_) => {
            ApiError::Timeout {
                url: url.to_string(),
            }
        }
        err => ApiError::from(err),
    }
}
