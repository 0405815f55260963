use serde::de::DeserializeOwned;
use tracing::debug;
use ureq::http::HeaderMap;

use crate::{error::ApiError, transport::Transport};

/// Upper bound for response bodies read in one go.
pub const JSON_BODY_LIMIT: u64 = 64 * 1024 * 1024;

/// Single-shot JSON GET without credentials or retries.
///
/// Meant for public endpoints outside the GitHub API, so the API token never leaves
/// [`RateLimitedClient`](crate::client::RateLimitedClient).
///
/// # Errors
///
/// * [`ApiError::Timeout`] / [`ApiError::Network`] on transport failure
/// * [`ApiError::HttpError`] for any non-2xx status
/// * [`ApiError::InvalidJson`] if the body cannot be decoded as `D`
pub fn fetch_json<T, D>(transport: &T, url: &str) -> Result<D, ApiError>
where
    T: Transport,
    D: DeserializeOwned,
{
    debug!("Fetching {url}");
    let resp = transport.get(url, &[], &HeaderMap::new())?;

    if !resp.is_success() {
        return Err(ApiError::HttpError {
            status: resp.status,
            url: url.to_string(),
        });
    }

    serde_json::from_slice(&resp.body).map_err(|source| {
        ApiError::InvalidJson {
            url: url.to_string(),
            source,
        }
    })
}
