//! GitHub REST API payloads and constants.

use std::env;

use serde::Deserialize;
use ureq::http::{
    header::{ACCEPT, AUTHORIZATION},
    HeaderMap, HeaderName, HeaderValue,
};

pub const RATE_LIMIT_URL: &str = "https://api.github.com/rate_limit";
pub const TOKEN_ENV: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];
pub const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
pub const API_VERSION_HEADER: &str = "x-github-api-version";
pub const API_VERSION: &str = "2022-11-28";

/// Reads the first non-empty token from [`TOKEN_ENV`].
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV.iter().find_map(|key| {
        env::var(key)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Headers sent with every API request when a token is configured.
///
/// Without a token no headers are added and requests go out unauthenticated. A token that
/// is not a valid header value is ignored.
pub fn api_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let Some(token) = token else {
        return headers;
    };
    let Ok(auth) = HeaderValue::from_str(&format!("Bearer {token}")) else {
        return headers;
    };

    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
    headers.insert(
        HeaderName::from_static(API_VERSION_HEADER),
        HeaderValue::from_static(API_VERSION),
    );
    headers
}

/// Body of `GET /rate_limit`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimitStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitStatus {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
    #[serde(default)]
    pub used: u64,
}

/// Body of `GET /repos/{owner}/{repo}/git/trees/{sha}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitTree {
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub url: String,
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(default)]
    pub mode: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.kind == "tree"
    }
}

/// Body of `GET /repos/{owner}/{repo}/git/blobs/{sha}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitBlob {
    pub content: String,
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
}
