//! The rate-limit aware GitHub API client.
//!
//! [`RateLimitedClient::get`] never fails: every outcome that does not produce a JSON body
//! (not found, exhausted retries, undecodable payloads) collapses into the empty-object
//! sentinel returned by [`empty_result`], with the cause logged. Callers treat the sentinel
//! as "no data".

use std::{fmt, time::Duration};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use ureq::http::HeaderMap;

use crate::{
    backoff::{transport_retry_delay, Backoff},
    error::ApiError,
    github::{api_headers, token_from_env, RateLimitResponse, RateLimitStatus, RATE_LIMIT_URL},
    http_client::shared_config,
    quota::{header_u64, now_unix, QuotaState, QuotaTracker, LOW_WATER_MARK, RATE_LIMIT_REMAINING},
    transport::{Transport, UreqTransport},
    wait::{ThreadWaiter, Waiter},
};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const COURTESY_DELAY: Duration = Duration::from_millis(500);
pub const RESET_BUFFER: Duration = Duration::from_secs(5);

/// The "no usable data" value: an empty JSON object.
pub fn empty_result() -> Value {
    Value::Object(Map::new())
}

pub fn is_empty_result(value: &Value) -> bool {
    value.as_object().is_some_and(Map::is_empty)
}

#[derive(Clone)]
pub struct ClientConfig {
    /// Bearer token; `None` means unauthenticated access.
    pub token: Option<String>,
    /// Attempts per logical request, at least 1.
    pub max_retries: u32,
    pub timeout: Duration,
    /// Overrides the process-wide user agent when set.
    pub user_agent: Option<String>,
    pub courtesy_delay: Duration,
    pub low_water_mark: u64,
    pub reset_buffer: Duration,
    pub backoff: Backoff,
    pub rate_limit_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: REQUEST_TIMEOUT,
            user_agent: None,
            courtesy_delay: COURTESY_DELAY,
            low_water_mark: LOW_WATER_MARK,
            reset_buffer: RESET_BUFFER,
            backoff: Backoff::default(),
            rate_limit_url: RATE_LIMIT_URL.to_string(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("courtesy_delay", &self.courtesy_delay)
            .field("low_water_mark", &self.low_water_mark)
            .field("reset_buffer", &self.reset_buffer)
            .field("backoff", &self.backoff)
            .field("rate_limit_url", &self.rate_limit_url)
            .finish()
    }
}

impl ClientConfig {
    /// Default settings with the token read from `GITHUB_TOKEN` / `GH_TOKEN`.
    pub fn from_env() -> Self {
        Self {
            token: token_from_env(),
            ..Default::default()
        }
    }
}

/// Result of a single request attempt.
enum Attempt {
    Success(Value),
    NotFound,
    /// 403/429 carrying `X-RateLimit-Remaining: 0`.
    QuotaExhausted(u16),
    /// 403/429 without a usable quota signal.
    Throttled(u16),
    Failed(ApiError),
}

pub struct RateLimitedClient<T = UreqTransport, W = ThreadWaiter> {
    transport: T,
    waiter: W,
    quota: QuotaTracker,
    headers: HeaderMap,
    config: ClientConfig,
}

impl RateLimitedClient {
    /// Creates a client that talks to the network and sleeps on the calling thread.
    pub fn new(config: ClientConfig) -> Self {
        let mut agent = shared_config();
        agent.timeout = Some(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            agent.user_agent = Some(user_agent.clone());
        }

        let transport = UreqTransport::with_config(&agent);
        Self::with_parts(config, transport, ThreadWaiter)
    }
}

impl<T: Transport, W: Waiter> RateLimitedClient<T, W> {
    pub fn with_parts(config: ClientConfig, transport: T, waiter: W) -> Self {
        Self {
            headers: api_headers(config.token.as_deref()),
            quota: QuotaTracker::new(config.low_water_mark),
            transport,
            waiter,
            config,
        }
    }

    pub fn has_token(&self) -> bool {
        self.config.token.is_some()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn quota(&self) -> QuotaState {
        self.quota.state()
    }

    /// Seeds the quota tracker, e.g. from a previous status check.
    pub fn set_quota(&mut self, state: QuotaState) {
        self.quota.set_state(state);
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn waiter(&self) -> &W {
        &self.waiter
    }

    /// GETs `url` with the configured retry budget.
    ///
    /// Returns the decoded JSON body, or [`empty_result`] when the resource does not exist
    /// or every attempt failed.
    pub fn get(&mut self, url: &str) -> Value {
        let max_retries = self.config.max_retries;
        self.get_with(url, &[], max_retries)
    }

    /// GETs `url` with query parameters and an explicit attempt budget.
    ///
    /// A budget of `0` is treated as `1`.
    pub fn get_with(&mut self, url: &str, query: &[(&str, &str)], max_retries: u32) -> Value {
        let attempts = max_retries.max(1);

        for attempt in 0..attempts {
            let has_next = attempt + 1 < attempts;

            self.throttle_if_needed();

            match self.attempt(url, query) {
                Attempt::Success(value) => {
                    self.waiter.wait(self.config.courtesy_delay);
                    return value;
                }
                Attempt::NotFound => {
                    debug!("Not found: {url}");
                    return empty_result();
                }
                Attempt::QuotaExhausted(status) => {
                    warn!(
                        "Rate limit exhausted (HTTP {status}) on attempt {}/{attempts} for {url}",
                        attempt + 1
                    );
                    if has_next {
                        self.wait_for_reset();
                    }
                }
                Attempt::Throttled(status) => {
                    let delay = self.config.backoff.delay_for(attempt);
                    warn!(
                        "HTTP {status} on attempt {}/{attempts} for {url}, backing off {}s",
                        attempt + 1,
                        delay.as_secs_f64()
                    );
                    if has_next {
                        self.waiter.wait(delay);
                    }
                }
                Attempt::Failed(err) => {
                    if has_next {
                        let delay = transport_retry_delay(attempt);
                        warn!(
                            "Request failed on attempt {}/{attempts}: {err}. Retrying in {}s",
                            attempt + 1,
                            delay.as_secs()
                        );
                        self.waiter.wait(delay);
                    } else {
                        warn!("Request failed on attempt {}/{attempts}: {err}", attempt + 1);
                    }
                }
            }
        }

        error!("Giving up on {url} after {attempts} attempts");
        empty_result()
    }

    /// [`get`](Self::get) followed by typed decoding.
    ///
    /// Returns `None` for the sentinel and for bodies that do not match `D`.
    pub fn get_json<D: DeserializeOwned>(&mut self, url: &str) -> Option<D> {
        let value = self.get(url);
        if is_empty_result(&value) {
            return None;
        }

        serde_json::from_value(value)
            .map_err(|err| warn!("Unexpected response shape from {url}: {err}"))
            .ok()
    }

    /// Fetches and logs the current quota, updating the tracker.
    ///
    /// Returns `None` if the quota endpoint could not be read.
    pub fn check_rate_limit(&mut self) -> Option<RateLimitStatus> {
        if !self.has_token() {
            warn!("No GitHub token found; unauthenticated requests are heavily rate limited");
        }

        match self.fetch_rate_limit() {
            Ok(status) => {
                self.quota.observe_status(&status);
                info!(
                    "GitHub API quota: {}/{} remaining, resets at {}",
                    status.remaining,
                    status.limit,
                    format_reset(status.reset)
                );
                Some(status)
            }
            Err(err) => {
                warn!("Unable to check GitHub rate limit: {err}");
                None
            }
        }
    }

    fn attempt(&mut self, url: &str, query: &[(&str, &str)]) -> Attempt {
        debug!("GET {url}");
        let response = match self.transport.get(url, query, &self.headers) {
            Ok(response) => response,
            Err(err) => return Attempt::Failed(err),
        };

        self.quota.observe(&response.headers);

        match response.status {
            403 | 429 => {
                if header_u64(&response.headers, RATE_LIMIT_REMAINING) == Some(0) {
                    Attempt::QuotaExhausted(response.status)
                } else {
                    Attempt::Throttled(response.status)
                }
            }
            404 => Attempt::NotFound,
            status if response.is_success() => {
                match serde_json::from_slice(&response.body) {
                    Ok(value) => Attempt::Success(value),
                    Err(source) => {
                        debug!("HTTP {status} with undecodable body from {url}");
                        Attempt::Failed(ApiError::InvalidJson {
                            url: url.to_string(),
                            source,
                        })
                    }
                }
            }
            status => {
                Attempt::Failed(ApiError::HttpError {
                    status,
                    url: url.to_string(),
                })
            }
        }
    }

    /// Confirms a low quota with the status endpoint and waits for the reset if needed.
    fn throttle_if_needed(&mut self) {
        if !self.quota.should_preemptively_throttle() {
            return;
        }

        debug!(
            "Observed quota below {}, checking rate limit status",
            self.quota.low_water_mark()
        );

        match self.fetch_rate_limit() {
            Ok(status) => {
                self.quota.observe_status(&status);
                if self.quota.is_low(status.remaining) {
                    warn!(
                        "Only {} API requests left, waiting for quota reset",
                        status.remaining
                    );
                    self.wait_for_reset();
                }
            }
            Err(err) => warn!("Unable to confirm remaining quota: {err}"),
        }
    }

    fn wait_for_reset(&self) {
        let wait = self.quota.state().until_reset(now_unix()) + self.config.reset_buffer;
        info!("Waiting {}s for the rate limit to reset", wait.as_secs());
        self.waiter.wait(wait);
    }

    fn fetch_rate_limit(&self) -> Result<RateLimitStatus, ApiError> {
        let url = self.config.rate_limit_url.as_str();
        let response = self.transport.get(url, &[], &self.headers)?;

        if !response.is_success() {
            return Err(ApiError::HttpError {
                status: response.status,
                url: url.to_string(),
            });
        }

        let parsed: RateLimitResponse =
            serde_json::from_slice(&response.body).map_err(|source| {
                ApiError::InvalidJson {
                    url: url.to_string(),
                    source,
                }
            })?;

        Ok(parsed.resources.core)
    }
}

fn format_reset(reset: u64) -> String {
    i64::try_from(reset)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|at| {
            at.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| reset.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{RecordingWaiter, Reply, ScriptedTransport};

    const URL: &str = "https://api.github.com/repos/duckdb/community-extensions/git/trees/abc";

    fn client(transport: ScriptedTransport) -> RateLimitedClient<ScriptedTransport, RecordingWaiter> {
        let config = ClientConfig {
            token: Some("token".into()),
            ..Default::default()
        };
        RateLimitedClient::with_parts(config, transport, RecordingWaiter::new())
    }

    fn rate_limit_body(remaining: u64, reset: u64) -> String {
        json!({
            "resources": {"core": {"limit": 5000, "remaining": remaining, "reset": reset, "used": 0}}
        })
        .to_string()
    }

    #[test]
    fn test_success_returns_body_and_observes_headers() {
        let transport = ScriptedTransport::new().route(
            URL,
            [Reply::json(200, r#"{"a":1}"#).with_quota(4321, 1_700_000_000)],
        );
        let mut client = client(transport);

        let value = client.get(URL);

        assert_eq!(value, json!({"a": 1}));
        assert_eq!(client.quota(), QuotaState::new(4321, 1_700_000_000));
        assert_eq!(client.waiter().waits(), vec![COURTESY_DELAY]);
        assert_eq!(client.transport().requests(), vec![URL.to_string()]);
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let transport = ScriptedTransport::new().route(URL, [Reply::status(404).with_quota(4000, 0)]);
        let mut client = client(transport);

        let value = client.get(URL);

        assert!(is_empty_result(&value));
        assert_eq!(client.transport().request_count(URL), 1);
        assert!(client.waiter().waits().is_empty());
    }

    #[test]
    fn test_timeouts_exhaust_with_doubling_waits() {
        let transport = ScriptedTransport::new().route(URL, [Reply::Timeout]);
        let mut client = client(transport);

        let value = client.get_with(URL, &[], 3);

        assert!(is_empty_result(&value));
        assert_eq!(client.transport().request_count(URL), 3);
        assert_eq!(
            client.waiter().waits(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_connection_failure_then_success() {
        let transport = ScriptedTransport::new().route(
            URL,
            [
                Reply::ConnectionFailed,
                Reply::json(200, "[1,2,3]").with_quota(100, 0),
            ],
        );
        let mut client = client(transport);

        assert_eq!(client.get(URL), json!([1, 2, 3]));
        assert_eq!(
            client.waiter().waits(),
            vec![Duration::from_secs(2), COURTESY_DELAY]
        );
    }

    #[test]
    fn test_server_error_is_retried_like_transport_failure() {
        let transport = ScriptedTransport::new().route(
            URL,
            [
                Reply::status(502).with_quota(100, 0),
                Reply::json(200, r#"{"ok":true}"#).with_quota(99, 0),
            ],
        );
        let mut client = client(transport);

        assert_eq!(client.get(URL), json!({"ok": true}));
        assert_eq!(client.transport().request_count(URL), 2);
        assert_eq!(client.waiter().waits()[0], Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_json_is_retried_then_sentinel() {
        let transport =
            ScriptedTransport::new().route(URL, [Reply::json(200, "<html>").with_quota(100, 0)]);
        let mut client = client(transport);

        assert!(is_empty_result(&client.get_with(URL, &[], 2)));
        assert_eq!(client.transport().request_count(URL), 2);
    }

    #[test]
    fn test_exhausted_quota_waits_for_reset() {
        let reset = now_unix() + 20;
        let transport = ScriptedTransport::new()
            .route(
                URL,
                [
                    Reply::status(403).with_quota(0, reset),
                    Reply::json(200, r#"{"a":1}"#).with_quota(5000, reset + 3600),
                ],
            )
            .route(RATE_LIMIT_URL, [Reply::json(200, rate_limit_body(5000, reset + 3600))]);
        let mut client = client(transport);

        assert_eq!(client.get(URL), json!({"a": 1}));

        let waits = client.waiter().waits();
        // reset wait, then courtesy delay
        assert_eq!(waits.len(), 2);
        assert!(waits[0] >= Duration::from_secs(24), "waited {:?}", waits[0]);
        assert!(waits[0] <= Duration::from_secs(25), "waited {:?}", waits[0]);
        assert_ne!(waits[0], Backoff::default().delay_for(0));
        assert_eq!(client.waiter().total(), waits[0] + COURTESY_DELAY);
    }

    #[test]
    fn test_rate_limit_without_headers_uses_backoff() {
        let transport = ScriptedTransport::new()
            .route(
                URL,
                [
                    Reply::status(429),
                    Reply::status(429),
                    Reply::json(200, "{}").with_quota(5000, 0),
                ],
            )
            .route(RATE_LIMIT_URL, [Reply::json(200, rate_limit_body(5000, 0))]);
        let mut client = client(transport);

        client.get(URL);

        let waits = client.waiter().waits();
        assert_eq!(waits[0], Duration::from_secs(5));
        assert_eq!(waits[1], Duration::from_secs(10));
    }

    #[test]
    fn test_forbidden_with_remaining_quota_uses_backoff() {
        let transport = ScriptedTransport::new().route(
            URL,
            [Reply::status(403).with_quota(4000, now_unix() + 600)],
        );
        let mut client = client(transport);

        assert!(is_empty_result(&client.get_with(URL, &[], 2)));
        assert_eq!(client.waiter().waits(), vec![Duration::from_secs(5)]);
        assert_eq!(client.transport().request_count(URL), 2);
    }

    #[test]
    fn test_preemptive_check_precedes_request() {
        let transport = ScriptedTransport::new()
            .route(URL, [Reply::json(200, "{}").with_quota(4999, 0)])
            .route(RATE_LIMIT_URL, [Reply::json(200, rate_limit_body(5000, 0))]);
        let mut client = client(transport);
        client.set_quota(QuotaState::new(5, now_unix() + 100));

        client.get(URL);

        assert_eq!(
            client.transport().requests(),
            vec![RATE_LIMIT_URL.to_string(), URL.to_string()]
        );
        // quota refilled, so only the courtesy delay
        assert_eq!(client.waiter().waits(), vec![COURTESY_DELAY]);
    }

    #[test]
    fn test_preemptive_check_confirms_low_quota_and_waits() {
        let reset = now_unix() + 30;
        let transport = ScriptedTransport::new()
            .route(URL, [Reply::json(200, "{}").with_quota(4999, reset + 3600)])
            .route(RATE_LIMIT_URL, [Reply::json(200, rate_limit_body(3, reset))]);
        let mut client = client(transport);
        client.set_quota(QuotaState::new(3, reset));

        client.get(URL);

        let waits = client.waiter().waits();
        assert!(waits[0] >= Duration::from_secs(34));
        assert!(waits[0] <= Duration::from_secs(35));
    }

    #[test]
    fn test_failed_preemptive_check_still_issues_request() {
        let transport = ScriptedTransport::new()
            .route(URL, [Reply::json(200, r#"{"a":1}"#).with_quota(5000, 0)])
            .route(RATE_LIMIT_URL, [Reply::Timeout]);
        let mut client = client(transport);
        client.set_quota(QuotaState::new(1, 0));

        assert_eq!(client.get(URL), json!({"a": 1}));
        assert_eq!(client.transport().request_count(URL), 1);
    }

    #[test]
    fn test_no_error_crosses_boundary() {
        let replies = [
            Reply::Timeout,
            Reply::ConnectionFailed,
            Reply::status(500),
            Reply::status(401),
            Reply::status(403),
            Reply::status(429).with_quota(0, 0),
            Reply::json(200, "not json"),
            Reply::status(404),
        ];

        for reply in replies {
            let transport = ScriptedTransport::new()
                .route(URL, [reply])
                .route(RATE_LIMIT_URL, [Reply::json(200, rate_limit_body(5000, 0))]);
            let mut client = client(transport);
            assert!(is_empty_result(&client.get(URL)));
        }
    }

    #[test]
    fn test_zero_budget_still_attempts_once() {
        let transport = ScriptedTransport::new().route(URL, [Reply::Timeout]);
        let mut client = client(transport);

        client.get_with(URL, &[], 0);
        assert_eq!(client.transport().request_count(URL), 1);
        assert!(client.waiter().waits().is_empty());
    }

    #[test]
    fn test_get_json_typed() {
        #[derive(serde::Deserialize)]
        struct Payload {
            a: u32,
        }

        let transport = ScriptedTransport::new()
            .route(URL, [Reply::json(200, r#"{"a":7}"#).with_quota(5000, 0)]);
        let mut client = client(transport);

        let payload: Payload = client.get_json(URL).unwrap();
        assert_eq!(payload.a, 7);

        let missing: Option<Payload> = client.get_json("https://api.github.com/missing");
        assert!(missing.is_none());
    }

    #[test]
    fn test_check_rate_limit_updates_tracker() {
        let transport = ScriptedTransport::new()
            .route(RATE_LIMIT_URL, [Reply::json(200, rate_limit_body(4800, 1_700_000_000))]);
        let mut client = client(transport);

        let status = client.check_rate_limit().unwrap();
        assert_eq!(status.remaining, 4800);
        assert_eq!(client.quota(), QuotaState::new(4800, 1_700_000_000));
    }

    #[test]
    fn test_check_rate_limit_failure_is_none() {
        let transport = ScriptedTransport::new().route(RATE_LIMIT_URL, [Reply::status(500)]);
        let mut client = client(transport);

        assert!(client.check_rate_limit().is_none());
        assert_eq!(client.quota(), QuotaState::default());
    }

    #[test]
    fn test_client_config_debug_redacts_token() {
        let config = ClientConfig {
            token: Some("ghp_secret".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_empty_result_sentinel() {
        assert!(is_empty_result(&empty_result()));
        assert!(!is_empty_result(&json!({"a": 1})));
        assert!(!is_empty_result(&json!([])));
        assert!(!is_empty_result(&Value::Null));
    }
}
