use std::{
    sync::{LazyLock, PoisonError, RwLock},
    time::Duration,
};

use ureq::{http::HeaderMap, Agent, Proxy, RequestBuilder};

/// Settings used to build an [`Agent`].
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub user_agent: Option<String>,
    /// Extra headers sent with every request.
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
}

impl Default for AgentConfig {
    /// Creates a default `AgentConfig` with a user agent of `"pkgforge/extcat"` and proxy,
    /// headers and timeout unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use extcat_dl::http_client::AgentConfig;
    ///
    /// let cfg = AgentConfig::default();
    /// assert_eq!(cfg.user_agent.as_deref(), Some("pkgforge/extcat"));
    /// assert!(cfg.timeout.is_none());
    /// ```
    fn default() -> Self {
        Self {
            user_agent: Some("pkgforge/extcat".into()),
            proxy: None,
            headers: None,
            timeout: None,
        }
    }
}

impl AgentConfig {
    /// Builds an HTTP `Agent` configured from this `AgentConfig`.
    ///
    /// Non-2xx responses are returned as regular responses rather than errors so callers
    /// can inspect status codes and rate-limit headers themselves.
    pub fn build(&self) -> Agent {
        let mut config = ureq::Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout)
            .http_status_as_error(false);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

static SHARED_CONFIG: LazyLock<RwLock<AgentConfig>> =
    LazyLock::new(|| RwLock::new(AgentConfig::default()));

/// Applies the configured extra headers to a request.
pub(crate) fn apply_headers<B>(
    mut req: RequestBuilder<B>,
    headers: &Option<HeaderMap>,
) -> RequestBuilder<B> {
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
    }
    req
}

/// Returns a copy of the process-wide agent settings.
///
/// Transports derive their agents from it, so the proxy, user agent and extra headers
/// chosen on the command line apply to every request.
pub fn shared_config() -> AgentConfig {
    SHARED_CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Updates the process-wide agent settings.
///
/// Only transports created afterwards see the change.
///
/// # Examples
///
/// ```
/// use extcat_dl::http_client::configure_http_client;
///
/// configure_http_client(|cfg| {
///     cfg.user_agent = Some("my-app/1.0".to_string());
/// });
/// ```
pub fn configure_http_client<F>(updater: F)
where
    F: FnOnce(&mut AgentConfig),
{
    let mut config = SHARED_CONFIG
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    updater(&mut config);
}
