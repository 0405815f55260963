//! In-memory [`Transport`] and [`Waiter`] implementations for tests.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    time::Duration,
};

use ureq::http::{HeaderMap, HeaderValue};

use crate::{
    error::ApiError,
    quota::{RATE_LIMIT_REMAINING, RATE_LIMIT_RESET},
    transport::{RawResponse, Transport},
    wait::Waiter,
};

/// One scripted outcome for a URL.
#[derive(Debug, Clone)]
pub enum Reply {
    Response(RawResponse),
    Timeout,
    ConnectionFailed,
}

impl Reply {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self::Response(RawResponse {
            status,
            headers: HeaderMap::new(),
            body: body.into().into_bytes(),
        })
    }

    pub fn status(status: u16) -> Self {
        Self::json(status, "")
    }

    /// Adds `X-RateLimit-Remaining` / `X-RateLimit-Reset` headers.
    pub fn with_quota(self, remaining: u64, reset: u64) -> Self {
        self.with_header(RATE_LIMIT_REMAINING, &remaining.to_string())
            .with_header(RATE_LIMIT_RESET, &reset.to_string())
    }

    pub fn with_header(self, name: &'static str, value: &str) -> Self {
        match self {
            Self::Response(mut resp) => {
                if let Ok(value) = HeaderValue::from_str(value) {
                    resp.headers.insert(name, value);
                }
                Self::Response(resp)
            }
            other => other,
        }
    }
}

/// A transport that answers from per-URL scripts.
///
/// Each URL owns a queue of replies; the last reply of a queue repeats forever. URLs
/// without a script answer `404`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: RefCell<HashMap<String, VecDeque<Reply>>>,
    requests: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: impl Into<String>, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.routes
            .borrow_mut()
            .insert(url.into(), replies.into_iter().collect());
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }
}

impl Transport for ScriptedTransport {
    fn get(
        &self,
        url: &str,
        _query: &[(&str, &str)],
        _headers: &HeaderMap,
    ) -> Result<RawResponse, ApiError> {
        self.requests.borrow_mut().push(url.to_string());

        let reply = {
            let mut routes = self.routes.borrow_mut();
            match routes.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply.unwrap_or_else(|| Reply::status(404)) {
            Reply::Response(resp) => Ok(resp),
            Reply::Timeout => {
                Err(ApiError::Timeout {
                    url: url.to_string(),
                })
            }
            Reply::ConnectionFailed => Err(ureq::Error::ConnectionFailed.into()),
        }
    }
}

/// A [`Waiter`] that records requested durations instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingWaiter {
    waits: RefCell<Vec<Duration>>,
}

impl RecordingWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }

    pub fn total(&self) -> Duration {
        self.waits.borrow().iter().sum()
    }
}

impl Waiter for RecordingWaiter {
    fn wait(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}
