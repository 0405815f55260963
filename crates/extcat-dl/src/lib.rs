//! Rate-limit aware HTTP access to the GitHub REST API.
//!
//! The entry point is [`client::RateLimitedClient`], which wraps a [`transport::Transport`]
//! with quota tracking ([`quota`]), capped exponential backoff ([`backoff`]) and an
//! injectable sleep strategy ([`wait`]).
//!
//! ```no_run
//! use extcat_dl::client::{ClientConfig, RateLimitedClient};
//!
//! let mut client = RateLimitedClient::new(ClientConfig::from_env());
//! let tree = client.get("https://api.github.com/repos/duckdb/community-extensions/git/trees/main");
//! if extcat_dl::client::is_empty_result(&tree) {
//!     eprintln!("no data");
//! }
//! ```

pub mod backoff;
pub mod client;
pub mod error;
pub mod github;
pub mod http;
pub mod http_client;
pub mod quota;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod wait;
