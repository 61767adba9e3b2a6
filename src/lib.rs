//! # throttled-invoker
//!
//! Retry-with-backoff for rate-limited API calls, and a small Twitter client
//! built on it that finds the accounts you follow but never filed into a list.
//!
//! ## Quick Start
//!
//! ```no_run
//! use throttled_invoker::retry::{MessageClassifier, ThrottleConfig, ThrottledInvoker};
//! use throttled_invoker::TwitterError;
//!
//! # fn fetch() -> Result<u32, TwitterError> { Ok(1) }
//! # fn example() -> Result<(), TwitterError> {
//! // 6 retries, 5s base delay: sleeps 5, 10, 20, 40, 80, 160 seconds at most.
//! let invoker = ThrottledInvoker::new(
//!     ThrottleConfig::default(),
//!     MessageClassifier::rate_limit_exceeded(),
//! );
//!
//! // Retried only while the error's provider message is "Rate limit exceeded".
//! let value = invoker.invoke("fetch", fetch)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Throttled Invoker**: exponential backoff on throttling errors only; every
//!   other error propagates immediately
//! - **Pluggable classification**: any `Fn(&E) -> bool`, or a configured
//!   provider message via [`retry::MessageClassifier`]
//! - **Sync and async**: blocking `invoke` and tokio-based `invoke_async`
//! - **Twitter client**: OAuth 1.0a signed v1.1 calls with cursor pagination
//! - **CLI**: `twitter-lists` (binary included)
//!
//! ## Configuration
//!
//! Credentials come from the environment (or a `.env` file):
//! `TWITTER_API_KEY`, `TWITTER_API_SECRET`, `TWITTER_ACCESS_TOKEN`,
//! `TWITTER_ACCESS_SECRET`. An optional `config.toml` tunes the retry policy:
//!
//! ```toml
//! [retry]
//! max_retries = 6
//! base_delay_secs = 5
//! throttle_message = "Rate limit exceeded"
//!
//! [twitter]
//! api_base = "https://api.twitter.com/1.1"
//! ```

pub mod api_client;
pub mod config;
pub mod dto;
pub mod error;
pub mod oauth;
pub mod report;
pub mod retry;

// Re-export commonly used types at the crate root
pub use api_client::TwitterApiClient;
pub use config::{Config, TwitterCredentials};
pub use error::TwitterError;
pub use retry::{MessageClassifier, ThrottleConfig, ThrottledInvoker};
