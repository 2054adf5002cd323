//! Crate-wide error kinds.

use std::sync::Arc;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure mode of the client, kept distinct and inspectable.
///
/// The enum is `Clone` so a single refresh failure can be delivered to every
/// caller waiting on the same single-flight exchange; the one payload that is
/// not clonable, [`reqwest::Error`], rides in an [`Arc`] for that reason.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A required environment value is missing or unusable.
    #[error("configuration: {0}")]
    Config(String),

    /// The document does not match the expected markup dialect. Carries the
    /// specific expectation that failed, naming the offending element or key.
    #[error("markup mismatch: {0}")]
    Markup(String),

    /// The page is well-formed but the server reported a failure of its own.
    #[error("server reported an error: {0}")]
    Upstream(String),

    /// The login redirect chain could not establish a session.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A redirect chain exceeded the configured bound. Reports the URL the
    /// caller originally asked for, not the hop that tripped the limit.
    #[error("too many redirects requesting {url}")]
    TooManyRedirects { url: String },

    /// A redirect response without a usable `Location` header.
    #[error("malformed redirect from {url}: {reason}")]
    MalformedRedirect { url: String, reason: String },

    /// Network-level failure from the underlying client, passed through.
    #[error("transport: {0}")]
    Transport(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}
