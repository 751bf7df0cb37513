//! Errors from remote HTTP services.

use thiserror::Error;

/// Failure talking to the chat backend or the photo search API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built from the configured base.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The service answered with a non-success status.
    #[error("Remote returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for logging.
        body: String,
    },

    /// A success response lacked a field we need.
    #[error("Response missing field: {0}")]
    MissingField(&'static str),
}
