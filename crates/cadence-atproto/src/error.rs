//! Failures surfaced by PDS calls.

use thiserror::Error;

/// Errors returned by [`AtprotoClient`](crate::AtprotoClient) operations.
#[derive(Debug, Error)]
pub enum AtprotoError {
    /// A session endpoint rejected us, or a call needs a session we lack.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Structured error returned by an XRPC endpoint.
    #[error("XRPC error: {error} - {message}")]
    Xrpc { error: String, message: String },

    /// The PDS throttled us with HTTP 429.
    #[error("rate limited{}", match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    })]
    RateLimited {
        /// Parsed Retry-After header, when the PDS sent one.
        retry_after_secs: Option<u64>,
    },

    /// Response body did not match what the endpoint documents.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Blob MIME type the PDS will not accept.
    #[error("unsupported image MIME type: {0}")]
    InvalidMimeType(String),

    /// Blob over the PDS upload limit.
    #[error("image blob too large: {size} bytes (max {max})")]
    BlobTooLarge { size: usize, max: usize },
}
