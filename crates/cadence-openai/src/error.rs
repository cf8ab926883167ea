//! Failures surfaced by image generation.

use thiserror::Error;

/// Errors returned by [`ImageClient`](crate::ImageClient) calls.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// OpenAI rejected the API key.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// OpenAI throttled us with HTTP 429.
    #[error("rate limited{}", match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    })]
    RateLimited {
        /// Parsed Retry-After header, when OpenAI sent one.
        retry_after_secs: Option<u64>,
    },

    /// API returned an error response.
    #[error("image generation failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// Image payload could not be base64-decoded.
    #[error("invalid image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Response carried no usable image data.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
