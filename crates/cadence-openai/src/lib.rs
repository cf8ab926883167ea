//! OpenAI image generation client for cadence.
//!
//! One call: prompt in, PNG bytes out. The daemon treats illustration as
//! best-effort, so the client carries no retry logic of its own.

mod client;
mod error;

pub use client::ImageClient;
pub use error::OpenAiError;
