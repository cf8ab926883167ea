//! ATProto XRPC client for cadence.
//!
//! Covers the three calls the posting daemon needs: session authentication
//! (create + refresh), blob upload for post illustrations, and post record
//! creation. Everything else about the protocol is out of scope.

mod client;
mod error;
mod types;

pub use client::AtprotoClient;
pub use error::AtprotoError;
pub use types::{ImageAttachment, MediaRef, PostRef, Session};
