//! Core types for the ATProto client.

use serde::{Deserialize, Serialize};

/// Identity and tokens handed back by the session endpoints.
///
/// The access token authenticates XRPC calls until it expires; the refresh
/// token then buys a replacement without re-sending credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

/// An opaque blob reference returned by the PDS after an upload.
///
/// The PDS hands back a JSON object (`$type`, `ref.$link`, `mimeType`,
/// `size`) that must be echoed verbatim into a post record's embed. It is
/// never inspected locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub serde_json::Value);

/// An uploaded image ready to attach to a post.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub blob: MediaRef,
    pub alt: String,
}

/// Reference to a created post (AT URI + CID).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
}
