//! XRPC calls against a PDS: session management, blob upload, post creation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{AtprotoError, ImageAttachment, MediaRef, PostRef, Session};

/// Record collection posts are written to.
const POST_COLLECTION: &str = "app.bsky.feed.post";

/// MIME types the PDS accepts for image blobs.
const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Maximum image blob size accepted by the PDS, in bytes.
const MAX_BLOB_SIZE: usize = 1_000_000;

/// Attempts per XRPC call: one initial try plus retries.
const MAX_ATTEMPTS: u32 = 4;

/// Client for posting through an ATProto PDS.
pub struct AtprotoClient {
    http: Client,
    pds_url: String,
    session: Arc<RwLock<Option<Session>>>,
}

impl AtprotoClient {
    /// Create a client that talks to the PDS at `pds_url`.
    pub fn new(pds_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
            pds_url: pds_url.into(),
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Exchange an identifier and app password for a session.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<(), AtprotoError> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            identifier: &'a str,
            password: &'a str,
        }

        let url = format!("{}/xrpc/com.atproto.server.createSession", self.pds_url);
        let response = self
            .http
            .post(&url)
            .json(&LoginRequest { identifier, password })
            .send()
            .await?;

        let session = read_session(response, "login").await?;
        debug!(did = %session.did, handle = %session.handle, "authenticated with PDS");

        *self.session.write().await = Some(session);
        Ok(())
    }

    /// Trade the refresh token for a fresh session.
    pub async fn refresh_session(&self) -> Result<(), AtprotoError> {
        let refresh_jwt = self.refresh_token().await?;

        let url = format!("{}/xrpc/com.atproto.server.refreshSession", self.pds_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", refresh_jwt))
            .send()
            .await?;

        let session = read_session(response, "refresh").await?;
        debug!(did = %session.did, "refreshed session");

        *self.session.write().await = Some(session);
        Ok(())
    }

    /// DID of the authenticated account, if logged in.
    pub async fn did(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.did.clone())
    }

    /// Base URL of the PDS this client talks to.
    pub fn pds_url(&self) -> &str {
        &self.pds_url
    }

    /// Access token for authenticated calls.
    async fn access_token(&self) -> Result<String, AtprotoError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_jwt.clone())
            .ok_or_else(|| AtprotoError::Auth("not authenticated".to_string()))
    }

    /// Refresh token, required to renew a session.
    async fn refresh_token(&self) -> Result<String, AtprotoError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_jwt.clone())
            .ok_or_else(|| AtprotoError::Auth("no session to refresh".to_string()))
    }

    /// Whether the PDS rejected our access token as expired.
    fn is_expired_token_error(err: &AtprotoError) -> bool {
        matches!(err, AtprotoError::Xrpc { error, .. } if error == "ExpiredToken")
    }

    /// Whether an error is worth retrying after a short backoff.
    fn is_transient_error(err: &AtprotoError) -> bool {
        const RETRYABLE: &[&str] = &[
            "UpstreamFailure",
            "UpstreamTimeout",
            "InternalServerError",
            "ServiceUnavailable",
        ];

        match err {
            AtprotoError::Xrpc { error, .. } => RETRYABLE.contains(&error.as_str()),
            AtprotoError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Refresh the session after an expired-token rejection.
    ///
    /// Returns true when the caller should retry with the new token.
    async fn try_refresh(&self) -> bool {
        match self.refresh_session().await {
            Ok(()) => {
                debug!("renewed expired session");
                true
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed");
                false
            }
        }
    }

    /// Send an authenticated XRPC request and parse the JSON response.
    ///
    /// `build` receives the current access token and produces the request.
    /// An expired token triggers a session refresh before the next attempt;
    /// transient failures back off exponentially.
    async fn send_xrpc<T, F>(&self, op: &str, build: F) -> Result<T, AtprotoError>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let mut last_error: Option<AtprotoError> = None;
        for attempt in 0..MAX_ATTEMPTS {
            let token = self.access_token().await?;
            let response = build(&token).send().await?;

            match handle_response(response).await {
                Ok(value) => return Ok(value),
                Err(e) if Self::is_expired_token_error(&e) => {
                    if self.try_refresh().await {
                        continue;
                    }
                    return Err(e);
                }
                Err(e) if Self::is_transient_error(&e) && attempt + 1 < MAX_ATTEMPTS => {
                    let backoff_ms = 500u64 << attempt; // 500ms, 1s, 2s
                    warn!(op, attempt = attempt + 1, backoff_ms, error = %e, "retrying XRPC call");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AtprotoError::InvalidResponse("retry exhausted".into())))
    }

    /// Upload an image blob.
    ///
    /// Returns the opaque blob reference to echo into a post embed.
    pub async fn upload_blob(
        &self,
        data: &[u8],
        mime_type: &str,
    ) -> Result<MediaRef, AtprotoError> {
        if !ALLOWED_MIME_TYPES.contains(&mime_type) {
            return Err(AtprotoError::InvalidMimeType(mime_type.to_string()));
        }
        if data.len() > MAX_BLOB_SIZE {
            return Err(AtprotoError::BlobTooLarge {
                size: data.len(),
                max: MAX_BLOB_SIZE,
            });
        }

        let url = format!("{}/xrpc/com.atproto.repo.uploadBlob", self.pds_url);
        let uploaded: UploadBlobResponse = self
            .send_xrpc("upload_blob", |token| {
                self.http
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", token))
                    .header("Content-Type", mime_type)
                    .body(data.to_vec())
            })
            .await?;

        debug!(size = data.len(), mime_type, "uploaded blob");
        Ok(MediaRef(uploaded.blob))
    }

    /// Create a post record, optionally carrying an image embed.
    ///
    /// Returns the AT URI and CID of the new post.
    pub async fn create_post(
        &self,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<PostRef, AtprotoError> {
        let did = self
            .did()
            .await
            .ok_or_else(|| AtprotoError::Auth("not authenticated".to_string()))?;

        let mut record = serde_json::json!({
            "$type": POST_COLLECTION,
            "text": text,
            "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        if let Some(image) = image {
            record["embed"] = serde_json::json!({
                "$type": "app.bsky.embed.images",
                "images": [{
                    "alt": image.alt,
                    "image": image.blob,
                }],
            });
        }

        #[derive(Serialize)]
        struct CreateRequest<'a> {
            repo: &'a str,
            collection: &'a str,
            record: serde_json::Value,
        }

        let url = format!("{}/xrpc/com.atproto.repo.createRecord", self.pds_url);
        let request_body = CreateRequest {
            repo: &did,
            collection: POST_COLLECTION,
            record,
        };

        let post: PostRef = self
            .send_xrpc("create_post", |token| {
                self.http
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", token))
                    .json(&request_body)
            })
            .await?;

        debug!(uri = %post.uri, "created post record");
        Ok(post)
    }
}

/// Parse a session out of an auth endpoint response.
///
/// Non-2xx responses become [`AtprotoError::Auth`] tagged with `action`.
async fn read_session(
    response: reqwest::Response,
    action: &str,
) -> Result<Session, AtprotoError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AtprotoError::Auth(format!(
                "{} failed ({}): error body unreadable: {}",
                action, status, e
            ))
        })?;
        return Err(AtprotoError::Auth(format!(
            "{} failed ({}): {}",
            action, status, text
        )));
    }

    Ok(response.json().await?)
}

/// Map an XRPC response to parsed JSON or a typed error.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AtprotoError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        return Err(AtprotoError::RateLimited { retry_after_secs });
    }

    let text = response.text().await.map_err(|e| {
        AtprotoError::InvalidResponse(format!("error body unreadable ({}): {}", status, e))
    })?;

    // XRPC failures carry a structured body; anything else passes through raw.
    match serde_json::from_str::<XrpcError>(&text) {
        Ok(xrpc) => Err(AtprotoError::Xrpc {
            error: xrpc.error,
            message: xrpc.message,
        }),
        Err(_) => Err(AtprotoError::InvalidResponse(format!(
            "request failed ({}): {}",
            status, text
        ))),
    }
}

/// Structured error body returned by XRPC endpoints.
#[derive(Debug, Deserialize)]
struct XrpcError {
    error: String,
    message: String,
}

/// Body of a successful `com.atproto.repo.uploadBlob` call.
#[derive(Debug, Deserialize)]
struct UploadBlobResponse {
    blob: serde_json::Value,
}
