//! OpenAI image generation client implementation.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::OpenAiError;

/// Default API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default image model.
const DEFAULT_MODEL: &str = "dall-e-3";

/// Default image dimensions.
const DEFAULT_SIZE: &str = "1024x1024";

/// Client for the OpenAI image generation API.
pub struct ImageClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    size: String,
}

impl ImageClient {
    /// Create a new client with the default endpoint, model, and size.
    pub fn new(api_key: impl Into<String>) -> Self {
        // Image generation is slow; allow well over the usual request timeout.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            size: DEFAULT_SIZE.to_string(),
        }
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the image model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the image dimensions.
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Generate one image for the prompt, returning the raw PNG bytes.
    pub async fn generate(&self, prompt: &str) -> Result<Vec<u8>, OpenAiError> {
        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            n: u8,
            size: &'a str,
            response_format: &'a str,
        }

        let url = format!("{}/v1/images/generations", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                n: 1,
                size: &self.size,
                response_format: "b64_json",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok());
                return Err(OpenAiError::RateLimited { retry_after_secs });
            }

            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body));
        }

        let body: GenerateResponse = response.json().await?;
        let image = body
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| {
                OpenAiError::InvalidResponse("no image data in response".to_string())
            })?;

        let bytes = BASE64.decode(image.as_bytes())?;
        debug!(image_bytes = bytes.len(), "generated image");
        Ok(bytes)
    }

    /// Map a failed HTTP response to a typed error.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> OpenAiError {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 => OpenAiError::Auth(message),
            _ => OpenAiError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl std::fmt::Debug for ImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("size", &self.size)
            .finish()
    }
}

/// Pull a human-readable message out of an OpenAI error body.
///
/// Falls back to the raw body when it is not the usual
/// `{"error": {"message": ...}}` shape.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    b64_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ImageClient {
        ImageClient::new("sk-test-key").with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(header("Authorization", "Bearer sk-test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "dall-e-3",
                "prompt": "a quiet harbor at dawn",
                "n": 1,
                "size": "1024x1024",
                "response_format": "b64_json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "b64_json": BASE64.encode(b"fake png bytes") }]
            })))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let bytes = client.generate("a quiet harbor at dawn").await.unwrap();

        assert_eq!(bytes, b"fake png bytes");
    }

    #[tokio::test]
    async fn test_generate_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Invalid API key" }
            })))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let err = client.generate("anything").await.unwrap_err();

        match err {
            OpenAiError::Auth(message) => assert_eq!(message, "Invalid API key"),
            other => panic!("expected Auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let err = client.generate("anything").await.unwrap_err();

        match err {
            OpenAiError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let err = client.generate("anything").await.unwrap_err();

        assert!(matches!(
            err,
            OpenAiError::RateLimited {
                retry_after_secs: Some(30)
            }
        ));
    }

    #[tokio::test]
    async fn test_generate_empty_data() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&mock_server)
            .await;

        let client = test_client(&mock_server);
        let err = client.generate("anything").await.unwrap_err();

        assert!(matches!(err, OpenAiError::InvalidResponse(_)));
    }

    #[test]
    fn test_map_http_error_401() {
        let err = ImageClient::map_http_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Invalid API key"}}"#,
        );
        assert!(matches!(err, OpenAiError::Auth(_)));
    }

    #[test]
    fn test_map_http_error_500() {
        let err = ImageClient::map_http_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
        );
        assert!(matches!(err, OpenAiError::Api { status: 500, .. }));
    }

    #[test]
    fn test_extract_error_message_fallback() {
        assert_eq!(extract_error_message("not json"), "not json");
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"boom"}}"#),
            "boom"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let client = ImageClient::new("sk-test")
            .with_base_url("http://localhost:1234")
            .with_model("gpt-image-1")
            .with_size("512x512");

        assert_eq!(client.base_url, "http://localhost:1234");
        assert_eq!(client.model, "gpt-image-1");
        assert_eq!(client.size, "512x512");
    }

    #[test]
    fn test_debug_omits_api_key() {
        let client = ImageClient::new("sk-very-secret");
        let debug = format!("{:?}", client);

        assert!(!debug.contains("sk-very-secret"));
    }
}
