use async_trait::async_trait;
use cadence_atproto::{AtprotoClient, ImageAttachment, PostRef};
use cadence_openai::ImageClient;
use tracing::{debug, warn};

use crate::error::PublishError;

/// Alt text attached to generated illustrations.
const IMAGE_ALT: &str = "AI-generated illustration for this post";

/// MIME type of images returned by the generation API.
const GENERATED_IMAGE_MIME: &str = "image/png";

/// Longest slice of post text folded into an illustration prompt.
const MAX_PROMPT_CHARS: usize = 300;

/// A sink the scheduler can hand finished posts to.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<PostRef, PublishError>;
}

/// Publishes posts to an ATProto PDS, illustrating them first when an
/// image client is configured.
///
/// Illustration is strictly best-effort: any failure while generating or
/// uploading the image downgrades the post to text-only rather than
/// failing the slot.
pub struct PostPublisher {
    atproto: AtprotoClient,
    imagegen: Option<ImageClient>,
}

impl PostPublisher {
    pub fn new(atproto: AtprotoClient) -> Self {
        Self {
            atproto,
            imagegen: None,
        }
    }

    pub fn with_imagegen(mut self, imagegen: ImageClient) -> Self {
        self.imagegen = Some(imagegen);
        self
    }

    /// Generates and uploads an illustration for the post, if possible.
    ///
    /// Returns `None` when no image client is configured or when any step
    /// fails. Failures are logged and swallowed here so `publish` never
    /// loses a post to its illustration.
    async fn illustrate(&self, text: &str) -> Option<ImageAttachment> {
        let imagegen = self.imagegen.as_ref()?;

        let prompt = illustration_prompt(text);
        let image = match imagegen.generate(&prompt).await {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "image generation failed, posting text-only");
                return None;
            }
        };

        debug!(bytes = image.len(), "generated illustration");

        match self.atproto.upload_blob(&image, GENERATED_IMAGE_MIME).await {
            Ok(blob) => Some(ImageAttachment {
                blob,
                alt: IMAGE_ALT.to_string(),
            }),
            Err(e) => {
                warn!(error = %e, "image upload failed, posting text-only");
                None
            }
        }
    }
}

#[async_trait]
impl Publisher for PostPublisher {
    async fn publish(&self, text: &str) -> Result<PostRef, PublishError> {
        let image = self.illustrate(text).await;
        let post = self.atproto.create_post(text, image.as_ref()).await?;

        Ok(post)
    }
}

/// Builds the image-generation prompt for a post, truncating long text on
/// a character boundary.
fn illustration_prompt(text: &str) -> String {
    let excerpt = if text.chars().count() <= MAX_PROMPT_CHARS {
        text.to_string()
    } else {
        format!(
            "{}...",
            text.chars().take(MAX_PROMPT_CHARS).collect::<String>()
        )
    };

    format!(
        "A minimal, atmospheric illustration inspired by this post, \
         with no text or lettering in the image: {excerpt}"
    )
}
