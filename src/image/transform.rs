//! Image-to-image transformation via the `kontext` model.

use std::time::{Duration, Instant};

use crate::http::{ApiError, PollinationsClient, RequestOptions};

use super::generate::{GeneratedImage, ImageFormat};

/// The one model that supports image-to-image.
pub const TRANSFORM_MODEL: &str = "kontext";

/// Transformations run longer than plain generation.
const TRANSFORM_TIMEOUT: Duration = Duration::from_secs(180);

/// How strongly a guidance prompt reshapes the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformStrength {
    Subtle,
    #[default]
    Moderate,
    Strong,
}

impl TransformStrength {
    fn prompt_prefix(&self) -> &'static str {
        match self {
            TransformStrength::Subtle => "slightly modify this image to",
            TransformStrength::Moderate => "transform this image to",
            TransformStrength::Strong => "completely reimagine this image as",
        }
    }
}

/// Image transformation request. The source image is referenced by URL.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub input_image_url: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
}

impl TransformRequest {
    pub fn new(input_image_url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            input_image_url: input_image_url.into(),
            prompt: prompt.into(),
            width: 1024,
            height: 1024,
            seed: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Image-to-image transformation over the Pollinations image endpoint.
pub struct ImageTransformer {
    client: PollinationsClient,
}

impl ImageTransformer {
    pub fn new(client: PollinationsClient) -> Self {
        Self { client }
    }

    /// Transform an existing image according to a prompt.
    pub async fn transform(&self, request: &TransformRequest) -> Result<GeneratedImage, ApiError> {
        if request.input_image_url.is_empty() {
            return Err(ApiError::InvalidRequest("input image URL is empty".to_string()));
        }

        let url = self
            .client
            .image_endpoint()?
            .segment("prompt")
            .segment(&request.prompt)
            .query("model", TRANSFORM_MODEL)
            .query("image", &request.input_image_url)
            .query("width", request.width)
            .query("height", request.height)
            .query_opt("seed", request.seed)
            .build()?;

        let start = Instant::now();
        let options = RequestOptions::get().timeout(TRANSFORM_TIMEOUT);
        let (data, content_type) = self.client.get_bytes(url, options).await?;
        let format = match content_type.as_deref() {
            Some(ct) if ct.contains("png") => ImageFormat::Png,
            _ => ImageFormat::Jpeg,
        };

        Ok(GeneratedImage {
            data,
            content_type,
            format,
            seed: request.seed,
            inference_time: start.elapsed(),
        })
    }

    /// Re-render the source image in a named style.
    pub async fn style_transfer(
        &self,
        input_image_url: &str,
        style: &str,
    ) -> Result<GeneratedImage, ApiError> {
        let prompt = format!("transform this image into a {style} style");
        self.transform(&TransformRequest::new(input_image_url, prompt)).await
    }

    /// Transform the source image following a guidance prompt at the given
    /// strength.
    pub async fn guided(
        &self,
        input_image_url: &str,
        guidance: &str,
        strength: TransformStrength,
    ) -> Result<GeneratedImage, ApiError> {
        let prompt = format!("{} {}", strength.prompt_prefix(), guidance);
        self.transform(&TransformRequest::new(input_image_url, prompt)).await
    }
}
