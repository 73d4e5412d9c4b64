//! Text-to-image generation.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::Rng;

use crate::http::{ApiError, PollinationsClient, RequestOptions};

/// Default image model.
pub const DEFAULT_IMAGE_MODEL: &str = "flux";

/// Image requests get a longer attempt budget than text.
pub(crate) const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Output format, inferred from the response content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.contains("png") => ImageFormat::Png,
            _ => ImageFormat::Jpeg,
        }
    }
}

/// Image generation request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    /// Remove the watermark.
    pub nologo: bool,
    /// Let the model improve the prompt automatically.
    pub enhance: bool,
    /// Hide the image from public feeds.
    pub private: bool,
    /// Enable strict NSFW filtering.
    pub safe: bool,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            width: 1024,
            height: 1024,
            seed: None,
            nologo: false,
            enhance: false,
            private: false,
            safe: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
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

    pub fn with_nologo(mut self) -> Self {
        self.nologo = true;
        self
    }

    pub fn with_enhance(mut self) -> Self {
        self.enhance = true;
        self
    }

    pub fn with_private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn with_safe(mut self) -> Self {
        self.safe = true;
        self
    }
}

/// A generated image with its metadata.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub format: ImageFormat,
    pub seed: Option<u64>,
    /// Wall-clock time the request took, retries included.
    pub inference_time: Duration,
}

impl GeneratedImage {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Write the image to disk, appending the format extension when the
    /// path has none. Returns the path actually written.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf, ApiError> {
        let path = with_extension(path.as_ref(), self.format.extension(), &["png", "jpg", "jpeg"]);
        tokio::fs::write(&path, &self.data).await?;
        Ok(path)
    }
}

pub(crate) fn with_extension(path: &Path, default_ext: &str, known: &[&str]) -> PathBuf {
    let has_known_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| known.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if has_known_ext {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(default_ext);
        PathBuf::from(name)
    }
}

/// Text-to-image generation over the Pollinations image endpoint.
pub struct ImageGenerator {
    client: PollinationsClient,
}

impl ImageGenerator {
    pub fn new(client: PollinationsClient) -> Self {
        Self { client }
    }

    /// Generate a single image from a text prompt.
    pub async fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, ApiError> {
        let url = self
            .client
            .image_endpoint()?
            .segment("prompt")
            .segment(&request.prompt)
            .query("model", &request.model)
            .query("width", request.width)
            .query("height", request.height)
            .query_opt("seed", request.seed)
            .flag("nologo", request.nologo)
            .flag("enhance", request.enhance)
            .flag("private", request.private)
            .flag("safe", request.safe)
            .build()?;

        let start = Instant::now();
        let options = RequestOptions::get().timeout(IMAGE_TIMEOUT);
        let (data, content_type) = self.client.get_bytes(url, options).await?;
        let format = ImageFormat::from_content_type(content_type.as_deref());

        tracing::debug!(
            model = %request.model,
            size_bytes = data.len(),
            inference_secs = start.elapsed().as_secs_f64(),
            "image generated"
        );

        Ok(GeneratedImage {
            data,
            content_type,
            format,
            seed: request.seed,
            inference_time: start.elapsed(),
        })
    }

    /// Generate `n` variants of the same prompt with incrementing seeds.
    ///
    /// Failed variants are kept in the result list so callers can see which
    /// seeds succeeded.
    pub async fn generate_variants(
        &self,
        request: &ImageRequest,
        n: u32,
        base_seed: Option<u64>,
    ) -> Vec<Result<GeneratedImage, ApiError>> {
        let base_seed = base_seed.unwrap_or_else(|| rand::thread_rng().gen_range(0..1_000_000));
        let mut variants = Vec::with_capacity(n as usize);
        for i in 0..n {
            let variant = request.clone().with_seed(base_seed + u64::from(i));
            variants.push(self.generate(&variant).await);
        }
        variants
    }
}
