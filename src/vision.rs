//! Image-to-text analysis using vision-capable models.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::http::{ApiError, PollinationsClient, RequestOptions};
use crate::text::MessageBuilder;

/// Models that accept image input.
pub const VISION_MODELS: &[&str] = &["openai", "openai-large", "claude-hybridspace"];

/// Vision requests carry image payloads and run longer.
const VISION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Options for an image analysis request.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for VisionRequest {
    fn default() -> Self {
        Self {
            prompt: "What's in this image?".to_string(),
            model: "openai".to_string(),
            max_tokens: 500,
        }
    }
}

impl VisionRequest {
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Image analysis over the OpenAI-compatible endpoint.
pub struct VisionAnalyzer {
    client: PollinationsClient,
}

impl VisionAnalyzer {
    pub fn new(client: PollinationsClient) -> Self {
        Self { client }
    }

    /// Analyze an image reachable at a public URL.
    pub async fn analyze_url(&self, image_url: &str, request: &VisionRequest) -> Result<String, ApiError> {
        self.analyze(image_url, request).await
    }

    /// Analyze a local image file, embedded as a base64 data URL.
    pub async fn analyze_file(&self, path: impl AsRef<Path>, request: &VisionRequest) -> Result<String, ApiError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let mime = mime_for_extension(path)?;
        let data_url = format!("data:{mime};base64,{}", BASE64.encode(data));
        self.analyze(&data_url, request).await
    }

    async fn analyze(&self, image_url: &str, request: &VisionRequest) -> Result<String, ApiError> {
        if !VISION_MODELS.contains(&request.model.as_str()) {
            return Err(ApiError::InvalidRequest(format!(
                "model must be one of: {}",
                VISION_MODELS.join(", ")
            )));
        }

        let url = self.client.text_endpoint()?.segment("openai").build()?;
        let payload = serde_json::json!({
            "model": request.model,
            "messages": [MessageBuilder::user_with_image_url(&request.prompt, image_url)],
            "max_tokens": request.max_tokens,
        });

        let response = self
            .client
            .execute(url, RequestOptions::post_json(payload).timeout(VISION_TIMEOUT))
            .await?;
        let raw: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        crate::text::message_content(&raw)
    }
}

fn mime_for_extension(path: &Path) -> Result<&'static str, ApiError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => Err(ApiError::InvalidRequest(format!(
            "unsupported image extension: {ext:?}"
        ))),
    }
}
