//! Model catalog retrieval and normalization.
//!
//! The `/models` endpoints answer in one of three shapes: a plain array of
//! names, an array of objects, or `{"models": [...]}`. Everything is
//! normalized into [`TextModel`] / [`ImageModel`] so callers never branch
//! on the raw shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{ApiError, PollinationsClient};

fn default_true() -> bool {
    true
}

fn default_name() -> String {
    "unknown".to_string()
}

fn default_max_input_tokens() -> u64 {
    128_000
}

fn default_tier() -> String {
    "standard".to_string()
}

fn default_text_types() -> Vec<String> {
    vec!["text".to_string()]
}

fn default_max_dim() -> u32 {
    2048
}

fn default_min_dim() -> u32 {
    256
}

fn default_image_formats() -> Vec<String> {
    vec!["jpg".to_string(), "png".to_string()]
}

/// Normalized text model schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextModel {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: u64,
    #[serde(default)]
    pub reasoning_capable: bool,
    #[serde(default = "default_tier")]
    pub tier: String,
    #[serde(default)]
    pub community_supported: bool,
    #[serde(default = "default_text_types")]
    pub input_types: Vec<String>,
    #[serde(default = "default_text_types")]
    pub output_types: Vec<String>,
    #[serde(default)]
    pub tool_use: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub vision: bool,
    #[serde(default)]
    pub audio: bool,
    #[serde(default)]
    pub voices: Vec<String>,
    #[serde(default = "default_true")]
    pub system_messages_supported: bool,
    #[serde(default)]
    pub uncensored: bool,
}

impl TextModel {
    /// Build the schema from a bare model name, inferring capabilities the
    /// way the API's naming conventions imply them.
    fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let audio = lower.contains("audio");
        Self {
            name: name.to_string(),
            description: format!("{name} text generation model"),
            max_input_tokens: default_max_input_tokens(),
            reasoning_capable: lower.contains("reasoning"),
            tier: default_tier(),
            community_supported: false,
            input_types: default_text_types(),
            output_types: default_text_types(),
            tool_use: lower.contains("openai"),
            aliases: Vec::new(),
            vision: lower.contains("vision")
                || matches!(lower.as_str(), "openai" | "openai-large" | "claude-hybridspace"),
            audio,
            voices: if audio {
                ["alloy", "echo", "fable", "onyx", "nova", "shimmer"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            } else {
                Vec::new()
            },
            system_messages_supported: true,
            uncensored: false,
        }
    }
}

/// Normalized image model schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageModel {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub style_tags: Vec<String>,
    #[serde(default = "default_max_dim")]
    pub max_width: u32,
    #[serde(default = "default_max_dim")]
    pub max_height: u32,
    #[serde(default = "default_min_dim")]
    pub min_width: u32,
    #[serde(default = "default_min_dim")]
    pub min_height: u32,
    #[serde(default = "default_image_formats")]
    pub supported_formats: Vec<String>,
    #[serde(default)]
    pub supports_img2img: bool,
    #[serde(default = "default_true")]
    pub supports_seed: bool,
    #[serde(default = "default_true")]
    pub supports_enhancement: bool,
}

impl ImageModel {
    /// Build the schema from a bare model name, filling in the known
    /// characteristics of the first-party models.
    fn from_name(name: &str) -> Self {
        let (description, style_tags, max_dim, supports_img2img): (&str, &[&str], u32, bool) =
            match name {
                "flux" => (
                    "High-quality image generation model",
                    &["photorealistic", "artistic", "detailed"],
                    2048,
                    false,
                ),
                "turbo" => (
                    "Fast image generation model",
                    &["quick", "artistic"],
                    1024,
                    false,
                ),
                "kontext" => (
                    "Image-to-image transformation model",
                    &["transformation", "editing"],
                    2048,
                    true,
                ),
                _ => ("", &["general"], 2048, false),
            };

        Self {
            name: name.to_string(),
            description: if description.is_empty() {
                format!("{name} image model")
            } else {
                description.to_string()
            },
            style_tags: style_tags.iter().map(|s| s.to_string()).collect(),
            max_width: max_dim,
            max_height: max_dim,
            min_width: default_min_dim(),
            min_height: default_min_dim(),
            supported_formats: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            supports_img2img,
            supports_seed: true,
            supports_enhancement: true,
        }
    }
}

/// The raw shapes the `/models` endpoints produce.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawModelList {
    List(Vec<RawModel>),
    Wrapped { models: Vec<RawModel> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawModel {
    Name(String),
    Object(Value),
}

fn raw_models(value: Value) -> Vec<RawModel> {
    match serde_json::from_value::<RawModelList>(value) {
        Ok(RawModelList::List(models)) | Ok(RawModelList::Wrapped { models }) => models,
        Err(_) => Vec::new(),
    }
}

fn normalize_text_models(value: Value) -> Vec<TextModel> {
    raw_models(value)
        .into_iter()
        .filter_map(|model| match model {
            RawModel::Name(name) => Some(TextModel::from_name(&name)),
            RawModel::Object(obj) => serde_json::from_value(obj).ok(),
        })
        .collect()
}

fn normalize_image_models(value: Value) -> Vec<ImageModel> {
    raw_models(value)
        .into_iter()
        .filter_map(|model| match model {
            RawModel::Name(name) => Some(ImageModel::from_name(&name)),
            RawModel::Object(obj) => serde_json::from_value(obj).ok(),
        })
        .collect()
}

/// Catalog queries against both endpoints.
pub struct ModelCatalog {
    client: PollinationsClient,
}

impl ModelCatalog {
    pub fn new(client: PollinationsClient) -> Self {
        Self { client }
    }

    /// List text models, normalized.
    pub async fn text_models(&self) -> Result<Vec<TextModel>, ApiError> {
        let raw = self.text_models_raw().await?;
        Ok(normalize_text_models(raw))
    }

    /// List image models, normalized.
    pub async fn image_models(&self) -> Result<Vec<ImageModel>, ApiError> {
        let raw = self.image_models_raw().await?;
        Ok(normalize_image_models(raw))
    }

    /// List text models in whatever shape the API answered with.
    pub async fn text_models_raw(&self) -> Result<Value, ApiError> {
        let url = self.client.text_endpoint()?.segment("models").build()?;
        self.client.get_json(url).await
    }

    /// List image models in whatever shape the API answered with.
    pub async fn image_models_raw(&self) -> Result<Value, ApiError> {
        let url = self.client.image_endpoint()?.segment("models").build()?;
        self.client.get_json(url).await
    }
}
