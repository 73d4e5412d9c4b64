//! # PolliLib
//!
//! Rust client library for the Pollinations.AI generative media API:
//! text generation, image generation, vision, speech, model retrieval and
//! function calling.
//!
//! All requests go through [`PollinationsClient`], which handles
//! authentication (referrer or bearer token), per-attempt timeouts and
//! exponential-backoff retries with `Retry-After` support. The feature
//! modules are thin, stateless consumers of that client.
//!
//! ## Text generation
//!
//! ```rust,no_run
//! use pollilib::{ClientConfig, PollinationsClient, TextGenerator, TextRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PollinationsClient::new(ClientConfig::from_env());
//!     let text = TextGenerator::new(client);
//!
//!     let request = TextRequest::new("What is the capital of France?")
//!         .with_temperature(0.3);
//!     let answer = text.generate(&request).await?;
//!
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```
//!
//! ## Image generation
//!
//! ```rust,no_run
//! use pollilib::{ImageGenerator, ImageRequest, PollinationsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let generator = ImageGenerator::new(PollinationsClient::with_defaults());
//!
//!     let request = ImageRequest::new("a serene mountain landscape at sunrise")
//!         .with_size(1280, 720)
//!         .with_seed(42);
//!     let image = generator.generate(&request).await?;
//!     image.save("mountain_landscape").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod http;
pub mod image;
pub mod models;
pub mod text;
pub mod tools;
pub mod vision;

pub use http::{
    exponential_backoff, ApiError, ClientConfig, PollinationsClient, RequestBody, RequestOptions,
    Timeout, UrlBuilder, DEFAULT_MAX_RETRIES, DEFAULT_REFERRER, DEFAULT_TIMEOUT, IMAGE_API,
    TEXT_API,
};

pub use audio::{SpeechAudio, SpeechSynthesizer, Transcriber, Transcription, Voice, AUDIO_MODEL};
pub use image::{
    GeneratedImage, ImageFormat, ImageGenerator, ImageRequest, ImageTransformer, TransformRequest,
    TransformStrength, DEFAULT_IMAGE_MODEL, TRANSFORM_MODEL,
};
pub use models::{ImageModel, ModelCatalog, TextModel};
pub use text::{
    ChatOptions, ChatResponse, MessageBuilder, SafetyCheck, StreamSummary, TextGenerator,
    TextRequest, TextStream, TextStreamer, DEFAULT_TEXT_MODEL,
};
pub use tools::{FunctionCalling, ToolChatResult, ToolError, ToolRegistry};
pub use vision::{VisionAnalyzer, VisionRequest, VISION_MODELS};
