//! Text generation: single-turn completions and multi-turn chat.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::http::{ApiError, PollinationsClient};

/// Default text model.
pub const DEFAULT_TEXT_MODEL: &str = "openai";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").expect("valid regex"));
static CARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").expect("valid regex"));
static SSN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid regex"));

/// Single-turn generation request.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub seed: Option<u64>,
    pub system: Option<String>,
    pub json_mode: bool,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEFAULT_TEXT_MODEL.to_string(),
            temperature: 0.7,
            seed: None,
            system: None,
            json_mode: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Ask the model to respond in JSON format.
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Options for multi-turn chat against the OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    pub top_p: Option<f64>,
    /// How deeply the model thinks: "minimal", "low", "medium" or "high".
    pub reasoning_effort: Option<String>,
    /// Enable strict NSFW filtering.
    pub safe: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_TEXT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: None,
            stop_sequences: None,
            top_p: None,
            reasoning_effort: None,
            safe: false,
        }
    }
}

impl ChatOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.stop_sequences = Some(stop);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    pub fn with_safe(mut self) -> Self {
        self.safe = true;
        self
    }

    /// Build the request payload for the `/openai` endpoint.
    pub(crate) fn build_payload(&self, messages: &[Value], stream: bool) -> Value {
        let mut payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": stream,
        });
        if let Value::Object(map) = &mut payload {
            if let Some(max_tokens) = self.max_tokens {
                map.insert("max_tokens".to_string(), json!(max_tokens));
            }
            if let Some(stop) = &self.stop_sequences {
                map.insert("stop".to_string(), json!(stop));
            }
            if let Some(top_p) = self.top_p {
                map.insert("top_p".to_string(), json!(top_p));
            }
            if let Some(effort) = &self.reasoning_effort {
                map.insert("reasoning_effort".to_string(), json!(effort));
            }
            if self.safe {
                map.insert("safe".to_string(), json!(true));
            }
        }
        payload
    }
}

/// Result of a basic safety check on generated output.
#[derive(Debug, Clone)]
pub struct SafetyCheck {
    pub safe: bool,
    pub issues: Vec<String>,
}

/// Chat response with the extracted assistant content.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Value,
    pub safety: SafetyCheck,
    pub raw: Value,
}

/// Extract `choices[0].message.content` from an OpenAI-shaped response.
pub(crate) fn message_content(response: &Value) -> Result<String, ApiError> {
    response["choices"]
        .get(0)
        .and_then(|choice| choice["message"]["content"].as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ApiError::Parse("no choices in response".to_string()))
}

/// Helper for building OpenAI-shaped conversation messages.
pub struct MessageBuilder;

impl MessageBuilder {
    pub fn system(content: &str) -> Value {
        json!({ "role": "system", "content": content })
    }

    pub fn user(content: &str) -> Value {
        json!({ "role": "user", "content": content })
    }

    pub fn assistant(content: &str) -> Value {
        json!({ "role": "assistant", "content": content })
    }

    /// A user message with text plus an image, for vision models.
    pub fn user_with_image_url(text: &str, image_url: &str) -> Value {
        json!({
            "role": "user",
            "content": [
                { "type": "text", "text": text },
                { "type": "image_url", "image_url": { "url": image_url } }
            ]
        })
    }

    /// A user message with text plus base64 audio, for transcription.
    pub fn user_with_audio(text: &str, audio_base64: &str, format: &str) -> Value {
        json!({
            "role": "user",
            "content": [
                { "type": "text", "text": text },
                {
                    "type": "input_audio",
                    "input_audio": { "data": audio_base64, "format": format }
                }
            ]
        })
    }

    /// A tool-result message answering a tool call.
    pub fn tool_result(tool_call_id: &str, name: &str, content: &str) -> Value {
        json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "name": name,
            "content": content,
        })
    }
}

/// Text generation over the Pollinations text endpoint.
///
/// Holds an in-memory conversation store keyed by caller-supplied ids;
/// nothing is persisted.
pub struct TextGenerator {
    client: PollinationsClient,
    conversations: HashMap<String, Vec<Value>>,
}

impl TextGenerator {
    pub fn new(client: PollinationsClient) -> Self {
        Self {
            client,
            conversations: HashMap::new(),
        }
    }

    /// Generate text from a simple prompt (single-turn, GET endpoint).
    pub async fn generate(&self, request: &TextRequest) -> Result<String, ApiError> {
        let url = self
            .client
            .text_endpoint()?
            .segment(&request.prompt)
            .query("model", &request.model)
            .query("temperature", request.temperature)
            .query_opt("seed", request.seed)
            .query_opt("system", request.system.as_deref())
            .flag("json", request.json_mode)
            .build()?;

        tracing::debug!(prompt = %redact_sensitive(&request.prompt), model = %request.model, "generating text");

        let response = self.client.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Multi-turn chat against the OpenAI-compatible endpoint.
    pub async fn chat(&self, messages: &[Value], options: &ChatOptions) -> Result<ChatResponse, ApiError> {
        let url = self.client.text_endpoint()?.segment("openai").build()?;
        let payload = options.build_payload(messages, false);
        let raw = self.client.post_json(url, payload).await?;
        let content = message_content(&raw)?;
        let usage = raw.get("usage").cloned().unwrap_or_else(|| json!({}));
        let safety = check_safety(&content);
        Ok(ChatResponse {
            content,
            usage,
            safety,
            raw,
        })
    }

    /// Chat and record the exchange under a conversation id.
    ///
    /// `messages` is the full transcript sent to the API; the stored
    /// history is replaced with it plus the assistant reply, so repeated
    /// calls never duplicate earlier turns.
    pub async fn chat_in(
        &mut self,
        conversation_id: &str,
        messages: &[Value],
        options: &ChatOptions,
    ) -> Result<ChatResponse, ApiError> {
        let response = self.chat(messages, options).await?;
        let mut history = messages.to_vec();
        history.push(MessageBuilder::assistant(&response.content));
        self.conversations
            .insert(conversation_id.to_string(), history);
        Ok(response)
    }

    /// Append a user message to an existing conversation and continue it.
    /// Unknown ids start a fresh conversation.
    pub async fn continue_conversation(
        &mut self,
        conversation_id: &str,
        user_message: &str,
        options: &ChatOptions,
    ) -> Result<ChatResponse, ApiError> {
        let mut messages = self
            .conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default();
        messages.push(MessageBuilder::user(user_message));
        self.chat_in(conversation_id, &messages, options).await
    }

    /// Retrieve conversation history by id.
    pub fn conversation(&self, conversation_id: &str) -> Option<&[Value]> {
        self.conversations.get(conversation_id).map(|v| v.as_slice())
    }

    /// Generate a fresh conversation id.
    pub fn new_conversation_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Redact emails, phone numbers, card numbers and SSNs before logging.
pub fn redact_sensitive(text: &str) -> String {
    let text = EMAIL_RE.replace_all(text, "[EMAIL_REDACTED]");
    let text = PHONE_RE.replace_all(&text, "[PHONE_REDACTED]");
    let text = CARD_RE.replace_all(&text, "[CARD_REDACTED]");
    SSN_RE.replace_all(&text, "[SSN_REDACTED]").into_owned()
}

/// Basic safety check on generated output.
pub fn check_safety(text: &str) -> SafetyCheck {
    let mut issues = Vec::new();
    if EMAIL_RE.is_match(text) {
        issues.push("contains email address".to_string());
    }
    if PHONE_RE.is_match(text) {
        issues.push("contains phone number".to_string());
    }
    if text.len() > 10_000 {
        issues.push("unusually long output".to_string());
    }
    SafetyCheck {
        safe: issues.is_empty(),
        issues,
    }
}
