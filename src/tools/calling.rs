//! Function-calling chat loop.
//!
//! Sends the tool declarations with a chat request, executes any
//! `tool_calls` the model answers with, appends the results as `tool`
//! messages and re-sends, until the model produces a plain answer or the
//! round budget runs out.

use serde_json::{json, Value};

use super::registry::ToolRegistry;
use crate::http::{ApiError, PollinationsClient};
use crate::text::{ChatOptions, MessageBuilder};

/// Upper bound on request/execute rounds for one conversation turn.
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Outcome of a tool-augmented chat turn.
#[derive(Debug, Clone)]
pub struct ToolChatResult {
    /// Final assistant answer.
    pub content: String,
    /// Chat rounds used (1 = no tool was called).
    pub rounds: usize,
    /// Names of the tools executed, in call order.
    pub tools_used: Vec<String>,
    /// Final raw response.
    pub raw: Value,
}

/// Chat with tool use over the OpenAI-compatible endpoint.
pub struct FunctionCalling {
    client: PollinationsClient,
    registry: ToolRegistry,
    max_rounds: usize,
}

impl FunctionCalling {
    pub fn new(client: PollinationsClient) -> Self {
        Self {
            client,
            registry: ToolRegistry::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one conversation turn, executing tool calls as they come back.
    pub async fn run(&self, messages: &[Value], options: &ChatOptions) -> Result<ToolChatResult, ApiError> {
        let url = self.client.text_endpoint()?.segment("openai").build()?;
        let mut messages = messages.to_vec();
        let mut tools_used = Vec::new();

        for round in 1..=self.max_rounds {
            let mut payload = options.build_payload(&messages, false);
            if let Value::Object(map) = &mut payload {
                map.insert("tools".to_string(), json!(self.registry.schemas()));
                map.insert("tool_choice".to_string(), json!("auto"));
            }

            let raw = self.client.post_json(url.clone(), payload).await?;
            let message = raw["choices"]
                .get(0)
                .and_then(|choice| choice.get("message"))
                .cloned()
                .ok_or_else(|| ApiError::Parse("no choices in response".to_string()))?;

            let tool_calls = message["tool_calls"].as_array().cloned().unwrap_or_default();
            if tool_calls.is_empty() {
                let content = message["content"].as_str().unwrap_or_default().to_string();
                return Ok(ToolChatResult {
                    content,
                    rounds: round,
                    tools_used,
                    raw,
                });
            }

            // Echo the assistant's tool-call message back, then answer
            // each call with a tool message.
            messages.push(message.clone());
            for call in &tool_calls {
                let id = call["id"].as_str().unwrap_or_default();
                let name = call["function"]["name"].as_str().unwrap_or_default();
                let args: Value = call["function"]["arguments"]
                    .as_str()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or_else(|| json!({}));

                tools_used.push(name.to_string());
                let content = match self.registry.dispatch(name, &args) {
                    Ok(result) => result.to_string(),
                    // Feed the failure back so the model can recover.
                    Err(e) => json!({ "error": e.to_string() }).to_string(),
                };
                tracing::debug!(tool = name, round, "executed tool call");
                messages.push(MessageBuilder::tool_result(id, name, &content));
            }
        }

        Err(ApiError::InvalidRequest(format!(
            "tool-call loop exceeded {} rounds",
            self.max_rounds
        )))
    }
}
