//! Text generation module: completions, chat, and SSE streaming.

mod generate;
mod stream;

pub use generate::{
    check_safety, redact_sensitive, ChatOptions, ChatResponse, MessageBuilder, SafetyCheck,
    TextGenerator, TextRequest, DEFAULT_TEXT_MODEL,
};
pub use stream::{StreamSummary, TextStream, TextStreamer};

pub(crate) use generate::message_content;
