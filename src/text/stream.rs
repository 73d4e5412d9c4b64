//! Streaming chat over Server-Sent Events.
//!
//! The `/openai` endpoint emits `data:` lines carrying OpenAI-shaped delta
//! chunks, terminated by `data: [DONE]`. [`TextStream`] is a pull parser
//! over the raw byte stream; the attempt timeout is disabled for the
//! duration of the stream.

use std::time::Instant;

use reqwest::header::{HeaderValue, ACCEPT};
use serde_json::Value;

use super::generate::ChatOptions;
use crate::http::{ApiError, PollinationsClient, RequestOptions};

/// One parsed SSE line.
enum SseEvent {
    /// A content delta chunk.
    Delta(String),
    /// The `[DONE]` terminator.
    Done,
    /// Comment, keep-alive, or an unparseable data line.
    Skip,
}

fn parse_sse_line(line: &str) -> SseEvent {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return SseEvent::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return SseEvent::Skip;
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(value) => value["choices"]
            .get(0)
            .and_then(|choice| choice["delta"]["content"].as_str())
            .map(|s| SseEvent::Delta(s.to_string()))
            .unwrap_or(SseEvent::Skip),
        // Malformed data lines are skipped, not fatal.
        Err(_) => SseEvent::Skip,
    }
}

/// An in-progress streaming response.
pub struct TextStream {
    response: reqwest::Response,
    buffer: Vec<u8>,
    done: bool,
    started: Instant,
}

impl TextStream {
    fn new(response: reqwest::Response, started: Instant) -> Self {
        Self {
            response,
            buffer: Vec::new(),
            done: false,
            started,
        }
    }

    /// Pull the next content chunk, or `None` when the stream is finished.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, ApiError> {
        loop {
            if self.done {
                return Ok(None);
            }

            // Drain complete lines already buffered. Line boundaries are
            // single bytes, so multi-byte characters never straddle them.
            while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                match parse_sse_line(&line) {
                    SseEvent::Delta(content) => return Ok(Some(content)),
                    SseEvent::Done => {
                        self.done = true;
                        return Ok(None);
                    }
                    SseEvent::Skip => {}
                }
            }

            match self.response.chunk().await? {
                Some(bytes) => self.buffer.extend_from_slice(&bytes),
                None => {
                    // Stream ended without [DONE]; flush any trailing line.
                    self.done = true;
                    if !self.buffer.is_empty() {
                        let line = String::from_utf8_lossy(&std::mem::take(&mut self.buffer)).into_owned();
                        if let SseEvent::Delta(content) = parse_sse_line(&line) {
                            return Ok(Some(content));
                        }
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Drain the stream into a single response string.
    pub async fn collect(mut self) -> Result<StreamSummary, ApiError> {
        let mut response = String::new();
        let mut chunks_received = 0usize;
        while let Some(chunk) = self.next_chunk().await? {
            response.push_str(&chunk);
            chunks_received += 1;
        }
        Ok(StreamSummary {
            response,
            chunks_received,
            duration: self.started.elapsed(),
        })
    }
}

/// Collected result of a finished stream.
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub response: String,
    pub chunks_received: usize,
    /// Wall-clock time since the request was issued, retries included.
    pub duration: std::time::Duration,
}

/// Streaming chat over the OpenAI-compatible endpoint.
pub struct TextStreamer {
    client: PollinationsClient,
}

impl TextStreamer {
    pub fn new(client: PollinationsClient) -> Self {
        Self { client }
    }

    /// Start a streaming chat for the given messages.
    pub async fn stream_chat(&self, messages: &[Value], options: &ChatOptions) -> Result<TextStream, ApiError> {
        let url = self.client.text_endpoint()?.segment("openai").build()?;
        let payload = options.build_payload(messages, true);
        let request = RequestOptions::post_json(payload)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .no_timeout();
        let started = Instant::now();
        let response = self.client.execute(url, request).await?;
        Ok(TextStream::new(response, started))
    }

    /// Start a streaming chat for a single user prompt.
    pub async fn stream_prompt(&self, prompt: &str, options: &ChatOptions) -> Result<TextStream, ApiError> {
        let messages = vec![super::generate::MessageBuilder::user(prompt)];
        self.stream_chat(&messages, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delta_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        match parse_sse_line(line) {
            SseEvent::Delta(content) => assert_eq!(content, "Hel"),
            _ => panic!("expected delta"),
        }
    }

    #[test]
    fn test_parse_done_line() {
        assert!(matches!(parse_sse_line("data: [DONE]"), SseEvent::Done));
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        assert!(matches!(parse_sse_line(": keep-alive"), SseEvent::Skip));
        assert!(matches!(parse_sse_line(""), SseEvent::Skip));
        assert!(matches!(parse_sse_line("event: ping"), SseEvent::Skip));
    }

    #[test]
    fn test_malformed_data_skipped() {
        assert!(matches!(parse_sse_line("data: {not json"), SseEvent::Skip));
        // Valid JSON but no delta content (e.g. role-only first chunk)
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(matches!(parse_sse_line(line), SseEvent::Skip));
    }
}
