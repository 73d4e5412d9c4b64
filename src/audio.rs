//! Text-to-speech and speech-to-text over the `openai-audio` model.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde_json::Value;

use crate::http::{ApiError, PollinationsClient, RequestOptions};
use crate::text::MessageBuilder;

/// Audio model name on the text endpoint.
pub const AUDIO_MODEL: &str = "openai-audio";

/// Transcription requests carry audio payloads and run longer.
const TRANSCRIBE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// The fixed voice set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Voice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    #[default]
    Nova,
    Shimmer,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Voice::Alloy => "Neutral, professional voice",
            Voice::Echo => "Deep, resonant voice",
            Voice::Fable => "Storyteller vibe voice",
            Voice::Onyx => "Warm, rich voice",
            Voice::Nova => "Bright, friendly voice",
            Voice::Shimmer => "Soft, melodic voice",
        }
    }
}

impl FromStr for Voice {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alloy" => Ok(Voice::Alloy),
            "echo" => Ok(Voice::Echo),
            "fable" => Ok(Voice::Fable),
            "onyx" => Ok(Voice::Onyx),
            "nova" => Ok(Voice::Nova),
            "shimmer" => Ok(Voice::Shimmer),
            other => Err(ApiError::InvalidRequest(format!(
                "invalid voice {other:?}, choose from: alloy, echo, fable, onyx, nova, shimmer"
            ))),
        }
    }
}

/// Generated speech audio.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub data: Bytes,
    pub voice: Voice,
    pub content_type: Option<String>,
}

impl SpeechAudio {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Write the audio to disk, appending `.mp3` when the path has no
    /// audio extension. Returns the path actually written.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf, ApiError> {
        let ext = match self.content_type.as_deref() {
            Some(ct) if ct.contains("wav") => "wav",
            _ => "mp3",
        };
        let path = crate::image::with_extension(path.as_ref(), ext, &["mp3", "wav"]);
        tokio::fs::write(&path, &self.data).await?;
        Ok(path)
    }
}

/// A transcription result.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub format: String,
    pub raw: Value,
}

/// Text-to-speech generation.
pub struct SpeechSynthesizer {
    client: PollinationsClient,
}

impl SpeechSynthesizer {
    pub fn new(client: PollinationsClient) -> Self {
        Self { client }
    }

    /// Generate speech audio for a text.
    pub async fn generate(&self, text: &str, voice: Voice) -> Result<SpeechAudio, ApiError> {
        let url = self
            .client
            .text_endpoint()?
            .segment(text)
            .query("model", AUDIO_MODEL)
            .query("voice", voice.as_str())
            .build()?;

        let (data, content_type) = self.client.get_bytes(url, RequestOptions::get()).await?;
        Ok(SpeechAudio {
            data,
            voice,
            content_type,
        })
    }

    /// Generate the same text with several voices for comparison. Failed
    /// voices stay in the result list.
    pub async fn generate_voices(
        &self,
        text: &str,
        voices: &[Voice],
    ) -> Vec<(Voice, Result<SpeechAudio, ApiError>)> {
        let mut results = Vec::with_capacity(voices.len());
        for &voice in voices {
            results.push((voice, self.generate(text, voice).await));
        }
        results
    }
}

/// Speech-to-text transcription.
pub struct Transcriber {
    client: PollinationsClient,
}

impl Transcriber {
    pub fn new(client: PollinationsClient) -> Self {
        Self { client }
    }

    /// Transcribe an audio file. `format` is the container format the API
    /// expects, e.g. "wav" or "mp3".
    pub async fn transcribe_file(&self, path: impl AsRef<Path>, format: &str) -> Result<Transcription, ApiError> {
        let data = tokio::fs::read(path.as_ref()).await?;
        self.transcribe(&data, format).await
    }

    /// Transcribe raw audio bytes.
    pub async fn transcribe(&self, audio: &[u8], format: &str) -> Result<Transcription, ApiError> {
        let url = self.client.text_endpoint()?.segment("openai").build()?;
        let payload = serde_json::json!({
            "model": AUDIO_MODEL,
            "messages": [MessageBuilder::user_with_audio(
                "Transcribe this audio:",
                &BASE64.encode(audio),
                format,
            )],
        });

        let response = self
            .client
            .execute(url, RequestOptions::post_json(payload).timeout(TRANSCRIBE_TIMEOUT))
            .await?;
        let raw: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        let text = crate::text::message_content(&raw)?;
        Ok(Transcription {
            text,
            format: format.to_string(),
            raw,
        })
    }
}
