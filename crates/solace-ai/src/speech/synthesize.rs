//! Speech synthesis through the OpenAI speech API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{TextToSpeech, Voice};
use crate::error::{AiError, Result};
use crate::http_client::{build_http_client, truncate_body};
use crate::llm::DEFAULT_OPENAI_BASE_URL;

pub const DEFAULT_TTS_MODEL: &str = "gpt-4o-mini-tts";

pub const DEFAULT_SPEAKING_INSTRUCTIONS: &str =
    "speak in a calm, empathetic, emotionally intelligent listener";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: Voice,
    input: &'a str,
    response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

/// Text-to-speech client returning WAV audio
#[derive(Clone)]
pub struct OpenAISpeech {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    voice: Voice,
    instructions: Option<String>,
}

impl OpenAISpeech {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_TTS_MODEL.to_string(),
            voice: Voice::default(),
            instructions: Some(DEFAULT_SPEAKING_INSTRUCTIONS.to_string()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    /// Speaking-style instructions; empty disables them.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();
        self.instructions = (!instructions.trim().is_empty()).then_some(instructions);
        self
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }
}

#[async_trait]
impl TextToSpeech for OpenAISpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.model,
            voice: self.voice,
            input: text,
            response_format: "wav",
            instructions: self.instructions.as_deref(),
        };

        debug!(voice = %self.voice, chars = text.len(), "Synthesizing speech");
        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Speech(format!("Speech request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(response.text().await.unwrap_or_default());
            return Err(AiError::Speech(format!(
                "Speech API error ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(AiError::Speech("Speech API returned no audio".to_string()));
        }
        Ok(audio.to_vec())
    }
}
