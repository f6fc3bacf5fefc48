//! Speech recognition through the OpenAI transcription API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{Recognition, SpeechToText};
use crate::error::{AiError, Result};
use crate::http_client::{build_http_client, truncate_body};
use crate::llm::DEFAULT_OPENAI_BASE_URL;

pub const DEFAULT_STT_MODEL: &str = "whisper-1";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Whisper-style transcription client
#[derive(Clone)]
pub struct OpenAITranscriber {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    language: Option<String>,
}

impl OpenAITranscriber {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_STT_MODEL.to_string(),
            language: None,
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

    /// Language hint, e.g. `en`
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    fn format_api_error(status: StatusCode, error_text: &str) -> String {
        match status {
            StatusCode::UNAUTHORIZED => "Invalid API key. Check OPENAI_API_KEY.".to_string(),
            StatusCode::TOO_MANY_REQUESTS => "Rate limited, retry later.".to_string(),
            _ => {
                if error_text.trim().is_empty() {
                    format!("Transcription API returned HTTP {}.", status)
                } else {
                    truncate_body(error_text.to_string())
                }
            }
        }
    }
}

#[async_trait]
impl SpeechToText for OpenAITranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Recognition> {
        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(wav)
                    .file_name("speech.wav")
                    .mime_str("audio/wav")?,
            )
            .text("model", self.model.clone())
            .text("response_format", "json");

        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AiError::Speech(format!("Transcription request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::Speech(format!(
                "Transcription failed: {}",
                Self::format_api_error(status, &error_text)
            )));
        }

        let body: TranscriptionResponse = response.json().await.map_err(|_| {
            AiError::InvalidFormat(
                "Transcription API returned an unexpected response format".to_string(),
            )
        })?;

        let text = body.text.trim();
        if text.is_empty() {
            Ok(Recognition::Unrecognized)
        } else {
            Ok(Recognition::Text(text.to_string()))
        }
    }
}
