//! Speech I/O - microphone capture, recognition, synthesis and playback
//!
//! Every stage sits behind a trait so sessions can run against scripted
//! doubles:
//! - `AudioInput` captures one gated phrase from a microphone
//! - `SpeechToText` turns WAV bytes into a `Recognition`
//! - `TextToSpeech` turns reply text into WAV bytes
//! - `AudioOutput` plays WAV bytes to completion

mod device;
mod gate;
mod synthesize;
#[cfg(any(test, feature = "test-utils"))]
mod testing;
mod transcribe;
mod wav;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AiError, Result};

pub use device::{Microphone, Speaker};
pub use gate::{GateEvent, PhraseGate};
pub use synthesize::{DEFAULT_SPEAKING_INSTRUCTIONS, DEFAULT_TTS_MODEL, OpenAISpeech};
#[cfg(any(test, feature = "test-utils"))]
pub use testing::{RecordingSpeaker, RecordingSynthesizer, ScriptedMicrophone, ScriptedTranscriber};
pub use transcribe::{DEFAULT_STT_MODEL, OpenAITranscriber};
pub use wav::{decode_wav, encode_wav, wav_duration};

/// Capture sample rate; matches what the hosted recognizer prefers.
pub const SAMPLE_RATE: u32 = 16_000;

/// Outcome of one recognition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    Text(String),
    /// Nothing was said before the listen timeout.
    NoSpeech,
    /// Audio was captured but could not be understood.
    Unrecognized,
}

/// Synthesizer voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    #[default]
    Nova,
    Shimmer,
    Coral,
    Sage,
}

impl Voice {
    pub const ALL: [Voice; 8] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
        Voice::Coral,
        Voice::Sage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
            Voice::Coral => "coral",
            Voice::Sage => "sage",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Voice::ALL
            .into_iter()
            .find(|voice| voice.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = Voice::ALL.iter().map(Voice::as_str).collect();
                AiError::Speech(format!(
                    "unknown voice '{}', expected one of: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Microphone listening parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenConfig {
    /// Give up if no speech starts within this time
    pub timeout: Duration,
    /// Maximum length of one phrase
    pub phrase_time_limit: Duration,
    /// Trailing silence that ends a phrase
    pub pause_threshold: Duration,
    /// Ambient noise sampled before listening to set the energy threshold
    pub ambient_calibration: Duration,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            phrase_time_limit: Duration::from_secs(10),
            pause_threshold: Duration::from_secs(2),
            ambient_calibration: Duration::from_millis(500),
        }
    }
}

/// Mono 16-bit PCM phrase captured from a microphone.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl CapturedAudio {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Captures one phrase; `None` when nobody spoke before the timeout.
#[async_trait]
pub trait AudioInput: Send + Sync {
    async fn capture(&self, config: &ListenConfig) -> Result<Option<CapturedAudio>>;
}

/// Plays WAV audio, returning once playback finished.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, wav: Vec<u8>) -> Result<()>;
}

/// Hosted speech recognizer.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Recognition>;
}

/// Hosted speech synthesizer.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Microphone, recognizer, synthesizer and speaker wired together.
#[derive(Clone)]
pub struct SpeechIo {
    input: Option<Arc<dyn AudioInput>>,
    output: Option<Arc<dyn AudioOutput>>,
    stt: Arc<dyn SpeechToText>,
    tts: Arc<dyn TextToSpeech>,
    listen_config: ListenConfig,
}

impl SpeechIo {
    pub fn new(stt: Arc<dyn SpeechToText>, tts: Arc<dyn TextToSpeech>) -> Self {
        Self {
            input: None,
            output: None,
            stt,
            tts,
            listen_config: ListenConfig::default(),
        }
    }

    pub fn with_input(mut self, input: Arc<dyn AudioInput>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_listen_config(mut self, config: ListenConfig) -> Self {
        self.listen_config = config;
        self
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Listen for one phrase and recognize it.
    pub async fn listen(&self) -> Result<Recognition> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| AiError::Audio("no microphone attached".to_string()))?;

        let Some(audio) = input.capture(&self.listen_config).await? else {
            debug!("No speech before listen timeout");
            return Ok(Recognition::NoSpeech);
        };
        if audio.samples.is_empty() {
            return Ok(Recognition::NoSpeech);
        }

        debug!(
            duration_ms = audio.duration().as_millis() as u64,
            "Captured phrase"
        );
        let wav = encode_wav(&audio.samples, audio.sample_rate)?;
        let recognition = self.stt.transcribe(wav).await?;
        if let Recognition::Text(text) = &recognition {
            info!(chars = text.len(), "Recognized speech");
        }
        Ok(recognition)
    }

    /// Synthesize `text` and play it to completion. No-op without a speaker.
    pub async fn speak(&self, text: &str) -> Result<()> {
        let Some(output) = &self.output else {
            return Ok(());
        };
        if text.trim().is_empty() {
            return Ok(());
        }

        let wav = self.tts.synthesize(text).await?;
        if let Ok(duration) = wav_duration(&wav) {
            debug!(duration_ms = duration.as_millis() as u64, "Playing reply");
        }
        output.play(wav).await
    }
}
