//! Scripted speech doubles for session tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    AudioInput, AudioOutput, CapturedAudio, ListenConfig, Recognition, SAMPLE_RATE, SpeechToText,
    TextToSpeech, encode_wav,
};
use crate::error::{AiError, Result};

/// Microphone that replays scripted phrases; `None` means silence.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMicrophone {
    phrases: Arc<Mutex<VecDeque<Option<Vec<i16>>>>>,
    captures: Arc<AtomicUsize>,
}

impl ScriptedMicrophone {
    pub fn new(phrases: Vec<Option<Vec<i16>>>) -> Self {
        Self {
            phrases: Arc::new(Mutex::new(phrases.into())),
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A microphone that never hears anything.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioInput for ScriptedMicrophone {
    async fn capture(&self, _config: &ListenConfig) -> Result<Option<CapturedAudio>> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let next = self.phrases.lock().await.pop_front().flatten();
        Ok(next.map(|samples| CapturedAudio {
            samples,
            sample_rate: SAMPLE_RATE,
        }))
    }
}

/// Recognizer that returns scripted results, then `Unrecognized`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTranscriber {
    results: Arc<Mutex<VecDeque<Recognition>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTranscriber {
    pub fn new(results: Vec<Recognition>) -> Self {
        Self {
            results: Arc::new(Mutex::new(results.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for ScriptedTranscriber {
    async fn transcribe(&self, _wav: Vec<u8>) -> Result<Recognition> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .results
            .lock()
            .await
            .pop_front()
            .unwrap_or(Recognition::Unrecognized))
    }
}

/// Synthesizer that records requested texts and returns a short tone.
#[derive(Debug, Clone, Default)]
pub struct RecordingSynthesizer {
    texts: Arc<Mutex<Vec<String>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl RecordingSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A synthesizer whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            texts: Arc::default(),
            fail_with: Arc::new(Mutex::new(Some(message.into()))),
        }
    }

    pub async fn texts(&self) -> Vec<String> {
        self.texts.lock().await.clone()
    }
}

#[async_trait]
impl TextToSpeech for RecordingSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if let Some(message) = self.fail_with.lock().await.as_ref() {
            return Err(AiError::Speech(message.clone()));
        }
        self.texts.lock().await.push(text.to_string());
        encode_wav(&[0; 160], SAMPLE_RATE)
    }
}

/// Speaker that counts playbacks instead of making sound.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpeaker {
    played: Arc<AtomicUsize>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> usize {
        self.played.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioOutput for RecordingSpeaker {
    async fn play(&self, _wav: Vec<u8>) -> Result<()> {
        self.played.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
