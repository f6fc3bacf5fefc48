//! Local microphone and speaker.
//!
//! Real devices need the `audio` feature (cpal for capture, rodio for
//! playback). Without it both types exist but report an audio error, so the
//! text session still builds on machines without sound libraries.

use async_trait::async_trait;

use super::{AudioInput, AudioOutput, CapturedAudio, ListenConfig};
use crate::error::{AiError, Result};

/// Default input device, gated by `PhraseGate`
#[derive(Debug, Clone, Copy, Default)]
pub struct Microphone;

/// Default output device
#[derive(Debug, Clone, Copy, Default)]
pub struct Speaker;

impl Microphone {
    pub fn new() -> Self {
        Self
    }
}

impl Speaker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioInput for Microphone {
    async fn capture(&self, config: &ListenConfig) -> Result<Option<CapturedAudio>> {
        let config = config.clone();
        tokio::task::spawn_blocking(move || backend::capture_phrase(&config))
            .await
            .map_err(|e| AiError::Audio(format!("capture task failed: {}", e)))?
    }
}

#[async_trait]
impl AudioOutput for Speaker {
    async fn play(&self, wav: Vec<u8>) -> Result<()> {
        tokio::task::spawn_blocking(move || backend::play_wav(wav))
            .await
            .map_err(|e| AiError::Audio(format!("playback task failed: {}", e)))?
    }
}

#[cfg(feature = "audio")]
mod backend {
    use std::io::Cursor;
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::time::{Duration, Instant};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{InputCallbackInfo, SampleFormat, StreamError};
    use rodio::{Decoder, OutputStream, Sink};
    use tracing::{debug, warn};

    use crate::error::{AiError, Result};
    use crate::speech::gate::{GateEvent, PhraseGate};
    use crate::speech::{CapturedAudio, ListenConfig};

    /// Gate frame length in milliseconds
    const FRAME_MS: u32 = 30;

    fn audio_error(err: impl std::fmt::Display) -> AiError {
        AiError::Audio(err.to_string())
    }

    fn log_stream_error(err: StreamError) {
        warn!(error = %err, "Audio input stream error");
    }

    /// Average interleaved channels into mono 16-bit samples.
    fn downmix<T: Copy>(data: &[T], channels: usize, to_i16: impl Fn(T) -> i16) -> Vec<i16> {
        let channels = channels.max(1);
        data.chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| to_i16(s) as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    }

    fn f32_to_i16(sample: f32) -> i16 {
        (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
    }

    pub(super) fn capture_phrase(config: &ListenConfig) -> Result<Option<CapturedAudio>> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| AiError::Audio("No input device".to_string()))?;
        let supported = device.default_input_config().map_err(audio_error)?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let stream_config = supported.config();

        let (tx, rx) = mpsc::channel::<Vec<i16>>();
        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &InputCallbackInfo| {
                    let _ = tx.send(downmix(data, channels, f32_to_i16));
                },
                log_stream_error,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &InputCallbackInfo| {
                    let _ = tx.send(downmix(data, channels, |s| s));
                },
                log_stream_error,
                None,
            ),
            other => {
                return Err(AiError::Audio(format!(
                    "Unsupported input sample format: {:?}",
                    other
                )));
            }
        }
        .map_err(audio_error)?;
        stream.play().map_err(audio_error)?;
        debug!(sample_rate, channels, "Microphone open");

        let frame_len = (sample_rate / 1000 * FRAME_MS).max(1) as usize;
        let deadline = Instant::now()
            + config.ambient_calibration
            + config.timeout
            + config.phrase_time_limit
            + Duration::from_secs(1);
        let mut gate = PhraseGate::new(config.clone(), sample_rate);
        let mut pending: Vec<i16> = Vec::new();

        loop {
            match rx.recv_timeout(Duration::from_millis(250)) {
                Ok(chunk) => pending.extend(chunk),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            while pending.len() >= frame_len {
                let frame: Vec<i16> = pending.drain(..frame_len).collect();
                match gate.push(&frame) {
                    GateEvent::Complete => {
                        drop(stream);
                        return Ok(gate.take_phrase().map(|samples| CapturedAudio {
                            samples,
                            sample_rate,
                        }));
                    }
                    GateEvent::TimedOut => return Ok(None),
                    _ => {}
                }
            }

            if Instant::now() >= deadline {
                break;
            }
        }

        drop(stream);
        Ok(gate.take_phrase().map(|samples| CapturedAudio {
            samples,
            sample_rate,
        }))
    }

    pub(super) fn play_wav(wav: Vec<u8>) -> Result<()> {
        let (_stream, handle) = OutputStream::try_default().map_err(audio_error)?;
        let sink = Sink::try_new(&handle).map_err(audio_error)?;
        let source = Decoder::new(Cursor::new(wav)).map_err(audio_error)?;
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_downmix_stereo() {
            let mono = downmix(&[100i16, 300, -50, -150], 2, |s| s);
            assert_eq!(mono, vec![200, -100]);
        }

        #[test]
        fn test_f32_conversion_clamps() {
            assert_eq!(f32_to_i16(2.0), i16::MAX);
            assert_eq!(f32_to_i16(0.0), 0);
        }
    }
}

#[cfg(not(feature = "audio"))]
mod backend {
    use crate::error::{AiError, Result};
    use crate::speech::{CapturedAudio, ListenConfig};

    const UNAVAILABLE: &str = "audio devices unavailable: built without the `audio` feature";

    pub(super) fn capture_phrase(_config: &ListenConfig) -> Result<Option<CapturedAudio>> {
        Err(AiError::Audio(UNAVAILABLE.to_string()))
    }

    pub(super) fn play_wav(_wav: Vec<u8>) -> Result<()> {
        Err(AiError::Audio(UNAVAILABLE.to_string()))
    }
}

#[cfg(all(test, not(feature = "audio")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn devices_report_missing_feature() {
        let err = Microphone::new()
            .capture(&ListenConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("audio"));
        assert!(Speaker::new().play(Vec::new()).await.is_err());
    }
}
