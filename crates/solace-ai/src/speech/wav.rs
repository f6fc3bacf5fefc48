//! WAV encoding helpers.

use std::io::Cursor;
use std::time::Duration;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{AiError, Result};

/// Encode mono 16-bit PCM samples as an in-memory WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(wav_error)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }
    Ok(cursor.into_inner())
}

/// Decode WAV bytes into its spec and 16-bit samples.
pub fn decode_wav(bytes: &[u8]) -> Result<(WavSpec, Vec<i16>)> {
    let mut reader = WavReader::new(Cursor::new(bytes)).map_err(wav_error)?;
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(wav_error)?;
    Ok((spec, samples))
}

/// Playback length of WAV bytes, read from the header.
pub fn wav_duration(bytes: &[u8]) -> Result<Duration> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(wav_error)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::from_secs_f64(
        reader.duration() as f64 / spec.sample_rate as f64,
    ))
}

fn wav_error(err: hound::Error) -> AiError {
    AiError::Audio(format!("WAV error: {}", err))
}
