//! Energy-based phrase detection.
//!
//! The gate is fed fixed-size frames of mono PCM. It first measures ambient
//! noise, then waits for a frame louder than the derived threshold, records
//! until enough trailing silence (or the phrase limit) and reports the phrase.

use std::time::Duration;

use super::ListenConfig;

/// Lowest energy threshold, so a silent room still needs real speech.
const MIN_ENERGY_THRESHOLD: f32 = 300.0;

/// Speech must exceed the ambient level by this factor.
const AMBIENT_MULTIPLIER: f32 = 1.5;

/// Silence kept before the first loud frame so word onsets aren't clipped.
const PRE_ROLL: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// Still measuring ambient noise
    Calibrating,
    /// Waiting for speech to start
    Waiting,
    /// Inside a phrase
    Recording,
    /// Phrase finished; take it with `take_phrase`
    Complete,
    /// Listen timeout passed without speech
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Calibrating,
    Waiting,
    Recording,
    Complete,
    TimedOut,
}

/// Frame-by-frame phrase detector.
#[derive(Debug, Clone)]
pub struct PhraseGate {
    config: ListenConfig,
    sample_rate: u32,
    phase: Phase,
    threshold: f32,
    ambient_energy: Vec<f32>,
    calibrated_samples: usize,
    waited_samples: usize,
    pre_roll: Vec<i16>,
    phrase: Vec<i16>,
    trailing_silence: usize,
}

impl PhraseGate {
    pub fn new(config: ListenConfig, sample_rate: u32) -> Self {
        let phase = if config.ambient_calibration.is_zero() {
            Phase::Waiting
        } else {
            Phase::Calibrating
        };
        Self {
            config,
            sample_rate,
            phase,
            threshold: MIN_ENERGY_THRESHOLD,
            ambient_energy: Vec::new(),
            calibrated_samples: 0,
            waited_samples: 0,
            pre_roll: Vec::new(),
            phrase: Vec::new(),
            trailing_silence: 0,
        }
    }

    /// Current energy threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    fn samples_for(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * self.sample_rate as f64) as usize
    }

    /// Feed one frame and report the gate state afterwards.
    pub fn push(&mut self, frame: &[i16]) -> GateEvent {
        let energy = rms(frame);

        match self.phase {
            Phase::Calibrating => {
                self.ambient_energy.push(energy);
                self.calibrated_samples += frame.len();
                if self.calibrated_samples >= self.samples_for(self.config.ambient_calibration) {
                    let ambient = self.ambient_energy.iter().sum::<f32>()
                        / self.ambient_energy.len().max(1) as f32;
                    self.threshold = (ambient * AMBIENT_MULTIPLIER).max(MIN_ENERGY_THRESHOLD);
                    self.phase = Phase::Waiting;
                }
            }
            Phase::Waiting => {
                if energy > self.threshold {
                    self.phrase = std::mem::take(&mut self.pre_roll);
                    self.phrase.extend_from_slice(frame);
                    self.trailing_silence = 0;
                    self.phase = Phase::Recording;
                    self.check_phrase_limit();
                } else {
                    self.waited_samples += frame.len();
                    self.pre_roll.extend_from_slice(frame);
                    let keep = self.samples_for(PRE_ROLL);
                    if self.pre_roll.len() > keep {
                        let excess = self.pre_roll.len() - keep;
                        self.pre_roll.drain(..excess);
                    }
                    if self.waited_samples >= self.samples_for(self.config.timeout) {
                        self.phase = Phase::TimedOut;
                    }
                }
            }
            Phase::Recording => {
                self.phrase.extend_from_slice(frame);
                if energy > self.threshold {
                    self.trailing_silence = 0;
                } else {
                    self.trailing_silence += frame.len();
                }
                if self.trailing_silence >= self.samples_for(self.config.pause_threshold) {
                    self.phase = Phase::Complete;
                }
                self.check_phrase_limit();
            }
            Phase::Complete | Phase::TimedOut => {}
        }

        self.event()
    }

    fn check_phrase_limit(&mut self) {
        if self.phrase.len() >= self.samples_for(self.config.phrase_time_limit) {
            self.phase = Phase::Complete;
        }
    }

    /// State without feeding a frame.
    pub fn event(&self) -> GateEvent {
        match self.phase {
            Phase::Calibrating => GateEvent::Calibrating,
            Phase::Waiting => GateEvent::Waiting,
            Phase::Recording => GateEvent::Recording,
            Phase::Complete => GateEvent::Complete,
            Phase::TimedOut => GateEvent::TimedOut,
        }
    }

    /// Recorded phrase, if one was started. Trailing silence is trimmed.
    pub fn take_phrase(&mut self) -> Option<Vec<i16>> {
        if self.phrase.is_empty() {
            return None;
        }
        let mut phrase = std::mem::take(&mut self.phrase);
        let trim = self.trailing_silence.min(phrase.len());
        phrase.truncate(phrase.len() - trim);
        Some(phrase)
    }
}

/// Root-mean-square energy of a frame.
pub(crate) fn rms(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / frame.len() as f64).sqrt() as f32
}
