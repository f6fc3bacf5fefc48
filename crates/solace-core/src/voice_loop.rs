//! Continuous listen -> respond -> speak loop.

use std::future::Future;

use solace_ai::{AiError, Recognition};
use tracing::{info, warn};

use crate::error::{Result, SessionError};
use crate::session::{Session, Turn};

/// Progress reported to the front end.
#[derive(Debug)]
pub enum VoiceEvent<'a> {
    Listening,
    Heard(&'a str),
    Replied(&'a Turn),
    Skipped(&'a Recognition),
    Failed(&'a SessionError),
}

/// Totals for one loop run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceLoopSummary {
    pub cycles: usize,
    pub turns: usize,
    pub failures: usize,
}

/// Loop driver; stops on shutdown, on a device failure, or after `max_cycles`.
#[derive(Debug, Clone, Default)]
pub struct VoiceLoop {
    max_cycles: Option<usize>,
}

impl VoiceLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// Run until `shutdown` resolves. Listening, thinking and speaking never
    /// overlap: each cycle is awaited to completion before the next listen.
    pub async fn run<F>(
        &self,
        session: &mut Session,
        shutdown: F,
        mut on_event: impl FnMut(VoiceEvent<'_>),
    ) -> Result<VoiceLoopSummary>
    where
        F: Future<Output = ()>,
    {
        if !session.can_listen() {
            return Err(SessionError::Config(
                "voice loop needs a microphone".to_string(),
            ));
        }

        tokio::pin!(shutdown);
        let mut summary = VoiceLoopSummary::default();
        info!(user_id = %session.user_id(), "Voice loop started");

        loop {
            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }
            let stopping = tokio::select! {
                biased;
                _ = &mut shutdown => true,
                _ = async {} => false,
            };
            if stopping {
                break;
            }
            on_event(VoiceEvent::Listening);

            let recognition = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                recognition = session.listen() => recognition,
            };
            summary.cycles += 1;

            let heard = match recognition {
                Ok(Recognition::Text(text)) => text,
                Ok(other) => {
                    on_event(VoiceEvent::Skipped(&other));
                    continue;
                }
                Err(SessionError::Speech(AiError::Audio(message))) => {
                    warn!(error = %message, "Audio device failed, stopping voice loop");
                    return Err(SessionError::Speech(AiError::Audio(message)));
                }
                Err(e) => {
                    summary.failures += 1;
                    warn!(error = %e, "Listening failed");
                    on_event(VoiceEvent::Failed(&e));
                    continue;
                }
            };
            on_event(VoiceEvent::Heard(&heard));

            // A turn in flight always runs to completion; shutdown is
            // honoured before the next listen.
            match session.process_turn(&heard).await {
                Ok(turn) => {
                    summary.turns += 1;
                    on_event(VoiceEvent::Replied(&turn));
                }
                Err(e) => {
                    summary.failures += 1;
                    warn!(error = %e, "Voice turn failed");
                    on_event(VoiceEvent::Failed(&e));
                }
            }
        }

        info!(
            cycles = summary.cycles,
            turns = summary.turns,
            "Voice loop stopped"
        );
        Ok(summary)
    }
}
