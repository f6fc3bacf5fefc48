//! Solace core - settings, prompts and the session orchestrator.

pub mod error;
pub mod paths;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod voice_loop;

pub use error::{Result, SessionError};
pub use prompt::{DISCLAIMER, SYSTEM_PROMPT, format_memory_context};
pub use session::{Session, TranscriptEntry, Turn, VoiceCycle};
pub use settings::Settings;
pub use voice_loop::{VoiceEvent, VoiceLoop, VoiceLoopSummary};
