//! Session-level errors

use solace_ai::AiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyInput,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("memory service unavailable: {0}")]
    Memory(#[source] AiError),

    #[error("model request failed: {0}")]
    Model(#[source] AiError),

    #[error("speech failed: {0}")]
    Speech(#[source] AiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
