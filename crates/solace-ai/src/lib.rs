//! Solace AI - conversation engine for the Solace listener
//!
//! This crate provides:
//! - Chat completion client trait with an OpenAI-compatible implementation
//! - The respond / execute-tool conversation graph
//! - An allow-listed host command tool
//! - Memory service clients (mem0 REST server)
//! - Speech recognition, synthesis, capture and playback

pub mod error;
pub mod graph;
mod http_client;
pub mod llm;
pub mod memory;
pub mod speech;
pub mod tools;

// Re-export commonly used types
pub use error::{AiError, Result};
pub use graph::{ConversationGraph, DEFAULT_MAX_ITERATIONS, GraphConfig, GraphRun, GraphState};
pub use llm::{
    CompletionRequest, CompletionResponse, LlmClient, LlmRetryConfig, Message, ModelTurn,
    OpenAIClient, Role, ToolCall,
};
pub use memory::{
    ExchangeMessage, Mem0Client, MemoryRecord, MemoryService, MemoryStoreConfig,
};
pub use speech::{
    AudioInput, AudioOutput, ListenConfig, Microphone, OpenAISpeech, OpenAITranscriber,
    Recognition, Speaker, SpeechIo, SpeechToText, TextToSpeech, Voice,
};
pub use tools::{HostAction, RunCommandTool, Tool, ToolOutput, ToolRegistry, ToolSchema};
