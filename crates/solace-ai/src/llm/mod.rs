//! LLM module - chat completion client abstraction

mod client;
#[cfg(any(test, feature = "test-utils"))]
mod mock_client;
mod openai;
mod retry;

pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, ModelTurn, Role,
    TokenUsage, ToolCall,
};
#[cfg(any(test, feature = "test-utils"))]
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
pub use openai::{DEFAULT_OPENAI_BASE_URL, OpenAIClient};
pub use retry::LlmRetryConfig;
