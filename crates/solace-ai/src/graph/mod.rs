//! Conversation graph - the respond / execute-tool loop
//!
//! Two nodes with one conditional edge:
//! - `Respond` calls the model with the system prompt, the message history and
//!   the tool schemas
//! - `ExecuteTool` runs every requested call in order and appends one
//!   tool-result message per call
//!
//! `Respond` moves to `ExecuteTool` when the model asks for tools and to `Done`
//! otherwise; `ExecuteTool` always returns to `Respond`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AiError, Result};
use crate::llm::{CompletionRequest, LlmClient, Message, ModelTurn, ToolCall};
use crate::tools::ToolRegistry;

/// Default cap on model invocations per run
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// Graph configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Maximum model invocations in one run
    pub max_iterations: usize,
    /// Sampling temperature passed to the model
    pub temperature: Option<f32>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            temperature: None,
        }
    }
}

/// Current node of a run
#[derive(Debug, Clone, PartialEq)]
pub enum GraphState {
    Respond,
    ExecuteTool(Vec<ToolCall>),
    Done(String),
}

/// Result of one graph run
#[derive(Debug, Clone)]
pub struct GraphRun {
    /// Input messages plus everything the run appended
    pub messages: Vec<Message>,
    /// Final assistant reply
    pub reply: String,
    /// Number of model invocations
    pub model_calls: usize,
    /// Number of tool executions
    pub tool_executions: usize,
}

impl GraphRun {
    /// Messages appended by the run (everything after the first `input_len`).
    pub fn appended(&self, input_len: usize) -> &[Message] {
        &self.messages[input_len.min(self.messages.len())..]
    }
}

/// The respond / execute-tool state machine
#[derive(Clone)]
pub struct ConversationGraph {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    system_prompt: String,
    config: GraphConfig,
}

impl ConversationGraph {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            tools,
            system_prompt: system_prompt.into(),
            config: GraphConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the graph over `messages` until the model produces a plain reply.
    ///
    /// The system prompt is prepended to every model call and never stored in
    /// the returned message list.
    pub async fn run(&self, mut messages: Vec<Message>) -> Result<GraphRun> {
        let mut state = GraphState::Respond;
        let mut model_calls = 0usize;
        let mut tool_executions = 0usize;

        loop {
            state = match state {
                GraphState::Respond => {
                    if model_calls >= self.config.max_iterations {
                        warn!(
                            max_iterations = self.config.max_iterations,
                            "Conversation graph hit iteration cap"
                        );
                        return Err(AiError::MaxIterations(self.config.max_iterations));
                    }
                    model_calls += 1;

                    match self.respond(&messages, model_calls).await? {
                        ModelTurn::PlainReply(reply) => {
                            messages.push(Message::assistant(reply.clone()));
                            GraphState::Done(reply)
                        }
                        ModelTurn::ToolRequest { content, calls } => {
                            messages.push(Message::assistant_with_tool_calls(
                                content,
                                calls.clone(),
                            ));
                            GraphState::ExecuteTool(calls)
                        }
                    }
                }
                GraphState::ExecuteTool(calls) => {
                    for call in &calls {
                        let content = self.execute_tool(call).await;
                        messages.push(Message::tool_result(call.id.clone(), content));
                        tool_executions += 1;
                    }
                    GraphState::Respond
                }
                GraphState::Done(reply) => {
                    info!(model_calls, tool_executions, "Conversation graph finished");
                    return Ok(GraphRun {
                        messages,
                        reply,
                        model_calls,
                        tool_executions,
                    });
                }
            };
        }
    }

    async fn respond(&self, messages: &[Message], iteration: usize) -> Result<ModelTurn> {
        let mut request_messages = Vec::with_capacity(messages.len() + 1);
        request_messages.push(Message::system(self.system_prompt.clone()));
        request_messages.extend_from_slice(messages);

        let mut request = CompletionRequest::new(request_messages).with_tools(self.tools.schemas());
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        debug!(
            iteration,
            model = self.llm.model(),
            messages = messages.len(),
            "Invoking model"
        );
        let response = self.llm.complete(request).await?;
        Ok(response.into_turn())
    }

    /// Execute one tool call; failures become the tool-result text.
    async fn execute_tool(&self, call: &ToolCall) -> String {
        debug!(tool = %call.name, call_id = %call.id, "Executing tool");
        match self.tools.execute(&call.name, call.arguments.clone()).await {
            Ok(output) => output.to_message_content(),
            Err(AiError::ToolNotFound(name)) => {
                warn!(tool = %name, "Model requested unknown tool");
                format!("Error: unknown tool '{}'", name)
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                format!("Error: {}", e)
            }
        }
    }
}
