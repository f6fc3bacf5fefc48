//! Tool trait and types for conversation tools

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// JSON Schema for tool parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema object
}

/// Result of tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful tool output
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    /// Create an error tool output
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    /// Text handed back to the model as the tool-role message content.
    pub fn to_message_content(&self) -> String {
        if self.success {
            match &self.result {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            }
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("tool execution failed")
            )
        }
    }
}

/// Core trait for conversation tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (used in LLM function calls)
    fn name(&self) -> &str;

    /// Human-readable description for LLM context
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with given input
    async fn execute(&self, input: Value) -> Result<ToolOutput>;

    /// Build complete schema for LLM
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_content_is_json() {
        let output = ToolOutput::success(json!({"exit_code": 0}));
        assert_eq!(output.to_message_content(), "{\"exit_code\":0}");
    }

    #[test]
    fn test_string_result_is_passed_through() {
        let output = ToolOutput::success(json!("plain"));
        assert_eq!(output.to_message_content(), "plain");
    }

    #[test]
    fn test_error_content() {
        let output = ToolOutput::error("Action blocked: rm is not allowed");
        assert_eq!(
            output.to_message_content(),
            "Error: Action blocked: rm is not allowed"
        );
    }
}
