//! OpenAI LLM provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, TokenUsage, ToolCall,
};
use crate::llm::retry::{LlmRetryConfig, response_to_error};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI client
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry_config: LlmRetryConfig,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            model: "gpt-4.1".to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            retry_config: LlmRetryConfig::default(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_config(mut self, config: LlmRetryConfig) -> Self {
        self.retry_config = config;
        self
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIMessageToolCall>>,
}

impl From<&Message> for OpenAIMessage {
    fn from(m: &Message) -> Self {
        let tool_calls = m.tool_calls.as_ref().map(|tcs| {
            tcs.iter()
                .map(|tc| OpenAIMessageToolCall {
                    id: tc.id.clone(),
                    r#type: "function",
                    function: OpenAIMessageFunction {
                        name: tc.name.clone(),
                        arguments: tc.arguments.to_string(),
                    },
                })
                .collect()
        });

        // For assistant messages with tool_calls, content can be null
        let content = if m.tool_calls.is_some() && m.content.is_empty() {
            None
        } else {
            Some(m.content.clone())
        };

        Self {
            role: m.role.as_str(),
            content,
            tool_call_id: m.tool_call_id.clone(),
            tool_calls,
        }
    }
}

#[derive(Serialize)]
struct OpenAIMessageToolCall {
    id: String,
    r#type: &'static str,
    function: OpenAIMessageFunction,
}

#[derive(Serialize)]
struct OpenAIMessageFunction {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct OpenAITool {
    r#type: &'static str,
    function: OpenAIFunction,
}

#[derive(Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize, Debug)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn build_body(model: &str, request: &CompletionRequest) -> OpenAIRequest {
    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(|t| OpenAITool {
                    r#type: "function",
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
        )
    };

    OpenAIRequest {
        model: model.to_string(),
        messages: request.messages.iter().map(OpenAIMessage::from).collect(),
        tools,
        temperature: request.temperature,
    }
}

fn parse_response(data: OpenAIResponse) -> Result<CompletionResponse> {
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Llm("No response from OpenAI".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
        })
        .collect();

    let finish_reason = choice
        .finish_reason
        .as_deref()
        .map(FinishReason::from_openai)
        .unwrap_or(FinishReason::Stop);

    let usage = data.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(CompletionResponse {
        content: choice.message.content,
        tool_calls,
        finish_reason,
        usage,
    })
}

#[async_trait]
impl LlmClient for OpenAIClient {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = build_body(&self.model, &request);
        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            let error = match self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    let data: OpenAIResponse = response.json().await?;
                    let completion = parse_response(data)?;
                    tracing::debug!(
                        model = %self.model,
                        tool_calls = completion.tool_calls.len(),
                        "OpenAI completion received"
                    );
                    return Ok(completion);
                }
                Ok(response) => response_to_error(response, "OpenAI").await,
                Err(e) => AiError::Http(e),
            };

            if !self.retry_config.should_retry(&error, attempt) {
                return Err(error);
            }
            self.retry_config.back_off(attempt, &error).await;
            last_error = Some(error);
        }

        Err(last_error
            .unwrap_or_else(|| AiError::Llm("OpenAI request failed after retries".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolSchema;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new("sk-test")
            .with_model("gpt-test")
            .with_base_url(server.uri())
            .with_retry_config(LlmRetryConfig {
                max_retries: 1,
                initial_delay_ms: 1,
                max_delay_ms: 1,
                backoff_multiplier: 1.0,
            })
    }

    #[test]
    fn test_body_serializes_tool_history() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "run_command".to_string(),
            arguments: json!({"cmd": "ls"}),
        };
        let request = CompletionRequest::new(vec![
            Message::user("list files"),
            Message::assistant_with_tool_calls(None, vec![call]),
            Message::tool_result("call_1", "ok"),
        ]);
        let body = serde_json::to_value(build_body("gpt-test", &request)).unwrap();

        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert!(body["messages"][1].get("content").is_none());
        assert_eq!(
            body["messages"][1]["tool_calls"][0]["function"]["arguments"],
            "{\"cmd\":\"ls\"}"
        );
        assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
    }

    #[tokio::test]
    async fn test_complete_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_9",
                            "type": "function",
                            "function": {"name": "run_command", "arguments": "{\"cmd\":\"pwd\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = CompletionRequest::new(vec![Message::user("where am I?")]).with_tools(vec![
            ToolSchema {
                name: "run_command".to_string(),
                description: "run".to_string(),
                parameters: json!({"type": "object"}),
            },
        ]);
        let response = client(&server).complete(request).await.unwrap();

        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].arguments, json!({"cmd": "pwd"}));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::LlmHttp { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(2)
            .mount(&server)
            .await;

        let err = client(&server)
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AiError::LlmHttp { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_long_retry_after_does_not_stall_the_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "86400")
                    .set_body_string("rate limited"),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "still here"},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let response = client(&server)
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("still here"));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
