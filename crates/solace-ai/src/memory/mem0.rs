//! HTTP client for a self-hosted mem0 REST server.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ExchangeMessage, MemoryRecord, MemoryService, MemoryStoreConfig};
use crate::error::{AiError, Result};
use crate::http_client::{build_http_client, truncate_body};

pub const DEFAULT_MEMORY_URL: &str = "http://localhost:8888";

/// Search and list responses come either wrapped or as a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordsResponse {
    Wrapped { results: Vec<RawRecord> },
    Bare(Vec<RawRecord>),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: serde_json::Value,
    memory: String,
    #[serde(default)]
    score: Option<f32>,
}

impl From<RawRecord> for MemoryRecord {
    fn from(raw: RawRecord) -> Self {
        let id = match raw.id {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        };
        Self {
            id,
            memory: raw.memory,
            score: raw.score,
        }
    }
}

impl RecordsResponse {
    fn into_records(self) -> Vec<MemoryRecord> {
        let raw = match self {
            RecordsResponse::Wrapped { results } => results,
            RecordsResponse::Bare(results) => results,
        };
        raw.into_iter().map(MemoryRecord::from).collect()
    }
}

/// mem0 server client
#[derive(Clone)]
pub struct Mem0Client {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    /// Model-provider key forwarded on `configure`
    provider_api_key: Option<String>,
}

impl Mem0Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            provider_api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_provider_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.provider_api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Token {}", key)),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = truncate_body(response.text().await.unwrap_or_default());
        Err(AiError::Memory(format!(
            "memory service returned {}: {}",
            status.as_u16(),
            body
        )))
    }

    async fn records(response: Response) -> Result<Vec<MemoryRecord>> {
        let response = Self::check(response).await?;
        let text = response.text().await?;
        let parsed: RecordsResponse = serde_json::from_str(&text).map_err(|e| {
            AiError::InvalidFormat(format!("unexpected memory service response: {}", e))
        })?;
        Ok(parsed.into_records())
    }
}

#[async_trait]
impl MemoryService for Mem0Client {
    async fn search(&self, query: &str, user_id: &str) -> Result<Vec<MemoryRecord>> {
        debug!(user_id, "Searching memories");
        let request = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&json!({ "query": query, "user_id": user_id }));
        let response = self.authorize(request).send().await?;
        Self::records(response).await
    }

    async fn add(&self, messages: &[ExchangeMessage], user_id: &str) -> Result<()> {
        debug!(user_id, count = messages.len(), "Adding memory exchange");
        let request = self
            .client
            .post(format!("{}/memories", self.base_url))
            .json(&json!({ "messages": messages, "user_id": user_id }));
        let response = self.authorize(request).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_all(&self, user_id: &str) -> Result<Vec<MemoryRecord>> {
        let request = self
            .client
            .get(format!("{}/memories", self.base_url))
            .query(&[("user_id", user_id)]);
        let response = self.authorize(request).send().await?;
        Self::records(response).await
    }

    async fn configure(&self, config: &MemoryStoreConfig) -> Result<()> {
        debug!(
            vector_host = %config.vector_store.host,
            graph_url = %config.graph_store.url,
            "Configuring memory service"
        );
        let body = config.to_request_body(self.provider_api_key.as_deref());
        let request = self
            .client
            .post(format!("{}/configure", self.base_url))
            .json(&body);
        let response = self.authorize(request).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_parses_wrapped_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_json(json!({"query": "exams", "user_id": "user01"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": "a1", "memory": "Worries about exams", "score": 0.91},
                    {"id": "b2", "memory": "Likes running"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = Mem0Client::new(server.uri());
        let records = client.search("exams", "user01").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a1");
        assert_eq!(records[0].score, Some(0.91));
        assert_eq!(records[1].score, None);
    }

    #[tokio::test]
    async fn get_all_accepts_bare_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/memories"))
            .and(query_param("user_id", "user01"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": 7, "memory": "Has a dog"}])),
            )
            .mount(&server)
            .await;

        let client = Mem0Client::new(format!("{}/", server.uri()));
        let records = client.get_all("user01").await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "7");
    }

    #[tokio::test]
    async fn add_posts_exchange_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/memories"))
            .and(header("Authorization", "Token m0-key"))
            .and(body_json(json!({
                "messages": [
                    {"role": "user", "content": "I feel anxious today"},
                    {"role": "assistant", "content": "I'm here with you."}
                ],
                "user_id": "user01"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = Mem0Client::new(server.uri()).with_api_key("m0-key");
        client
            .add(
                &[
                    ExchangeMessage::user("I feel anxious today"),
                    ExchangeMessage::assistant("I'm here with you."),
                ],
                "user01",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn server_error_becomes_memory_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("qdrant unreachable"))
            .mount(&server)
            .await;

        let client = Mem0Client::new(server.uri());
        let err = client.search("hi", "user01").await.unwrap_err();

        match err {
            AiError::Memory(message) => {
                assert!(message.contains("500"));
                assert!(message.contains("qdrant unreachable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn configure_posts_store_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/configure"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = Mem0Client::new(server.uri()).with_provider_api_key("sk-test");
        client
            .configure(&MemoryStoreConfig::default())
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["vector_store"]["provider"], "qdrant");
        assert_eq!(body["embedder"]["config"]["api_key"], "sk-test");
    }

    #[tokio::test]
    async fn malformed_response_is_invalid_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = Mem0Client::new(server.uri());
        let err = client.search("hi", "user01").await.unwrap_err();
        assert!(matches!(err, AiError::InvalidFormat(_)));
    }
}
