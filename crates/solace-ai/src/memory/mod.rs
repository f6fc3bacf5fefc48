//! Long-term conversational memory
//!
//! Storage, embedding and ranking all live in the memory service; this module
//! only defines the seam (`MemoryService`) and its clients.

#[cfg(any(test, feature = "test-utils"))]
mod in_memory;
mod mem0;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::Role;

#[cfg(any(test, feature = "test-utils"))]
pub use in_memory::InMemoryMemory;
pub use mem0::{DEFAULT_MEMORY_URL, Mem0Client};

/// One stored memory snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub memory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl MemoryRecord {
    /// `ID: <id> Memory: <text>` line used in prompt context and listings.
    pub fn snippet(&self) -> String {
        format!("ID: {} Memory: {}", self.id, self.memory)
    }
}

/// A user/assistant message as stored by the memory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeMessage {
    pub role: Role,
    pub content: String,
}

impl ExchangeMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Vector index settings pushed to a self-hosted memory server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    pub host: String,
    pub port: u16,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6333,
        }
    }
}

/// Graph store settings pushed to a self-hosted memory server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStoreConfig {
    pub url: String,
    pub username: String,
    /// Never has a default; supplied through the environment or config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            url: "bolt://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: None,
        }
    }
}

/// Full store configuration for `MemoryService::configure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    pub embedder_model: String,
    pub llm_model: String,
    pub vector_store: VectorStoreConfig,
    pub graph_store: GraphStoreConfig,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            embedder_model: "text-embedding-3-small".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            vector_store: VectorStoreConfig::default(),
            graph_store: GraphStoreConfig::default(),
        }
    }
}

impl MemoryStoreConfig {
    /// Request body in the memory server's provider/config layout.
    ///
    /// `api_key` is the model-provider key the server uses for embeddings and
    /// fact extraction.
    pub fn to_request_body(&self, api_key: Option<&str>) -> serde_json::Value {
        let mut graph_config = serde_json::json!({
            "url": self.graph_store.url,
            "username": self.graph_store.username,
        });
        if let Some(password) = &self.graph_store.password {
            graph_config["password"] = serde_json::Value::String(password.clone());
        }

        let mut embedder = serde_json::json!({ "model": self.embedder_model });
        let mut llm = serde_json::json!({ "model": self.llm_model });
        if let Some(key) = api_key {
            embedder["api_key"] = serde_json::Value::String(key.to_string());
            llm["api_key"] = serde_json::Value::String(key.to_string());
        }

        serde_json::json!({
            "version": "v1.1",
            "embedder": { "provider": "openai", "config": embedder },
            "llm": { "provider": "openai", "config": llm },
            "vector_store": {
                "provider": "qdrant",
                "config": {
                    "host": self.vector_store.host,
                    "port": self.vector_store.port,
                }
            },
            "graph_store": { "provider": "neo4j", "config": graph_config },
        })
    }
}

/// Client seam for the external memory service.
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Memories relevant to `query`, best match first.
    async fn search(&self, query: &str, user_id: &str) -> Result<Vec<MemoryRecord>>;

    /// Store one exchange; the service decides what to extract from it.
    async fn add(&self, messages: &[ExchangeMessage], user_id: &str) -> Result<()>;

    /// Every memory stored for `user_id`.
    async fn get_all(&self, user_id: &str) -> Result<Vec<MemoryRecord>>;

    /// Push store configuration to the service.
    async fn configure(&self, config: &MemoryStoreConfig) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_format() {
        let record = MemoryRecord {
            id: "m1".to_string(),
            memory: "Feels anxious before exams".to_string(),
            score: Some(0.8),
        };
        assert_eq!(record.snippet(), "ID: m1 Memory: Feels anxious before exams");
    }

    #[test]
    fn test_configure_body_omits_missing_password() {
        let body = MemoryStoreConfig::default().to_request_body(None);
        assert_eq!(body["vector_store"]["config"]["port"], 6333);
        assert_eq!(body["graph_store"]["config"]["username"], "neo4j");
        assert!(body["graph_store"]["config"].get("password").is_none());
        assert!(body["embedder"]["config"].get("api_key").is_none());
    }

    #[test]
    fn test_configure_body_includes_secrets_when_given() {
        let mut config = MemoryStoreConfig::default();
        config.graph_store.password = Some("from-env".to_string());
        let body = config.to_request_body(Some("sk-test"));
        assert_eq!(body["graph_store"]["config"]["password"], "from-env");
        assert_eq!(body["llm"]["config"]["api_key"], "sk-test");
    }

    #[test]
    fn test_exchange_message_serialization() {
        let json = serde_json::to_value(ExchangeMessage::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }
}
