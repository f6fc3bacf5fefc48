//! In-process memory store for tests and offline runs.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ExchangeMessage, MemoryRecord, MemoryService, MemoryStoreConfig};
use crate::error::{AiError, Result};
use crate::llm::Role;

#[derive(Debug, Clone)]
struct StoredMemory {
    user_id: String,
    record: MemoryRecord,
}

/// Keyword-ranked memory store kept in process memory.
///
/// Only user-authored messages are kept as memories. Call counters let tests
/// assert how often the orchestrator touched the store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemory {
    entries: Arc<Mutex<Vec<StoredMemory>>>,
    add_calls: Arc<AtomicUsize>,
    search_calls: Arc<AtomicUsize>,
    exchanges: Arc<Mutex<Vec<Vec<ExchangeMessage>>>>,
    fail_with: Arc<Mutex<Option<String>>>,
    fail_add_with: Arc<Mutex<Option<String>>>,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a memory for `user_id`.
    pub async fn seed(&self, user_id: &str, memory: impl Into<String>) -> MemoryRecord {
        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            memory: memory.into(),
            score: None,
        };
        self.entries.lock().await.push(StoredMemory {
            user_id: user_id.to_string(),
            record: record.clone(),
        });
        record
    }

    /// Make every following call fail with `message`.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().await = Some(message.into());
    }

    /// Make only `add` fail with `message`; searches keep working.
    pub async fn fail_add_with(&self, message: impl Into<String>) {
        *self.fail_add_with.lock().await = Some(message.into());
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Every exchange passed to `add`, in order.
    pub async fn exchanges(&self) -> Vec<Vec<ExchangeMessage>> {
        self.exchanges.lock().await.clone()
    }

    async fn check_failure(&self) -> Result<()> {
        match self.fail_with.lock().await.as_ref() {
            Some(message) => Err(AiError::Memory(message.clone())),
            None => Ok(()),
        }
    }
}

fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() > 2)
        .map(|word| word.to_lowercase())
        .collect()
}

#[async_trait]
impl MemoryService for InMemoryMemory {
    async fn search(&self, query: &str, user_id: &str) -> Result<Vec<MemoryRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;

        let query_words = keywords(query);
        if query_words.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.entries.lock().await;
        let mut ranked: Vec<MemoryRecord> = entries
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .filter_map(|entry| {
                let overlap = keywords(&entry.record.memory)
                    .intersection(&query_words)
                    .count();
                (overlap > 0).then(|| MemoryRecord {
                    score: Some(overlap as f32 / query_words.len() as f32),
                    ..entry.record.clone()
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)));
        Ok(ranked)
    }

    async fn add(&self, messages: &[ExchangeMessage], user_id: &str) -> Result<()> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;
        if let Some(message) = self.fail_add_with.lock().await.as_ref() {
            return Err(AiError::Memory(message.clone()));
        }

        self.exchanges.lock().await.push(messages.to_vec());
        let mut entries = self.entries.lock().await;
        for message in messages.iter().filter(|m| m.role == Role::User) {
            entries.push(StoredMemory {
                user_id: user_id.to_string(),
                record: MemoryRecord {
                    id: Uuid::new_v4().to_string(),
                    memory: message.content.clone(),
                    score: None,
                },
            });
        }
        Ok(())
    }

    async fn get_all(&self, user_id: &str) -> Result<Vec<MemoryRecord>> {
        self.check_failure().await?;
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.record.clone())
            .collect())
    }

    async fn configure(&self, _config: &MemoryStoreConfig) -> Result<()> {
        self.check_failure().await
    }
}
