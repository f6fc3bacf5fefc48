//! Session orchestrator
//!
//! A `Session` owns one conversation: the message list resent to the model,
//! the display transcript, and handles to the graph, memory service and
//! (optionally) speech I/O. Each turn:
//! 1. searches memory for the raw user text
//! 2. prepends the memory context to the user message
//! 3. runs the conversation graph over the whole history
//! 4. stores the user/assistant pair in memory
//! 5. speaks the reply when a speaker is attached

use std::sync::Arc;

use serde::Serialize;
use solace_ai::{
    AiError, ConversationGraph, ExchangeMessage, MemoryRecord, MemoryService, MemoryStoreConfig,
    Message, Recognition, Role, SpeechIo,
};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::prompt::format_memory_context;

/// Display-only record of what was said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

/// Outcome of one successful turn.
#[derive(Debug, Clone, Default)]
pub struct Turn {
    pub reply: String,
    pub model_calls: usize,
    pub tool_executions: usize,
    /// Memory snippets that were added to the prompt
    pub memories_used: usize,
    /// The exchange could not be stored; the reply is still valid
    pub persist_error: Option<String>,
    /// The reply could not be spoken; the reply is still valid
    pub speech_error: Option<String>,
}

impl Turn {
    pub fn has_warnings(&self) -> bool {
        self.persist_error.is_some() || self.speech_error.is_some()
    }
}

/// Outcome of listening once.
#[derive(Debug, Clone)]
pub enum VoiceCycle {
    /// Nothing usable was heard; no model or memory calls were made
    Skipped(Recognition),
    Replied { heard: String, turn: Turn },
}

pub struct Session {
    graph: ConversationGraph,
    memory: Arc<dyn MemoryService>,
    speech: Option<SpeechIo>,
    user_id: String,
    messages: Vec<Message>,
    transcript: Vec<TranscriptEntry>,
}

impl Session {
    pub fn new(
        graph: ConversationGraph,
        memory: Arc<dyn MemoryService>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            graph,
            memory,
            speech: None,
            user_id: user_id.into(),
            messages: Vec::new(),
            transcript: Vec::new(),
        }
    }

    pub fn with_speech(mut self, speech: SpeechIo) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Messages resent to the model on every call (system prompt excluded).
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn speech(&self) -> Option<&SpeechIo> {
        self.speech.as_ref()
    }

    pub fn can_listen(&self) -> bool {
        self.speech.as_ref().is_some_and(SpeechIo::has_input)
    }

    /// Forget this session's messages and transcript. Stored memories stay.
    pub fn clear(&mut self) {
        info!(
            user_id = %self.user_id,
            messages = self.messages.len(),
            "Clearing session"
        );
        self.messages.clear();
        self.transcript.clear();
    }

    /// Push store configuration to the memory service.
    pub async fn configure_memory(&self, config: &MemoryStoreConfig) -> Result<()> {
        self.memory
            .configure(config)
            .await
            .map_err(SessionError::Memory)
    }

    /// Up to `limit` stored memories for this user.
    pub async fn memories(&self, limit: usize) -> Result<Vec<MemoryRecord>> {
        let mut records = self
            .memory
            .get_all(&self.user_id)
            .await
            .map_err(SessionError::Memory)?;
        records.truncate(limit);
        Ok(records)
    }

    /// Run one turn without speaking the reply.
    pub async fn respond(&mut self, user_text: &str) -> Result<Turn> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let memories = self
            .memory
            .search(user_text, &self.user_id)
            .await
            .map_err(SessionError::Memory)?;
        debug!(user_id = %self.user_id, found = memories.len(), "Memory search");

        let mut candidate = self.messages.clone();
        candidate.push(Message::user(format_memory_context(&memories, user_text)));

        // A failed run leaves `self.messages` untouched.
        let run = self.graph.run(candidate).await.map_err(SessionError::Model)?;
        let reply = run.reply.clone();

        let exchange = [
            ExchangeMessage::user(user_text),
            ExchangeMessage::assistant(reply.clone()),
        ];
        let persist_error = match self.memory.add(&exchange, &self.user_id).await {
            Ok(()) => None,
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Failed to store exchange");
                Some(e.to_string())
            }
        };

        // No awaits past this point: history and transcript change together.
        self.messages = run.messages;
        self.transcript.push(TranscriptEntry {
            role: Role::User,
            content: user_text.to_string(),
        });
        self.transcript.push(TranscriptEntry {
            role: Role::Assistant,
            content: reply.clone(),
        });

        info!(
            user_id = %self.user_id,
            model_calls = run.model_calls,
            tool_executions = run.tool_executions,
            "Turn complete"
        );

        Ok(Turn {
            reply,
            model_calls: run.model_calls,
            tool_executions: run.tool_executions,
            memories_used: memories.len(),
            persist_error,
            speech_error: None,
        })
    }

    /// Run one turn and speak the reply.
    pub async fn process_turn(&mut self, user_text: &str) -> Result<Turn> {
        let mut turn = self.respond(user_text).await?;
        if let Err(e) = self.speak(&turn.reply).await {
            warn!(error = %e, "Failed to speak reply");
            turn.speech_error = Some(e.to_string());
        }
        Ok(turn)
    }

    /// Speak `text` if a speaker is attached.
    pub async fn speak(&self, text: &str) -> std::result::Result<(), AiError> {
        match &self.speech {
            Some(speech) => speech.speak(text).await,
            None => Ok(()),
        }
    }

    /// Listen for one phrase. Blank text counts as unrecognized.
    pub async fn listen(&self) -> Result<Recognition> {
        let speech = self
            .speech
            .as_ref()
            .ok_or_else(|| SessionError::Config("voice input is not configured".to_string()))?;

        match speech.listen().await.map_err(SessionError::Speech)? {
            Recognition::Text(text) if text.trim().is_empty() => Ok(Recognition::Unrecognized),
            other => Ok(other),
        }
    }

    /// Listen once and, if something was understood, run a full turn.
    pub async fn voice_cycle(&mut self) -> Result<VoiceCycle> {
        let heard = match self.listen().await? {
            Recognition::Text(text) => text,
            other => {
                debug!(outcome = ?other, "Voice cycle skipped");
                return Ok(VoiceCycle::Skipped(other));
            }
        };

        let turn = self.process_turn(&heard).await?;
        Ok(VoiceCycle::Replied { heard, turn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solace_ai::llm::{MockLlmClient, MockStep};
    use solace_ai::memory::InMemoryMemory;
    use solace_ai::speech::{
        RecordingSpeaker, RecordingSynthesizer, ScriptedMicrophone, ScriptedTranscriber,
    };
    use solace_ai::tools::ToolRegistry;

    fn session(client: &MockLlmClient, memory: &InMemoryMemory) -> Session {
        let graph = ConversationGraph::new(Arc::new(client.clone()), ToolRegistry::new(), "prompt");
        Session::new(graph, Arc::new(memory.clone()), "user01")
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let client = MockLlmClient::new("mock");
        let memory = InMemoryMemory::new();
        let mut session = session(&client, &memory);

        let err = session.respond("   \n").await.unwrap_err();

        assert!(matches!(err, SessionError::EmptyInput));
        assert_eq!(memory.search_calls(), 0);
        assert_eq!(client.call_count().await, 0);
    }

    #[tokio::test]
    async fn user_message_carries_memory_context() {
        let client = MockLlmClient::from_steps("mock", vec![MockStep::text("I remember.")]);
        let memory = InMemoryMemory::new();
        let seeded = memory.seed("user01", "Has an exam on Friday").await;
        let mut session = session(&client, &memory);

        let turn = session.respond("worried about the exam").await.unwrap();

        assert_eq!(turn.memories_used, 1);
        let user_msg = &session.messages()[0];
        assert!(user_msg.content.starts_with("Past context about the user:\n"));
        assert!(user_msg.content.contains(&seeded.snippet()));
        assert!(user_msg.content.ends_with("User: worried about the exam"));
        assert_eq!(session.transcript()[0].content, "worried about the exam");
    }

    #[tokio::test]
    async fn failed_model_call_rolls_back() {
        let client = MockLlmClient::from_steps("mock", vec![MockStep::error("down")]);
        let memory = InMemoryMemory::new();
        let mut session = session(&client, &memory);

        let err = session.respond("hello").await.unwrap_err();

        assert!(matches!(err, SessionError::Model(_)));
        assert!(session.messages().is_empty());
        assert!(session.transcript().is_empty());
        assert_eq!(memory.add_calls(), 0);
    }

    #[tokio::test]
    async fn memory_search_failure_aborts_turn() {
        let client = MockLlmClient::new("mock");
        let memory = InMemoryMemory::new();
        memory.fail_with("connection refused").await;
        let mut session = session(&client, &memory);

        let err = session.respond("hello").await.unwrap_err();

        assert!(matches!(err, SessionError::Memory(_)));
        assert_eq!(client.call_count().await, 0);
    }

    #[tokio::test]
    async fn speech_failure_keeps_reply() {
        let client = MockLlmClient::from_steps("mock", vec![MockStep::text("Breathe with me.")]);
        let memory = InMemoryMemory::new();
        let speech = SpeechIo::new(
            Arc::new(ScriptedTranscriber::new(vec![])),
            Arc::new(RecordingSynthesizer::failing("tts offline")),
        )
        .with_output(Arc::new(RecordingSpeaker::new()));
        let mut session = session(&client, &memory).with_speech(speech);

        let turn = session.process_turn("I can't calm down").await.unwrap();

        assert_eq!(turn.reply, "Breathe with me.");
        assert!(turn.speech_error.unwrap().contains("tts offline"));
        assert_eq!(memory.add_calls(), 1);
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn clear_keeps_stored_memories() {
        let client = MockLlmClient::new("mock");
        let memory = InMemoryMemory::new();
        let mut session = session(&client, &memory);

        session.respond("I adopted a cat").await.unwrap();
        session.clear();

        assert!(session.messages().is_empty());
        assert!(session.transcript().is_empty());
        assert_eq!(session.memories(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn memories_are_limited() {
        let client = MockLlmClient::new("mock");
        let memory = InMemoryMemory::new();
        for i in 0..8 {
            memory.seed("user01", format!("memory {i}")).await;
        }
        let session = session(&client, &memory);

        assert_eq!(session.memories(5).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn unrecognized_speech_is_skipped() {
        let client = MockLlmClient::new("mock");
        let memory = InMemoryMemory::new();
        let speech = SpeechIo::new(
            Arc::new(ScriptedTranscriber::new(vec![Recognition::Unrecognized])),
            Arc::new(RecordingSynthesizer::new()),
        )
        .with_input(Arc::new(ScriptedMicrophone::new(vec![Some(vec![900; 800])])));
        let mut session = session(&client, &memory).with_speech(speech);

        let cycle = session.voice_cycle().await.unwrap();

        assert!(matches!(cycle, VoiceCycle::Skipped(Recognition::Unrecognized)));
        assert_eq!(client.call_count().await, 0);
        assert_eq!(memory.add_calls(), 0);
    }

    #[tokio::test]
    async fn voice_cycle_without_speech_is_config_error() {
        let client = MockLlmClient::new("mock");
        let memory = InMemoryMemory::new();
        let mut session = session(&client, &memory);

        assert!(matches!(
            session.voice_cycle().await,
            Err(SessionError::Config(_))
        ));
    }
}
