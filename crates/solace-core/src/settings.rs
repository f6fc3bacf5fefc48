//! Solace settings
//!
//! Loaded from `~/.solace/config.toml`, then overridden by environment
//! variables. Command-line flags are applied last by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solace_ai::memory::{DEFAULT_MEMORY_URL, GraphStoreConfig, VectorStoreConfig};
use solace_ai::speech::{DEFAULT_SPEAKING_INSTRUCTIONS, DEFAULT_STT_MODEL, DEFAULT_TTS_MODEL};
use solace_ai::{DEFAULT_MAX_ITERATIONS, ListenConfig, MemoryStoreConfig, Voice};

use crate::error::{Result, SessionError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub speech: SpeechSettings,
    #[serde(default)]
    pub tools: ToolSettings,
}

/// Chat model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_iterations: usize,
    pub temperature: Option<f32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1".to_string(),
            base_url: solace_ai::llm::DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            temperature: None,
        }
    }
}

/// Memory service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub url: String,
    pub api_key: Option<String>,
    pub user_id: String,
    /// Push the store layout to the server when a session starts
    pub configure_on_start: bool,
    pub embedder_model: String,
    pub llm_model: String,
    pub vector_store: VectorStoreConfig,
    pub graph_store: GraphStoreConfig,
}

impl Default for MemorySettings {
    fn default() -> Self {
        let store = MemoryStoreConfig::default();
        Self {
            url: DEFAULT_MEMORY_URL.to_string(),
            api_key: None,
            user_id: "user01".to_string(),
            configure_on_start: false,
            embedder_model: store.embedder_model,
            llm_model: store.llm_model,
            vector_store: store.vector_store,
            graph_store: store.graph_store,
        }
    }
}

/// Speech settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub voice: Voice,
    pub tts_model: String,
    pub stt_model: String,
    pub instructions: String,
    pub language: Option<String>,
    pub listen_timeout_secs: f32,
    pub phrase_time_limit_secs: f32,
    pub pause_threshold_secs: f32,
    pub ambient_calibration_secs: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            voice: Voice::Nova,
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            stt_model: DEFAULT_STT_MODEL.to_string(),
            instructions: DEFAULT_SPEAKING_INSTRUCTIONS.to_string(),
            language: None,
            listen_timeout_secs: 5.0,
            phrase_time_limit_secs: 10.0,
            pause_threshold_secs: 2.0,
            ambient_calibration_secs: 0.5,
        }
    }
}

/// Host command tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Directory `run_command` actions run in; defaults to the current directory
    pub workdir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            workdir: None,
            timeout_secs: 30,
        }
    }
}

/// Longest listening window accepted from configuration.
const MAX_LISTEN_SECS: f32 = 3_600.0;

fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::ZERO)
}

impl Settings {
    /// Load settings from a TOML file. A missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| SessionError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load `path` (or the default config file), then apply the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = crate::paths::config_path()
                    .map_err(|e| SessionError::Config(e.to_string()))?;
                Self::load_from_path(&path)?
            }
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Override values from environment variables looked up through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(model) = get("SOLACE_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(value) = get("SOLACE_MAX_ITERATIONS") {
            self.llm.max_iterations = value.trim().parse().map_err(|_| {
                SessionError::Config(format!("SOLACE_MAX_ITERATIONS is not a number: {value}"))
            })?;
        }
        if let Some(url) = get("SOLACE_MEMORY_URL") {
            self.memory.url = url;
        }
        if let Some(key) = get("MEM0_API_KEY") {
            self.memory.api_key = Some(key);
        }
        if let Some(user_id) = get("SOLACE_USER_ID") {
            self.memory.user_id = user_id;
        }
        if let Some(host) = get("QDRANT_HOST") {
            self.memory.vector_store.host = host;
        }
        if let Some(port) = get("QDRANT_PORT") {
            self.memory.vector_store.port = port.trim().parse().map_err(|_| {
                SessionError::Config(format!("QDRANT_PORT is not a port number: {port}"))
            })?;
        }
        if let Some(url) = get("NEO4J_URL") {
            self.memory.graph_store.url = url;
        }
        if let Some(username) = get("NEO4J_USERNAME") {
            self.memory.graph_store.username = username;
        }
        if let Some(password) = get("NEO4J_PASSWORD") {
            self.memory.graph_store.password = Some(password);
        }
        if let Some(voice) = get("SOLACE_VOICE") {
            self.speech.voice = voice
                .parse()
                .map_err(|e: solace_ai::AiError| SessionError::Config(e.to_string()))?;
        }
        Ok(())
    }

    /// Check everything a session needs before any service is contacted.
    pub fn validate(&self) -> Result<()> {
        if self.api_key().is_none() {
            return Err(SessionError::Config(
                "OPENAI_API_KEY is not set (environment, .env or llm.api_key in config.toml)"
                    .to_string(),
            ));
        }
        if self.llm.max_iterations == 0 {
            return Err(SessionError::Config(
                "llm.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.memory.user_id.trim().is_empty() {
            return Err(SessionError::Config("memory.user_id is empty".to_string()));
        }
        let speech = &self.speech;
        for (key, value) in [
            ("speech.listen_timeout_secs", speech.listen_timeout_secs),
            ("speech.phrase_time_limit_secs", speech.phrase_time_limit_secs),
            ("speech.pause_threshold_secs", speech.pause_threshold_secs),
            ("speech.ambient_calibration_secs", speech.ambient_calibration_secs),
        ] {
            if !value.is_finite() || !(0.0..=MAX_LISTEN_SECS).contains(&value) {
                return Err(SessionError::Config(format!(
                    "{key} must be between 0 and {MAX_LISTEN_SECS} seconds, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.llm
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn memory_store_config(&self) -> MemoryStoreConfig {
        MemoryStoreConfig {
            embedder_model: self.memory.embedder_model.clone(),
            llm_model: self.memory.llm_model.clone(),
            vector_store: self.memory.vector_store.clone(),
            graph_store: self.memory.graph_store.clone(),
        }
    }

    pub fn listen_config(&self) -> ListenConfig {
        ListenConfig {
            timeout: secs(self.speech.listen_timeout_secs),
            phrase_time_limit: secs(self.speech.phrase_time_limit_secs),
            pause_threshold: secs(self.speech.pause_threshold_secs),
            ambient_calibration: secs(self.speech.ambient_calibration_secs),
        }
    }

    /// Working directory for host actions.
    pub fn tool_workdir(&self) -> PathBuf {
        self.tools
            .workdir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
