//! CLI setup module
//!
//! Resolves settings (file, environment, flags) and wires a `Session`.

use std::sync::Arc;

use anyhow::{Context, Result};
use solace_ai::tools::default_registry;
use solace_ai::{
    ConversationGraph, GraphConfig, Mem0Client, Microphone, OpenAIClient, OpenAISpeech,
    OpenAITranscriber, Speaker, SpeechIo, Voice,
};
use solace_core::{SYSTEM_PROMPT, Session, Settings};
use tracing::{info, warn};

use crate::cli::Cli;

/// Which local devices to attach.
#[derive(Debug, Clone, Copy, Default)]
pub struct Devices {
    pub microphone: bool,
    pub speaker: bool,
}

/// Load settings: config file, then environment, then command-line flags.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_flags(&mut settings, cli)?;
    Ok(settings)
}

fn apply_flags(settings: &mut Settings, cli: &Cli) -> Result<()> {
    if let Some(model) = &cli.model {
        settings.llm.model = model.clone();
    }
    if let Some(user_id) = &cli.user_id {
        settings.memory.user_id = user_id.clone();
    }
    if let Some(voice) = &cli.voice {
        settings.speech.voice = voice.parse::<Voice>()?;
    }
    Ok(())
}

/// Build a session from validated settings.
pub async fn build_session(settings: &Settings, devices: Devices) -> Result<Session> {
    settings.validate()?;
    let api_key = settings
        .api_key()
        .context("OPENAI_API_KEY is not set")?
        .to_string();

    let llm = OpenAIClient::new(api_key.clone())
        .with_model(settings.llm.model.clone())
        .with_base_url(settings.llm.base_url.clone());
    let tools = default_registry(settings.tool_workdir(), settings.tools.timeout_secs);
    let graph = ConversationGraph::new(Arc::new(llm), tools, SYSTEM_PROMPT).with_config(
        GraphConfig {
            max_iterations: settings.llm.max_iterations,
            temperature: settings.llm.temperature,
        },
    );

    let mut memory =
        Mem0Client::new(settings.memory.url.clone()).with_provider_api_key(api_key.clone());
    if let Some(key) = &settings.memory.api_key {
        memory = memory.with_api_key(key.clone());
    }

    let mut session = Session::new(graph, Arc::new(memory), settings.memory.user_id.clone());

    if devices.microphone || devices.speaker {
        session = session.with_speech(build_speech(settings, &api_key, devices));
    }

    if settings.memory.configure_on_start {
        if let Err(e) = session
            .configure_memory(&settings.memory_store_config())
            .await
        {
            warn!(error = %e, "Memory service configuration failed");
        }
    }

    info!(
        model = %settings.llm.model,
        user_id = %settings.memory.user_id,
        microphone = devices.microphone,
        speaker = devices.speaker,
        "Session ready"
    );
    Ok(session)
}

fn build_speech(settings: &Settings, api_key: &str, devices: Devices) -> SpeechIo {
    let speech = &settings.speech;

    let mut stt = OpenAITranscriber::new(api_key)
        .with_base_url(settings.llm.base_url.clone())
        .with_model(speech.stt_model.clone());
    if let Some(language) = &speech.language {
        stt = stt.with_language(language.clone());
    }

    let tts = OpenAISpeech::new(api_key)
        .with_base_url(settings.llm.base_url.clone())
        .with_model(speech.tts_model.clone())
        .with_voice(speech.voice)
        .with_instructions(speech.instructions.clone());

    let mut io = SpeechIo::new(Arc::new(stt), Arc::new(tts))
        .with_listen_config(settings.listen_config());
    if devices.microphone {
        io = io.with_input(Arc::new(Microphone::new()));
    }
    if devices.speaker {
        io = io.with_output(Arc::new(Speaker::new()));
    }
    io
}
