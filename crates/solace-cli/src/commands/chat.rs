use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use solace_ai::Role;
use solace_core::{DISCLAIMER, Session, SessionError, Settings, VoiceCycle, VoiceLoop};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::{ctrl_c, interruptible, print_reply, print_voice_event};
use crate::cli::ChatArgs;
use crate::setup::{Devices, build_session};
use crate::welcome::show_welcome;

const MEMORY_PREVIEW_LIMIT: usize = 5;

/// Slash commands understood by the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Voice,
    VoiceMode,
    Memories,
    Clear,
    History,
    Help,
    Quit,
    Unknown(String),
}

impl ChatCommand {
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let name = input.strip_prefix('/')?;
        let name = name.split_whitespace().next().unwrap_or("").to_lowercase();

        Some(match name.as_str() {
            "voice" | "v" => Self::Voice,
            "voice-mode" | "vm" => Self::VoiceMode,
            "memories" | "memory" => Self::Memories,
            "clear" | "cls" => Self::Clear,
            "history" => Self::History,
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(name),
        })
    }
}

pub async fn run(settings: &Settings, args: ChatArgs) -> Result<()> {
    let audio = cfg!(feature = "audio");
    let devices = Devices {
        microphone: audio,
        speaker: audio && !args.no_speech,
    };
    let mut session = build_session(settings, devices).await?;

    show_welcome(session.can_listen());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        // Ctrl-C or EOF at the prompt ends the session.
        let next = interruptible(lines.next_line(), ctrl_c()).await;
        let Some(line) = next.transpose()?.flatten() else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match ChatCommand::parse(line) {
            None => send(&mut session, line).await,
            Some(ChatCommand::Quit) => break,
            Some(command) => handle_command(&mut session, command).await,
        }
    }

    println!("\n{}", DISCLAIMER.dimmed());
    Ok(())
}

fn prompt() {
    print!("{} ", "you ›".green().bold());
    let _ = std::io::stdout().flush();
}

async fn send(session: &mut Session, text: &str) {
    match interruptible(session.process_turn(text), ctrl_c()).await {
        Some(Ok(turn)) => print_reply(&turn),
        Some(Err(err)) => print_failure(&err),
        None => println!("\n{}", "Stopped before a reply.".dimmed()),
    }
}

async fn handle_command(session: &mut Session, command: ChatCommand) {
    match command {
        ChatCommand::Voice => voice_once(session).await,
        ChatCommand::VoiceMode => voice_mode(session).await,
        ChatCommand::Memories => show_memories(session).await,
        ChatCommand::Clear => {
            session.clear();
            println!("{}", "Conversation cleared. Stored memories are kept.".dimmed());
        }
        ChatCommand::History => show_history(session),
        ChatCommand::Help => show_help(),
        ChatCommand::Unknown(name) => {
            println!("{} unknown command /{}", "?".yellow(), name);
            show_help();
        }
        ChatCommand::Quit => {}
    }
}

async fn voice_once(session: &mut Session) {
    if !session.can_listen() {
        print_failure(&SessionError::Config(
            "no microphone attached (build with the `audio` feature)".to_string(),
        ));
        return;
    }
    println!("{}", "listening...".dimmed());
    let Some(cycle) = interruptible(session.voice_cycle(), ctrl_c()).await else {
        println!("\n{}", "Stopped listening.".dimmed());
        return;
    };
    match cycle {
        Ok(VoiceCycle::Replied { heard, turn }) => {
            println!("{} {}", "you (voice) ›".green().bold(), heard);
            print_reply(&turn);
        }
        Ok(VoiceCycle::Skipped(_)) => {
            println!("{}", "Sorry, I didn't catch that.".dimmed());
        }
        Err(err) => print_failure(&err),
    }
}

async fn voice_mode(session: &mut Session) {
    println!("{}", "Voice mode on. Press Ctrl-C to return to typing.".dimmed());
    match VoiceLoop::new()
        .run(session, ctrl_c(), print_voice_event)
        .await
    {
        Ok(summary) => println!(
            "{}",
            format!("Voice mode off after {} turns.", summary.turns).dimmed()
        ),
        Err(err) => print_failure(&err),
    }
}

async fn show_memories(session: &Session) {
    match session.memories(MEMORY_PREVIEW_LIMIT).await {
        Ok(records) if records.is_empty() => println!("{}", "No memories yet.".dimmed()),
        Ok(records) => {
            for record in records {
                println!("  {} {}", "•".cyan(), record.memory);
            }
        }
        Err(err) => print_failure(&err),
    }
}

fn show_history(session: &Session) {
    let transcript = session.transcript();
    if transcript.is_empty() {
        println!("{}", "Nothing said yet.".dimmed());
        return;
    }
    for entry in transcript {
        let speaker = match entry.role {
            Role::User => "you".green().bold(),
            _ => "solace".cyan().bold(),
        };
        println!("{speaker}: {}", entry.content);
    }
}

fn show_help() {
    println!("  /voice        say one thing aloud");
    println!("  /voice-mode   keep listening until Ctrl-C");
    println!("  /memories     show what I remember");
    println!("  /clear        start the conversation over");
    println!("  /history      show this conversation");
    println!("  /quit         leave (Ctrl-C or Ctrl-D also work)");
}

fn print_failure(err: &SessionError) {
    warn!(error = %err, "Turn failed");
    eprintln!("{} {}", "error:".red().bold(), err);
}
