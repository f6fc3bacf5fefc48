pub mod chat;
pub mod listen;
pub mod memories;

use std::future::Future;

use colored::Colorize;
use solace_ai::Recognition;
use solace_core::{Turn, VoiceEvent};

/// Terminal rendering shared by `chat` and `listen`.
pub(crate) fn print_reply(turn: &Turn) {
    println!("{} {}\n", "solace ›".cyan().bold(), turn.reply);
    print_turn_warnings(turn);
}

pub(crate) fn print_turn_warnings(turn: &Turn) {
    if let Some(err) = &turn.persist_error {
        eprintln!("{} memory not saved: {}", "warning:".yellow().bold(), err);
    }
    if let Some(err) = &turn.speech_error {
        eprintln!("{} could not speak reply: {}", "warning:".yellow().bold(), err);
    }
}

pub(crate) fn print_voice_event(event: VoiceEvent<'_>) {
    match event {
        VoiceEvent::Listening => println!("{}", "listening...".dimmed()),
        VoiceEvent::Heard(text) => println!("{} {}", "you ›".green().bold(), text),
        VoiceEvent::Replied(turn) => print_reply(turn),
        VoiceEvent::Skipped(Recognition::NoSpeech) => {
            println!("{}", "no speech detected, listening again".dimmed())
        }
        VoiceEvent::Skipped(_) => println!("{}", "didn't catch that, try again".dimmed()),
        VoiceEvent::Failed(err) => eprintln!("{} {}", "error:".red().bold(), err),
    }
}

/// Resolves on Ctrl-C; a handler failure leaves the loop running.
pub(crate) async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Run `work` unless `interrupt` fires first.
///
/// Once `ctrl_c` has been awaited the process keeps its SIGINT handler, so
/// every await that can block on the user or the network goes through here.
pub(crate) async fn interruptible<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = ()>,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = interrupt => None,
        out = work => Some(out),
    }
}
