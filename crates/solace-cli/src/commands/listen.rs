use anyhow::{Result, bail};
use colored::Colorize;
use solace_core::{Settings, VoiceLoop};

use super::{ctrl_c, print_voice_event};
use crate::cli::ListenArgs;
use crate::setup::{Devices, build_session};

pub async fn run(settings: &Settings, args: ListenArgs) -> Result<()> {
    if !cfg!(feature = "audio") {
        bail!("listen needs a build with audio support");
    }

    let mut session = build_session(
        settings,
        Devices {
            microphone: true,
            speaker: true,
        },
    )
    .await?;

    println!("{}", "Listening. Press Ctrl-C to stop.".dimmed());
    let mut voice_loop = VoiceLoop::new();
    if let Some(max) = args.max_cycles {
        voice_loop = voice_loop.with_max_cycles(max);
    }

    let summary = voice_loop
        .run(&mut session, ctrl_c(), print_voice_event)
        .await?;

    println!(
        "\n{} {} turns over {} listens ({} failed)",
        "Stopped.".bold(),
        summary.turns,
        summary.cycles,
        summary.failures
    );
    println!("{}", solace_core::DISCLAIMER.dimmed());
    Ok(())
}
