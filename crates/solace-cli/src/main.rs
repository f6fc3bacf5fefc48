mod cli;
mod commands;
mod completions;
mod error;
mod output;
mod setup;
mod welcome;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use solace_core::paths;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(Commands::Completions { shell }) = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    // Logs go to a file so the terminal stays clean for the conversation
    let log_dir = paths::logs_dir()?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "solace.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    let settings = setup::load_settings(&cli)?;

    match cli.command {
        None => commands::chat::run(&settings, Default::default()).await,
        Some(Commands::Chat(args)) => commands::chat::run(&settings, args).await,
        Some(Commands::Listen(args)) => commands::listen::run(&settings, args).await,
        Some(Commands::Memories(args)) => commands::memories::run(&settings, args).await,
        Some(Commands::Completions { .. }) => Ok(()),
    }
}
