use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "solace")]
#[command(version, about = "Solace - a calm, empathetic listener with memory")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to ~/.solace/config.toml)
    #[arg(long, global = true, env = "SOLACE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Chat model
    #[arg(long, global = true, env = "SOLACE_MODEL")]
    pub model: Option<String>,

    /// Memory user id
    #[arg(long, global = true, env = "SOLACE_USER_ID")]
    pub user_id: Option<String>,

    /// Voice used for spoken replies (alloy, echo, fable, onyx, nova, shimmer, coral, sage)
    #[arg(long, global = true, env = "SOLACE_VOICE")]
    pub voice: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive session (default)
    Chat(ChatArgs),

    /// Listen continuously and answer aloud until Ctrl-C
    Listen(ListenArgs),

    /// Show stored memories
    Memories(MemoriesArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct ChatArgs {
    /// Do not speak replies aloud
    #[arg(long)]
    pub no_speech: bool,
}

#[derive(Args, Debug, Default)]
pub struct ListenArgs {
    /// Stop after this many listening cycles
    #[arg(long)]
    pub max_cycles: Option<usize>,
}

#[derive(Args, Debug)]
pub struct MemoriesArgs {
    /// Maximum number of memories to show
    #[arg(short, long, default_value_t = 5)]
    pub limit: usize,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}
