//! Host command tool restricted to a closed set of read-only actions.
//!
//! The model asks for `run_command(cmd = "...")`. The command string is parsed
//! into a [`HostAction`]; anything outside the allow-list is refused and the
//! refusal is returned to the model as the tool result. Allowed actions run as
//! a direct program invocation (never through a shell) with:
//! - a fixed working directory
//! - a timeout (default 30s)
//! - output truncation for large outputs

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

use super::traits::{Tool, ToolOutput};
use crate::error::Result;

/// Default timeout for command execution in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum output size in bytes (16KB)
const DEFAULT_MAX_OUTPUT_BYTES: usize = 16_000;

const LS_FLAGS: &[&str] = &["-l", "-a", "-la", "-al", "-1", "-lh", "-h"];

static SHELL_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[;&|$<>`\\(){}\[\]*?~!"'\n\r]"#).expect("valid regex"));

/// Why a requested command was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionRejection {
    #[error("empty command")]
    Empty,

    #[error("shell syntax is not permitted ('{0}')")]
    ShellSyntax(String),

    #[error("'{0}' is not an allowed action (allowed: ls, pwd, date, whoami, uptime)")]
    NotAllowed(String),

    #[error("'{action}' does not accept the argument '{argument}'")]
    UnexpectedArgument { action: String, argument: String },

    #[error("path '{0}' must be relative and stay inside the working directory")]
    PathEscapes(String),
}

/// The complete set of host actions the assistant may perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostAction {
    ListDirectory {
        flags: Vec<String>,
        path: Option<PathBuf>,
    },
    PrintWorkingDirectory,
    Date,
    WhoAmI,
    Uptime,
}

impl HostAction {
    /// Parse a model-provided command line into an allowed action.
    pub fn parse(cmd: &str) -> std::result::Result<Self, ActionRejection> {
        let cmd = cmd.trim();
        if cmd.is_empty() {
            return Err(ActionRejection::Empty);
        }
        if let Some(found) = SHELL_SYNTAX.find(cmd) {
            return Err(ActionRejection::ShellSyntax(found.as_str().to_string()));
        }

        let mut parts = cmd.split_whitespace();
        let program = parts.next().ok_or(ActionRejection::Empty)?;
        let args: Vec<&str> = parts.collect();

        match program {
            "ls" => Self::parse_ls(&args),
            "pwd" => Self::no_args(program, &args, HostAction::PrintWorkingDirectory),
            "date" => Self::no_args(program, &args, HostAction::Date),
            "whoami" => Self::no_args(program, &args, HostAction::WhoAmI),
            "uptime" => Self::no_args(program, &args, HostAction::Uptime),
            other => Err(ActionRejection::NotAllowed(other.to_string())),
        }
    }

    fn no_args(
        program: &str,
        args: &[&str],
        action: HostAction,
    ) -> std::result::Result<Self, ActionRejection> {
        match args.first() {
            None => Ok(action),
            Some(arg) => Err(ActionRejection::UnexpectedArgument {
                action: program.to_string(),
                argument: arg.to_string(),
            }),
        }
    }

    fn parse_ls(args: &[&str]) -> std::result::Result<Self, ActionRejection> {
        let mut flags = Vec::new();
        let mut path = None;

        for arg in args {
            if arg.starts_with('-') {
                if !LS_FLAGS.contains(arg) {
                    return Err(ActionRejection::UnexpectedArgument {
                        action: "ls".to_string(),
                        argument: arg.to_string(),
                    });
                }
                flags.push(arg.to_string());
                continue;
            }

            if path.is_some() {
                return Err(ActionRejection::UnexpectedArgument {
                    action: "ls".to_string(),
                    argument: arg.to_string(),
                });
            }
            path = Some(validate_relative_path(arg)?);
        }

        Ok(HostAction::ListDirectory { flags, path })
    }

    /// Program and arguments to spawn for this action.
    fn invocation(&self) -> (&'static str, Vec<String>) {
        match self {
            HostAction::ListDirectory { flags, path } => {
                let mut args = flags.clone();
                if let Some(path) = path {
                    args.push("--".to_string());
                    args.push(path.to_string_lossy().into_owned());
                }
                ("ls", args)
            }
            HostAction::PrintWorkingDirectory => ("pwd", Vec::new()),
            HostAction::Date => ("date", Vec::new()),
            HostAction::WhoAmI => ("whoami", Vec::new()),
            HostAction::Uptime => ("uptime", Vec::new()),
        }
    }
}

fn validate_relative_path(raw: &str) -> std::result::Result<PathBuf, ActionRejection> {
    let path = Path::new(raw);
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(ActionRejection::PathEscapes(raw.to_string()));
    }
    Ok(path.to_path_buf())
}

/// Input parameters for `run_command`
#[derive(Debug, Deserialize)]
pub struct RunCommandInput {
    /// Command line requested by the model
    pub cmd: String,
}

/// Output from an executed host action
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Whether output was truncated
    pub truncated: bool,
    /// Execution time in milliseconds
    pub duration_ms: u64,
}

/// Allow-listed host command tool
#[derive(Clone)]
pub struct RunCommandTool {
    /// Directory every action runs in
    workdir: Option<PathBuf>,
    /// Command timeout in seconds
    timeout_secs: u64,
    /// Maximum output size in bytes
    max_output_bytes: usize,
}

impl Default for RunCommandTool {
    fn default() -> Self {
        Self::new()
    }
}

impl RunCommandTool {
    pub fn new() -> Self {
        Self {
            workdir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Set the working directory for actions
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Set command timeout in seconds
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set maximum output size in bytes
    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    async fn run_action(&self, action: &HostAction) -> std::io::Result<CommandOutput> {
        let (program, args) = action.invocation();
        let mut command = Command::new(program);
        command
            .args(&args)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(workdir) = &self.workdir {
            command.current_dir(workdir);
        }

        let started = Instant::now();
        let output = command.output().await?;

        let (stdout, stdout_truncated) = self.truncate_output(&output.stdout);
        let (stderr, stderr_truncated) = self.truncate_output(&output.stderr);

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
            truncated: stdout_truncated || stderr_truncated,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Truncate output if it exceeds max size
    fn truncate_output(&self, bytes: &[u8]) -> (String, bool) {
        if bytes.len() <= self.max_output_bytes {
            return (String::from_utf8_lossy(bytes).into_owned(), false);
        }

        let text = String::from_utf8_lossy(&bytes[..self.max_output_bytes]);
        (
            format!(
                "{}...\n[Output truncated, {} bytes total]",
                text,
                bytes.len()
            ),
            true,
        )
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Runs a simple, read-only command on the user's machine and returns its exit status and output. \
         Only these commands are available: ls [flags] [relative path], pwd, date, whoami, uptime. \
         Example: run_command(cmd=\"ls\") lists the files in the working directory."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "cmd": {
                    "type": "string",
                    "description": "The command line to run, e.g. \"ls\" or \"date\"."
                }
            },
            "required": ["cmd"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: RunCommandInput = serde_json::from_value(input)?;

        let action = match HostAction::parse(&params.cmd) {
            Ok(action) => action,
            Err(rejection) => {
                tracing::warn!(cmd = %params.cmd, reason = %rejection, "Host action refused");
                return Ok(ToolOutput::error(format!("Action blocked: {}", rejection)));
            }
        };

        tracing::info!(action = ?action, "Running host action");

        let result = timeout(
            Duration::from_secs(self.timeout_secs),
            self.run_action(&action),
        )
        .await;

        match result {
            Ok(Ok(output)) => Ok(ToolOutput::success(serde_json::to_value(output)?)),
            Ok(Err(e)) => Ok(ToolOutput::error(format!(
                "Failed to run '{}': {}",
                params.cmd.trim(),
                e
            ))),
            Err(_) => Ok(ToolOutput::error(format!(
                "Command timed out after {} seconds",
                self.timeout_secs
            ))),
        }
    }
}
