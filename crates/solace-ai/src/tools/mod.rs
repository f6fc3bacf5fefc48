//! Tools the conversation graph can execute on the model's behalf.
//!
//! Tools implement the `Tool` trait and are looked up by name in a
//! `ToolRegistry` when the model requests them.

mod host_action;
mod registry;
mod traits;

use std::path::PathBuf;

pub use host_action::{ActionRejection, CommandOutput, HostAction, RunCommandTool};
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolOutput, ToolSchema};

/// Create a registry with the default tools, running host actions in `workdir`.
pub fn default_registry(workdir: impl Into<PathBuf>, timeout_secs: u64) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        RunCommandTool::new()
            .with_workdir(workdir)
            .with_timeout(timeout_secs),
    );
    registry
}
