//! Build environment management
//!
//! This module provides the per-package environment handed to subprocesses,
//! directory management and shell command execution.

mod directories;
mod execution;
mod variables;

// Re-export public API
pub use directories::{create_dir, BuildDirectories};
pub use execution::{join_command, run_shell, CommandOutput};
pub use variables::ToolchainEnvironment;
