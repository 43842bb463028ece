//! CLI command implementations

/// Argument definitions and command execution
pub mod commands;
/// CLI error type
pub mod error;

pub use commands::{Cli, Commands, CrawlArgs, Phase, PollArgs, RunArgs};
pub use error::CliError;
