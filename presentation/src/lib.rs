//! Presentation layer for endorse
//!
//! This crate contains CLI definitions, output formatters
//! and deployment progress reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{
    CallArgs, ChannelCommand, ChannelConfigArgs, Cli, Command, DeployArgs, OutputFormat,
};
pub use output::console::ConsoleFormatter;
pub use output::formatter::OutputFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
