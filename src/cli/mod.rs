//! CLI layer for chatforge.
//!
//! Provides the command-line interface using clap: serving the HTTP API,
//! packing project archives, one-off chats and managing the history
//! database.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{BackendArgs, ChatArgs, Cli, Commands, RelayArgs, ServeArgs};
