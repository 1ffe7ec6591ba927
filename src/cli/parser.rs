//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::generation::GenerationMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// chatforge: streaming chat relay and project archive builder.
///
/// Serves a chat endpoint that relays model output chunk by chunk, and
/// turns marker-delimited model output into downloadable zip archives.
#[derive(Parser, Debug)]
#[command(name = "chatforge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the chat history database.
    ///
    /// Defaults to `.chatforge/history.db` in the current directory.
    #[arg(short, long, env = "CHATFORGE_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the history database.
    ///
    /// Creates the database file and schema if they don't exist.
    Init {
        /// Force re-initialization (destroys existing history).
        #[arg(short, long)]
        force: bool,
    },

    /// Show history database status.
    Status,

    /// Delete all recorded messages.
    Reset {
        /// Skip confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Run the HTTP server.
    Serve(ServeArgs),

    /// Build a zip archive from marker-delimited text.
    Pack {
        /// Input file, or `-` for stdin.
        input: PathBuf,

        /// Output archive path.
        #[arg(short, long, default_value = crate::archive::ARCHIVE_FILE_NAME)]
        output: PathBuf,

        /// Maximum total content bytes.
        #[arg(long)]
        max_bytes: Option<usize>,
    },

    /// List the files declared in marker-delimited text.
    Files {
        /// Input file, or `-` for stdin.
        input: PathBuf,
    },

    /// Send one prompt to the model and print the reply.
    Chat(ChatArgs),

    /// Show recorded messages.
    History {
        /// Only show messages of this owner.
        #[arg(short, long)]
        owner: Option<String>,

        /// Maximum number of messages.
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

/// Model backend settings shared by `serve` and `chat`.
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// Hugging Face model identifier.
    #[arg(long, env = "HF_MODEL", default_value = crate::generation::huggingface::DEFAULT_MODEL)]
    pub hf_model: String,

    /// Hugging Face API token.
    #[arg(long, env = "HF_API_KEY", hide_env_values = true)]
    pub hf_api_key: Option<String>,

    /// Inference API root.
    #[arg(long, env = "HF_BASE_URL", default_value = crate::generation::huggingface::DEFAULT_BASE_URL)]
    pub hf_base_url: String,

    /// How the backend delivers replies.
    #[arg(long, value_enum, default_value_t = GenerationMode::OneShot)]
    pub generation: GenerationMode,

    /// Cap on generated tokens.
    #[arg(long, default_value = "1024")]
    pub max_new_tokens: u32,

    /// Backend request timeout in seconds.
    #[arg(long, default_value = "60")]
    pub timeout_secs: u64,
}

/// Relay pacing settings shared by `serve` and `chat`.
#[derive(Args, Debug, Clone)]
pub struct RelayArgs {
    /// Segmentation strategy for complete replies (fixed, grapheme).
    #[arg(long, default_value = "fixed")]
    pub segmenter: String,

    /// Units per relayed chunk.
    #[arg(long, default_value = "30")]
    pub chunk_size: usize,

    /// Pause after each relayed chunk in milliseconds.
    #[arg(long, default_value = "40")]
    pub chunk_delay_ms: u64,
}

/// Arguments of the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "CHATFORGE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind.
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    #[command(flatten)]
    pub backend: BackendArgs,

    #[command(flatten)]
    pub relay: RelayArgs,

    /// Maximum total content bytes of a downloaded archive.
    #[arg(long)]
    pub max_archive_bytes: Option<usize>,

    /// Maximum request body size in bytes.
    #[arg(long, default_value = "10485760")]
    pub body_limit: usize,

    /// Do not record chat history.
    #[arg(long)]
    pub no_history: bool,
}

/// Arguments of the `chat` command.
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Prompt text.
    pub prompt: String,

    /// Conversation owner recorded in history.
    #[arg(short, long, default_value = "cli")]
    pub owner: String,

    /// Print chunks as they arrive instead of the whole reply.
    #[arg(short, long)]
    pub stream: bool,

    /// Do not record chat history.
    #[arg(long)]
    pub no_history: bool,

    #[command(flatten)]
    pub backend: BackendArgs,

    #[command(flatten)]
    pub relay: RelayArgs,
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}
