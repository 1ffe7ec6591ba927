//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Synchronous commands
//! return their output; `serve` and `chat` run on a Tokio runtime built
//! here.

use crate::archive::{ArchivePolicy, build_archive, list_files};
use crate::cli::output::{
    OutputFormat, format_files, format_history, format_pack, format_reply, format_status,
};
use crate::cli::parser::{ChatArgs, Cli, Commands, ServeArgs};
use crate::core::{ChatTurn, StreamChunk};
use crate::error::{CommandError, Result, StorageError};
use crate::generation::HuggingFaceGenerator;
use crate::io::{read_input, write_bytes};
use crate::relay::ChatService;
use crate::server::config::{RelaySettings, backend_config};
use crate::server::{ServerConfig, serve};
use crate::storage::{SharedStorage, SqliteStorage, Storage, shared};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init { force } => cmd_init(&db_path, *force),
        Commands::Status => cmd_status(&db_path, format),
        Commands::Reset { yes } => cmd_reset(&db_path, *yes),
        Commands::Serve(args) => cmd_serve(&db_path, args),
        Commands::Pack {
            input,
            output,
            max_bytes,
        } => cmd_pack(input, output, *max_bytes, format),
        Commands::Files { input } => cmd_files(input, format),
        Commands::Chat(args) => cmd_chat(&db_path, args, format),
        Commands::History { owner, limit } => {
            cmd_history(&db_path, owner.as_deref(), *limit, format)
        }
    }
}

/// Opens storage and ensures it's initialized.
fn open_storage(db_path: &Path) -> Result<SqliteStorage> {
    let storage = SqliteStorage::open(db_path)?;

    if !storage.is_initialized()? {
        return Err(StorageError::NotInitialized.into());
    }

    Ok(storage)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CommandError::ExecutionFailed(format!("failed to start runtime: {e}")).into())
}

// ==================== Command Implementations ====================

fn cmd_init(db_path: &Path, force: bool) -> Result<String> {
    if db_path.exists() && !force {
        return Err(CommandError::ExecutionFailed(
            "Database already exists. Use --force to reinitialize.".to_string(),
        )
        .into());
    }

    if force && db_path.exists() {
        std::fs::remove_file(db_path).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to remove existing database: {e}"))
        })?;
    }

    let mut storage = SqliteStorage::open(db_path)?;
    storage.init()?;

    tracing::info!(path = %db_path.display(), "initialized history database");
    Ok(format!(
        "Initialized chatforge database at: {}\n",
        db_path.display()
    ))
}

fn cmd_status(db_path: &Path, format: OutputFormat) -> Result<String> {
    let storage = open_storage(db_path)?;
    let stats = storage.stats()?;
    Ok(format_status(&stats, db_path, format))
}

fn cmd_reset(db_path: &Path, yes: bool) -> Result<String> {
    if !yes {
        return Err(CommandError::ExecutionFailed(
            "Use --yes to confirm reset. This will delete all chat history.".to_string(),
        )
        .into());
    }

    let mut storage = open_storage(db_path)?;
    let removed = storage.message_count()?;
    storage.reset()?;

    Ok(format!("Deleted {removed} message(s).\n"))
}

fn cmd_serve(db_path: &Path, args: &ServeArgs) -> Result<String> {
    let config = ServerConfig::from_args(args)?;

    let storage = if config.record_history {
        let mut storage = SqliteStorage::open(db_path)?;
        storage.init()?;
        Some(shared(storage))
    } else {
        None
    };

    runtime()?.block_on(serve(config, storage))?;
    Ok(String::new())
}

fn cmd_pack(
    input: &Path,
    output: &Path,
    max_bytes: Option<usize>,
    format: OutputFormat,
) -> Result<String> {
    let text = read_input(input)?;
    let policy = ArchivePolicy {
        max_total_bytes: max_bytes,
    };

    let archive = build_archive(&text, &policy)?;
    write_bytes(output, &archive.bytes)?;

    Ok(format_pack(&archive, output, format))
}

fn cmd_files(input: &Path, format: OutputFormat) -> Result<String> {
    let text = read_input(input)?;
    let files = list_files(&text)?;
    Ok(format_files(&files, format))
}

fn cmd_chat(db_path: &Path, args: &ChatArgs, format: OutputFormat) -> Result<String> {
    let turn = ChatTurn::prompt(args.owner.clone(), args.prompt.clone()).ok_or_else(|| {
        CommandError::InvalidArgument("owner and prompt must not be empty".to_string())
    })?;

    let generator = Arc::new(HuggingFaceGenerator::new(backend_config(&args.backend)?)?);
    let policy = RelaySettings::from(&args.relay).policy()?;
    let mut service = ChatService::new(generator, policy);
    if !args.no_history {
        let storage: SharedStorage = shared(open_storage(db_path)?);
        service = service.with_storage(storage);
    }

    let runtime = runtime()?;

    if !args.stream {
        let reply = runtime.block_on(service.reply(&turn));
        if reply.failed {
            return Err(CommandError::ExecutionFailed(format!(
                "{} (run with --verbose for details)",
                reply.text
            ))
            .into());
        }
        return Ok(format_reply(&reply.text, reply.failed, format));
    }

    let outcome = runtime.block_on(async {
        let (tx, rx) = mpsc::channel(32);
        let print = async move {
            if let Err(e) = print_chunks(rx, std::io::stdout()).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                tracing::warn!(error = %e, "failed to write reply to stdout");
            }
        };
        let (outcome, ()) = tokio::join!(service.respond(&turn, tx), print);
        outcome
    });

    if outcome.is_failed() {
        return Err(CommandError::ExecutionFailed("generation failed".to_string()).into());
    }
    Ok(String::new())
}

/// Writes chunks to `out` as they arrive.
///
/// Returns on the first write error, dropping `rx` so the relay sees the
/// client as gone.
async fn print_chunks<W: Write>(
    mut rx: mpsc::Receiver<StreamChunk>,
    mut out: W,
) -> std::io::Result<()> {
    while let Some(chunk) = rx.recv().await {
        match chunk {
            StreamChunk::Token(text) => {
                write!(out, "{text}")?;
                out.flush()?;
            }
            StreamChunk::Done => writeln!(out)?,
        }
    }
    Ok(())
}

fn cmd_history(
    db_path: &Path,
    owner: Option<&str>,
    limit: usize,
    format: OutputFormat,
) -> Result<String> {
    let storage = open_storage(db_path)?;
    let messages = storage.history(owner, limit)?;
    Ok(format_history(&messages, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChatMessage, Role};
    use crate::error::Error;
    use clap::Parser;
    use tempfile::TempDir;

    fn run(args: &[&str]) -> Result<String> {
        let mut argv = vec!["chatforge"];
        argv.extend_from_slice(args);
        execute(&Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_init_status_reset() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("nested/history.db");
        let db = db.to_str().unwrap();

        let output = run(&["--db-path", db, "init"]).unwrap();
        assert!(output.contains("Initialized"));
        assert!(run(&["--db-path", db, "init"]).is_err());
        assert!(run(&["--db-path", db, "init", "--force"]).is_ok());

        let mut storage = open_storage(Path::new(db)).unwrap();
        storage
            .record(&ChatMessage::new("alice", Role::User, "hi"))
            .unwrap();
        drop(storage);

        let status = run(&["--db-path", db, "status"]).unwrap();
        assert!(status.contains("Messages:      1"));

        assert!(run(&["--db-path", db, "reset"]).is_err());
        let output = run(&["--db-path", db, "reset", "--yes"]).unwrap();
        assert_eq!(output, "Deleted 1 message(s).\n");
    }

    #[test]
    fn test_status_requires_init() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("history.db");
        let result = run(&["--db-path", db.to_str().unwrap(), "status"]);
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::NotInitialized))
        ));
    }

    #[test]
    fn test_history_command() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("history.db");
        let db = db.to_str().unwrap();
        run(&["--db-path", db, "init"]).unwrap();

        let mut storage = open_storage(Path::new(db)).unwrap();
        storage
            .record(&ChatMessage::new("alice", Role::User, "hi"))
            .unwrap();
        storage
            .record(&ChatMessage::new("bob", Role::User, "yo"))
            .unwrap();
        drop(storage);

        let output = run(&["--db-path", db, "history", "--owner", "bob"]).unwrap();
        assert!(output.contains("bob (user): yo"));
        assert!(!output.contains("alice"));
    }

    #[test]
    fn test_pack_and_files() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("reply.txt");
        let output = dir.path().join("out/project.zip");
        std::fs::write(
            &input,
            "Sure!\n=== file: a.txt ===\nhello\n=== file: b/c.txt ===\nworld\n",
        )
        .unwrap();

        let listing = run(&["--format", "json", "files", input.to_str().unwrap()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&listing).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);

        let result = run(&[
            "pack",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        assert!(result.contains("2 file(s)"));
        assert!(output.exists());
    }

    #[test]
    fn test_pack_rejects_unmarked_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("reply.txt");
        std::fs::write(&input, "no markers here").unwrap();

        let output = dir.path().join("project.zip");
        let result = run(&[
            "pack",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ]);
        assert!(matches!(result, Err(Error::Archive(_))));
        assert!(!output.exists());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_print_chunks_writes_reply() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamChunk::token("hel")).await.unwrap();
        tx.send(StreamChunk::token("lo")).await.unwrap();
        tx.send(StreamChunk::Done).await.unwrap();
        drop(tx);

        let mut out = Vec::new();
        print_chunks(rx, &mut out).await.unwrap();
        assert_eq!(out, b"hello\n");
    }

    #[tokio::test]
    async fn test_print_chunks_stops_on_broken_pipe() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(StreamChunk::token("a")).await.unwrap();
        tx.send(StreamChunk::token("b")).await.unwrap();

        let err = print_chunks(rx, ClosedPipe).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
        // The receiver is gone, so the relay sees a closed sink
        assert!(tx.is_closed());
    }

    #[test]
    fn test_pack_size_cap() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("reply.txt");
        std::fs::write(&input, "=== file: a.txt ===\n0123456789").unwrap();

        let output = dir.path().join("project.zip");
        let result = run(&[
            "pack",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--max-bytes",
            "4",
        ]);
        assert!(result.is_err());
    }
}
