//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::archive::ProjectArchive;
use crate::core::{ChatMessage, FileBlock};
use crate::error::Error;
use crate::storage::StorageStats;
use serde::Serialize;
use serde_json::json;
use std::fmt::Write;
use std::path::Path;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats a status response.
#[must_use]
pub fn format_status(stats: &StorageStats, db_path: &Path, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats, db_path),
        OutputFormat::Json => format_json(stats),
    }
}

fn format_status_text(stats: &StorageStats, db_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("chatforge status\n");
    output.push_str("================\n\n");
    let _ = writeln!(output, "  Database:      {}", db_path.display());
    let _ = writeln!(output, "  Messages:      {}", stats.message_count);
    let _ = writeln!(output, "    user:        {}", stats.user_messages);
    let _ = writeln!(output, "    assistant:   {}", stats.assistant_messages);
    let _ = writeln!(output, "  Owners:        {}", stats.owner_count);
    let _ = writeln!(
        output,
        "  Content size:  {}",
        format_size(stats.total_content_size)
    );
    let _ = writeln!(output, "  Schema:        v{}", stats.schema_version);
    if let Some(size) = stats.db_size {
        let _ = writeln!(output, "  DB size:       {size} bytes");
    }
    output
}

#[derive(Serialize)]
struct FileEntry<'a> {
    path: &'a str,
    size: usize,
    lines: usize,
}

/// Formats the manifest of a project text.
#[must_use]
pub fn format_files(files: &[FileBlock], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_files_text(files),
        OutputFormat::Json => {
            let entries: Vec<FileEntry<'_>> = files
                .iter()
                .map(|f| FileEntry {
                    path: &f.path,
                    size: f.size(),
                    lines: f.line_count(),
                })
                .collect();
            format_json(&entries)
        }
    }
}

fn format_files_text(files: &[FileBlock]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{:<50} {:>10} {:>8}", "Path", "Size", "Lines");
    output.push_str(&"-".repeat(70));
    output.push('\n');

    for file in files {
        let _ = writeln!(
            output,
            "{:<50} {:>10} {:>8}",
            truncate(&file.path, 50),
            format_size(file.size()),
            file.line_count()
        );
    }

    let total: usize = files.iter().map(FileBlock::size).sum();
    let _ = writeln!(
        output,
        "\n{} file(s), {}",
        files.len(),
        format_size(total)
    );
    output
}

/// Formats the result of writing an archive.
#[must_use]
pub fn format_pack(archive: &ProjectArchive, output_path: &Path, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(
                output,
                "Wrote {} ({} file(s), {})",
                output_path.display(),
                archive.entries(),
                format_size(archive.size())
            );
            for path in &archive.paths {
                let _ = writeln!(output, "  {path}");
            }
            output
        }
        OutputFormat::Json => format_json(&json!({
            "output": output_path.to_string_lossy(),
            "entries": archive.entries(),
            "bytes": archive.size(),
            "paths": archive.paths,
        })),
    }
}

/// Formats recorded messages.
#[must_use]
pub fn format_history(messages: &[ChatMessage], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_history_text(messages),
        OutputFormat::Json => format_json(&messages),
    }
}

fn format_history_text(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return "No messages recorded.\n".to_string();
    }

    let mut output = String::new();
    for message in messages {
        let id = message.id.map_or_else(|| "-".to_string(), |i| i.to_string());
        let _ = writeln!(
            output,
            "[{id}] {} ({}): {}",
            message.owner_id,
            message.role,
            truncate(&message.content.replace('\n', " "), 100)
        );
    }
    output
}

/// Formats a whole chat reply.
#[must_use]
pub fn format_reply(text: &str, failed: bool, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{text}\n"),
        OutputFormat::Json => format_json(&json!({ "reply": text, "failed": failed })),
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => format_json(&json!({ "error": error.to_string() })),
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    let mut output = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    output.push('\n');
    output
}

/// Formats a byte size as human-readable.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Truncates a string to `max_chars` characters with ellipsis.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return s.chars().take(max_chars).collect();
    }
    let head: String = s.chars().take(max_chars - 3).collect();
    format!("{head}...")
}
