//! I/O utilities for chatforge.
//!
//! Reads project texts from files or stdin, memory-mapping large files, and
//! writes built archives to disk.

pub mod reader;

pub use reader::{FileReader, STDIN_PATH, read_file, read_input, write_bytes};
