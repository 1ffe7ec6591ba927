//! Zip encoding of an archive manifest.
//!
//! The whole archive is built in memory. Member names are the declared
//! paths verbatim, so `b/c.txt` lands in a `b/` directory when extracted;
//! directory entries are never written explicitly.

use crate::core::ArchiveManifest;
use crate::error::ArchiveError;
use std::io::{Cursor, Write};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Permission bits recorded for every member.
const MEMBER_PERMISSIONS: u32 = 0o644;

/// Encodes `manifest` as a deflate-compressed zip archive.
///
/// # Errors
///
/// Returns [`ArchiveError::Write`] if the zip encoder fails.
pub fn write_zip(manifest: &ArchiveManifest) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(MEMBER_PERMISSIONS);

    for block in manifest {
        writer.start_file(block.path.as_str(), options)?;
        writer.write_all(block.content.as_bytes())?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
