//! Archive assembly for project texts.
//!
//! Turns a marker-delimited text (one "project" holding several named files)
//! into an in-memory zip archive. The pipeline is pure: scan the text into
//! [`FileBlock`]s, fold them into an [`ArchiveManifest`] (last write wins),
//! check the size policy, then encode. Nothing touches the filesystem.

pub mod scanner;
pub mod writer;

pub use scanner::{MARKER_PREFIX, MARKER_SUFFIX, marker_path, scan_blocks};
pub use writer::write_zip;

use crate::core::{ArchiveManifest, FileBlock};
use crate::error::ArchiveError;

/// Suggested download name for a built archive.
pub const ARCHIVE_FILE_NAME: &str = "project.zip";

/// Content type of a built archive.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Limits applied while building an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchivePolicy {
    /// Maximum total content bytes across all members (None = unlimited).
    pub max_total_bytes: Option<usize>,
}

impl ArchivePolicy {
    /// Creates a policy with no limits.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_total_bytes: None,
        }
    }

    /// Creates a policy capping total content bytes.
    #[must_use]
    pub const fn with_max_total_bytes(max: usize) -> Self {
        Self {
            max_total_bytes: Some(max),
        }
    }

    fn check(&self, manifest: &ArchiveManifest) -> Result<(), ArchiveError> {
        if let Some(max) = self.max_total_bytes {
            let size = manifest.total_content_bytes();
            if size > max {
                return Err(ArchiveError::OversizedContent { size, max });
            }
        }
        Ok(())
    }
}

/// A built archive, ready to be saved or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectArchive {
    /// Encoded zip bytes.
    pub bytes: Vec<u8>,
    /// Member paths in archive order.
    pub paths: Vec<String>,
}

impl ProjectArchive {
    /// Returns the number of members.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.paths.len()
    }

    /// Returns the encoded size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Parses a project text into a manifest.
///
/// Blocks are kept in first-seen path order; a repeated path keeps its
/// original position but takes the later content.
#[must_use]
pub fn parse_manifest(text: &str) -> ArchiveManifest {
    scan_blocks(text).into_iter().collect()
}

/// Builds a zip archive from a project text.
///
/// # Errors
///
/// - [`ArchiveError::EmptyInput`] if no marker matched.
/// - [`ArchiveError::OversizedContent`] if the policy cap is exceeded.
/// - [`ArchiveError::Write`] if encoding fails.
///
/// # Examples
///
/// ```
/// use chatforge::archive::{ArchivePolicy, build_archive};
///
/// let text = "=== file: a.txt ===\nhello\n=== file: b/c.txt ===\nworld";
/// let archive = build_archive(text, &ArchivePolicy::default()).unwrap();
/// assert_eq!(archive.paths, vec!["a.txt", "b/c.txt"]);
///
/// assert!(build_archive("no markers here", &ArchivePolicy::default()).is_err());
/// ```
pub fn build_archive(text: &str, policy: &ArchivePolicy) -> Result<ProjectArchive, ArchiveError> {
    let manifest = parse_manifest(text);
    if manifest.is_empty() {
        return Err(ArchiveError::EmptyInput);
    }
    policy.check(&manifest)?;

    let bytes = write_zip(&manifest)?;
    let paths = manifest.iter().map(|block| block.path.clone()).collect();

    tracing::debug!(
        entries = manifest.len(),
        content_bytes = manifest.total_content_bytes(),
        archive_bytes = bytes.len(),
        "built project archive"
    );

    Ok(ProjectArchive { bytes, paths })
}

/// Lists the manifest of a project text without encoding it.
///
/// # Errors
///
/// Returns [`ArchiveError::EmptyInput`] if no marker matched.
pub fn list_files(text: &str) -> Result<Vec<FileBlock>, ArchiveError> {
    let manifest = parse_manifest(text);
    if manifest.is_empty() {
        return Err(ArchiveError::EmptyInput);
    }
    Ok(manifest.into_blocks())
}
