//! File blocks and the archive manifest.
//!
//! A [`FileBlock`] is one `(path, content)` pair cut out of a marker-delimited
//! text. An [`ArchiveManifest`] is the ordered, de-duplicated set of blocks
//! that becomes one archive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single named file parsed out of a project text.
///
/// # Examples
///
/// ```
/// use chatforge::core::FileBlock;
///
/// let block = FileBlock::new("src/main.rs", "fn main() {}");
/// assert_eq!(block.path, "src/main.rs");
/// assert_eq!(block.size(), 12);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBlock {
    /// Declared path, trimmed. Never empty.
    pub path: String,

    /// File content, trimmed at both ends.
    pub content: String,
}

impl FileBlock {
    /// Creates a new file block.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Returns the content size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Counts content lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

/// Ordered set of file blocks keyed by path.
///
/// Entries keep the position at which their path was first seen; a later
/// block with the same path replaces the content in place (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveManifest {
    entries: Vec<FileBlock>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl ArchiveManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a block, replacing the content of an existing entry with the
    /// same path.
    ///
    /// Returns `true` if an earlier entry was overwritten.
    pub fn insert(&mut self, block: FileBlock) -> bool {
        if let Some(&position) = self.positions.get(&block.path) {
            self.entries[position].content = block.content;
            true
        } else {
            self.positions.insert(block.path.clone(), self.entries.len());
            self.entries.push(block);
            false
        }
    }

    /// Returns the number of unique paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if no block has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileBlock> {
        self.entries.iter()
    }

    /// Looks up an entry by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileBlock> {
        self.positions.get(path).map(|&i| &self.entries[i])
    }

    /// Sums content sizes across entries.
    #[must_use]
    pub fn total_content_bytes(&self) -> usize {
        self.entries.iter().map(FileBlock::size).sum()
    }

    /// Consumes the manifest and returns its entries.
    #[must_use]
    pub fn into_blocks(self) -> Vec<FileBlock> {
        self.entries
    }
}

impl FromIterator<FileBlock> for ArchiveManifest {
    fn from_iter<I: IntoIterator<Item = FileBlock>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for block in iter {
            manifest.insert(block);
        }
        manifest
    }
}

impl<'a> IntoIterator for &'a ArchiveManifest {
    type Item = &'a FileBlock;
    type IntoIter = std::slice::Iter<'a, FileBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_block_metrics() {
        let block = FileBlock::new("README.md", "# Title\n\nBody");
        assert_eq!(block.size(), 13);
        assert_eq!(block.line_count(), 3);
    }

    #[test]
    fn test_manifest_preserves_first_seen_order() {
        let manifest: ArchiveManifest = vec![
            FileBlock::new("b.txt", "1"),
            FileBlock::new("a.txt", "2"),
            FileBlock::new("c.txt", "3"),
        ]
        .into_iter()
        .collect();

        let paths: Vec<&str> = manifest.iter().map(|b| b.path.as_str()).collect();
        assert_eq!(paths, vec!["b.txt", "a.txt", "c.txt"]);
    }

    #[test]
    fn test_manifest_last_write_wins() {
        let mut manifest = ArchiveManifest::new();
        assert!(!manifest.insert(FileBlock::new("a.txt", "first")));
        assert!(!manifest.insert(FileBlock::new("b.txt", "other")));
        assert!(manifest.insert(FileBlock::new("a.txt", "second")));

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("a.txt").unwrap().content, "second");
        assert_eq!(manifest.iter().next().unwrap().path, "a.txt");
    }

    #[test]
    fn test_manifest_totals() {
        let manifest: ArchiveManifest = vec![
            FileBlock::new("a", "abc"),
            FileBlock::new("b", "de"),
        ]
        .into_iter()
        .collect();
        assert_eq!(manifest.total_content_bytes(), 5);
        assert!(!manifest.is_empty());
        assert!(ArchiveManifest::new().is_empty());
    }
}
