//! Marker scanner for project texts.
//!
//! A project text declares files with marker lines:
//!
//! ```text
//! === file: src/main.rs ===
//! fn main() {}
//! === file: README.md ===
//! # Demo
//! ```
//!
//! The scanner walks the text line by line in one of two states. While
//! seeking a marker, non-marker lines are dropped. Once a marker has been
//! seen, every following line belongs to that file until the next marker or
//! end of input.

use crate::core::FileBlock;

/// Opening token of a marker line.
pub const MARKER_PREFIX: &str = "=== file:";

/// Closing token of a marker line.
pub const MARKER_SUFFIX: &str = "===";

#[derive(Debug)]
enum ScanState<'a> {
    SeekingMarker,
    InContent { path: &'a str, start: usize },
}

/// Extracts the declared path from a marker line.
///
/// The line is trimmed before matching. Returns `None` for anything that is
/// not a well-formed marker: missing closing `===`, an empty path, or a path
/// that itself contains the marker prefix.
///
/// # Examples
///
/// ```
/// use chatforge::archive::marker_path;
///
/// assert_eq!(marker_path("=== file: b/c.txt ==="), Some("b/c.txt"));
/// assert_eq!(marker_path("  === file: a.txt ===\r\n"), Some("a.txt"));
/// assert_eq!(marker_path("=== file: a.txt"), None);
/// ```
#[must_use]
pub fn marker_path(line: &str) -> Option<&str> {
    let inner = line
        .trim()
        .strip_prefix(MARKER_PREFIX)?
        .strip_suffix(MARKER_SUFFIX)?;
    let path = inner.trim();

    if path.is_empty() || path.contains(MARKER_PREFIX) {
        return None;
    }
    Some(path)
}

/// Scans `text` into file blocks in order of appearance.
///
/// Duplicate paths are all returned; de-duplication is the manifest's job.
///
/// # Examples
///
/// ```
/// use chatforge::archive::scan_blocks;
///
/// let blocks = scan_blocks("=== file: a.txt ===\nhello\n=== file: b/c.txt ===\nworld");
/// assert_eq!(blocks.len(), 2);
/// assert_eq!(blocks[0].content, "hello");
/// assert_eq!(blocks[1].path, "b/c.txt");
/// ```
#[must_use]
pub fn scan_blocks(text: &str) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let mut state = ScanState::SeekingMarker;
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let line_end = line_start + line.len();

        if let Some(path) = marker_path(line) {
            if let ScanState::InContent { path, start } = state {
                blocks.push(FileBlock::new(path, text[start..line_start].trim()));
            }
            state = ScanState::InContent {
                path,
                start: line_end,
            };
        }

        line_start = line_end;
    }

    if let ScanState::InContent { path, start } = state {
        blocks.push(FileBlock::new(path, text[start..].trim()));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("=== file: a.txt ===", Some("a.txt"); "plain")]
    #[test_case("=== file:   spaced.txt   ===", Some("spaced.txt"); "padded path")]
    #[test_case("\t=== file: a.txt ===  ", Some("a.txt"); "surrounding whitespace")]
    #[test_case("=== file: a.txt ===\r\n", Some("a.txt"); "crlf terminator")]
    #[test_case("=== file: dir with space/x.md ===", Some("dir with space/x.md"); "space in path")]
    #[test_case("=== file: a === b ===", Some("a === b"); "inner closing token")]
    #[test_case("=== file: a.txt", None; "missing closing")]
    #[test_case("=== file: ===", None; "empty path")]
    #[test_case("=== file: x === file: y ===", None; "nested prefix")]
    #[test_case("== file: a.txt ===", None; "short prefix")]
    #[test_case("text === file: a.txt ===", None; "prefix not at line start")]
    fn test_marker_path(line: &str, expected: Option<&str>) {
        assert_eq!(marker_path(line), expected);
    }

    #[test]
    fn test_scan_two_files() {
        let blocks = scan_blocks("=== file: a.txt ===\nhello\n=== file: b/c.txt ===\nworld");
        assert_eq!(
            blocks,
            vec![FileBlock::new("a.txt", "hello"), FileBlock::new("b/c.txt", "world")]
        );
    }

    #[test]
    fn test_scan_empty_and_unmarked() {
        assert!(scan_blocks("").is_empty());
        assert!(scan_blocks("no markers here").is_empty());
        assert!(scan_blocks("line one\nline two\n").is_empty());
    }

    #[test]
    fn test_scan_drops_preamble() {
        let blocks = scan_blocks("Here is your project:\n\n=== file: main.py ===\nprint(1)\n");
        assert_eq!(blocks, vec![FileBlock::new("main.py", "print(1)")]);
    }

    #[test]
    fn test_scan_preserves_internal_whitespace() {
        let text = "=== file: main.py ===\n\ndef f():\n    return 1\n\n\nprint(f())\n\n";
        let blocks = scan_blocks(text);
        assert_eq!(blocks[0].content, "def f():\n    return 1\n\n\nprint(f())");
    }

    #[test]
    fn test_scan_malformed_marker_folds_into_previous() {
        let text = "=== file: a.txt ===\nalpha\n=== file: broken.txt\nbeta";
        let blocks = scan_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "alpha\n=== file: broken.txt\nbeta");
    }

    #[test]
    fn test_scan_malformed_marker_before_any_file_is_dropped() {
        let text = "=== file: broken.txt\nlost\n=== file: kept.txt ===\nkept";
        assert_eq!(scan_blocks(text), vec![FileBlock::new("kept.txt", "kept")]);
    }

    #[test]
    fn test_scan_marker_at_end_without_newline() {
        let blocks = scan_blocks("=== file: a.txt ===\nhello\n=== file: empty.txt ===");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], FileBlock::new("empty.txt", ""));
    }

    #[test]
    fn test_scan_adjacent_markers() {
        let blocks = scan_blocks("=== file: a ===\n=== file: b ===\nbody");
        assert_eq!(blocks, vec![FileBlock::new("a", ""), FileBlock::new("b", "body")]);
    }

    #[test]
    fn test_scan_crlf_input() {
        let blocks = scan_blocks("=== file: a.txt ===\r\nline1\r\nline2\r\n=== file: b.txt ===\r\nx");
        assert_eq!(blocks[0].content, "line1\r\nline2");
        assert_eq!(blocks[1].content, "x");
    }

    #[test]
    fn test_scan_keeps_duplicates_in_order() {
        let blocks = scan_blocks("=== file: a ===\n1\n=== file: a ===\n2");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].content, "2");
    }

    #[test]
    fn test_scan_unicode_content() {
        let blocks = scan_blocks("=== file: 文档.md ===\n你好，世界 🌍");
        assert_eq!(blocks, vec![FileBlock::new("文档.md", "你好，世界 🌍")]);
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        "[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.[a-z]{1,3}"
    }

    fn body_strategy() -> impl Strategy<Value = String> {
        // Bodies never contain a marker prefix; whitespace-only is allowed
        "[a-zA-Z0-9 {}();\n]{0,60}"
    }

    proptest! {
        #[test]
        fn well_formed_segments_round_trip(
            files in prop::collection::vec((path_strategy(), body_strategy()), 1..6)
        ) {
            let text: String = files
                .iter()
                .map(|(path, body)| format!("=== file: {path} ===\n{body}\n"))
                .collect();

            let blocks = scan_blocks(&text);
            prop_assert_eq!(blocks.len(), files.len());
            for (block, (path, body)) in blocks.iter().zip(&files) {
                prop_assert_eq!(&block.path, path);
                prop_assert_eq!(block.content.as_str(), body.trim());
            }
        }
    }
}
