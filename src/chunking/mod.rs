//! Segmentation strategies for the streaming relay.
//!
//! When the generator returns a complete reply in one piece, the relay cuts
//! it into small chunks to emulate progressive generation. Strategies:
//!
//! - **Fixed**: a fixed number of characters per chunk
//! - **Grapheme**: a fixed number of grapheme clusters per chunk

pub mod fixed;
pub mod grapheme;
pub mod traits;

pub use fixed::FixedSegmenter;
pub use grapheme::GraphemeSegmenter;
pub use traits::Segmenter;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 30;

/// Maximum allowed chunk size.
pub const MAX_CHUNK_SIZE: usize = 65_536;

/// Creates the default segmenter (fixed).
#[must_use]
pub const fn default_segmenter() -> FixedSegmenter {
    FixedSegmenter::new()
}

/// Creates a segmenter by name.
///
/// # Arguments
///
/// * `name` - Strategy name: "fixed" or "grapheme".
/// * `chunk_size` - Units per chunk.
///
/// # Errors
///
/// Returns [`crate::error::ChunkingError::UnknownStrategy`] if the strategy
/// name is not recognized, or a configuration error for an invalid size.
pub fn create_segmenter(
    name: &str,
    chunk_size: usize,
) -> crate::error::Result<Box<dyn Segmenter>> {
    let segmenter: Box<dyn Segmenter> = match name.to_lowercase().as_str() {
        "fixed" => Box::new(FixedSegmenter::with_size(chunk_size)),
        "grapheme" => Box::new(GraphemeSegmenter::with_size(chunk_size)),
        _ => {
            return Err(crate::error::ChunkingError::UnknownStrategy {
                name: name.to_string(),
            }
            .into());
        }
    };
    segmenter.validate()?;
    Ok(segmenter)
}

/// Lists available strategy names.
#[must_use]
pub fn available_strategies() -> Vec<&'static str> {
    vec!["fixed", "grapheme"]
}
