//! Decoding primitive.
//!
//! The loader never decodes pixels itself. It asks an [`ImageDecoder`] for
//! the source dimensions, picks a sample factor, then asks for a decode at
//! that factor. Decoders run on the blocking thread pool, so they may do
//! synchronous file I/O.
//!
//! [`FileDecoder`] is the reference implementation for local files.

mod file;

pub use file::FileDecoder;

use thiserror::Error;

use crate::types::{DecodedImage, ImageSize, RequestKey};

/// Errors from decoding a source.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The source could not be read.
    #[error("I/O error reading {source_key}: {error}")]
    Io {
        source_key: String,
        #[source]
        error: std::io::Error,
    },

    /// The source format is not supported by this decoder.
    #[error("unsupported image format for {0}")]
    Unsupported(String),

    /// The source was read but is not a valid image.
    #[error("malformed image {source_key}: {reason}")]
    Malformed { source_key: String, reason: String },

    /// The decode task panicked.
    #[error("decode panicked for {0}")]
    Panicked(String),
}

/// Pixel-decoding primitive.
///
/// Both methods are called from the blocking thread pool.
pub trait ImageDecoder: Send + Sync + 'static {
    /// Reads only the dimensions of `source`.
    fn dimensions(&self, source: &RequestKey) -> Result<ImageSize, DecodeError>;

    /// Decodes `source`, keeping every `sample_factor`-th pixel in each
    /// dimension. `sample_factor` is at least 1.
    fn decode(&self, source: &RequestKey, sample_factor: u32) -> Result<DecodedImage, DecodeError>;
}

/// Dimensions of an image of `size` after sampling by `factor`.
///
/// Rounds up so a non-empty source never produces an empty image.
pub fn sampled_size(size: ImageSize, factor: u32) -> ImageSize {
    let factor = factor.max(1);
    ImageSize::new(size.width.div_ceil(factor), size.height.div_ceil(factor))
}
