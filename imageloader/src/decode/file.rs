//! Decoder for images on the local filesystem.

use std::path::{Path, PathBuf};

use image::{ImageError, ImageReader};

use super::{sampled_size, DecodeError, ImageDecoder};
use crate::types::{DecodedImage, ImageSize, RequestKey, BYTES_PER_PIXEL};

const FILE_SCHEME: &str = "file://";

/// Decodes PNG and JPEG files with the `image` crate.
///
/// Keys are plain paths or `file://` URIs, optionally resolved against a
/// root directory. Output is always RGBA8.
#[derive(Debug, Clone, Default)]
pub struct FileDecoder {
    root: Option<PathBuf>,
}

impl FileDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative keys against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, key: &RequestKey) -> PathBuf {
        let raw = key.as_str();
        let path = Path::new(raw.strip_prefix(FILE_SCHEME).unwrap_or(raw));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn open(
        &self,
        key: &RequestKey,
    ) -> Result<ImageReader<std::io::BufReader<std::fs::File>>, DecodeError> {
        let io_err = |error| DecodeError::Io {
            source_key: key.to_string(),
            error,
        };
        ImageReader::open(self.path_for(key))
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)
    }
}

fn map_image_error(key: &RequestKey, err: ImageError) -> DecodeError {
    match err {
        ImageError::IoError(error) => DecodeError::Io {
            source_key: key.to_string(),
            error,
        },
        ImageError::Unsupported(_) => DecodeError::Unsupported(key.to_string()),
        other => DecodeError::Malformed {
            source_key: key.to_string(),
            reason: other.to_string(),
        },
    }
}

impl ImageDecoder for FileDecoder {
    fn dimensions(&self, source: &RequestKey) -> Result<ImageSize, DecodeError> {
        let (width, height) = self
            .open(source)?
            .into_dimensions()
            .map_err(|e| map_image_error(source, e))?;
        Ok(ImageSize::new(width, height))
    }

    fn decode(&self, source: &RequestKey, sample_factor: u32) -> Result<DecodedImage, DecodeError> {
        let rgba = self
            .open(source)?
            .decode()
            .map_err(|e| map_image_error(source, e))?
            .to_rgba8();

        let factor = sample_factor.max(1);
        let (width, height) = rgba.dimensions();
        if factor == 1 {
            return Ok(DecodedImage::from_rgba(width, height, rgba.into_raw()));
        }

        let out = sampled_size(ImageSize::new(width, height), factor);
        let src = rgba.as_raw();
        let src_stride = width as usize * BYTES_PER_PIXEL;
        let mut pixels = Vec::with_capacity(out.width as usize * out.height as usize * BYTES_PER_PIXEL);

        for y in 0..out.height {
            let row = (y * factor) as usize * src_stride;
            for x in 0..out.width {
                let offset = row + (x * factor) as usize * BYTES_PER_PIXEL;
                pixels.extend_from_slice(&src[offset..offset + BYTES_PER_PIXEL]);
            }
        }

        Ok(DecodedImage::from_rgba(out.width, out.height, pixels))
    }
}
