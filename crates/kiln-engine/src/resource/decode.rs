use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::DecodeError;

/// Where texture pixels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    File(PathBuf),
    /// Encoded image bytes (PNG, JPEG, BMP) with a label for diagnostics.
    Memory { label: String, bytes: Arc<[u8]> },
}

impl TextureSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        TextureSource::File(path.into())
    }

    pub fn memory(label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        TextureSource::Memory {
            label: label.into(),
            bytes: bytes.into(),
        }
    }

    /// Human-readable name used for texture labels and errors.
    pub fn label(&self) -> String {
        match self {
            TextureSource::File(path) => path.display().to_string(),
            TextureSource::Memory { label, .. } => label.clone(),
        }
    }
}

impl fmt::Display for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Tightly packed RGBA8 pixels, rows top to bottom.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    pub const BYTES_PER_PIXEL: u32 = 4;

    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL as usize;
        if pixels.len() != expected {
            return Err(DecodeError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A single-colour image, handy for placeholders.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * Self::BYTES_PER_PIXEL
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Turns a [`TextureSource`] into pixels. Runs on general workers, never on
/// the GPU thread.
pub trait ImageDecoder: Send + Sync + 'static {
    fn decode(&self, source: &TextureSource) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Default, Copy, Clone)]
pub struct ImageFileDecoder;

impl ImageDecoder for ImageFileDecoder {
    fn decode(&self, source: &TextureSource) -> Result<DecodedImage, DecodeError> {
        let decoded = match source {
            TextureSource::File(path) => image::open(path),
            TextureSource::Memory { bytes, .. } => image::load_from_memory(bytes),
        }
        .map_err(|error| DecodeError::Image {
            source_name: source.label(),
            error,
        })?;

        let rgba = decoded.into_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::Empty(source.label()));
        }

        DecodedImage::new(width, height, rgba.into_raw())
    }
}
