//! Pixel buffer type shared by tile sources and the page composer.
//!
//! Every buffer is straight (non-premultiplied) RGBA8, row-major, four bytes
//! per pixel with no row padding.

use ::image::{ImageBuffer, Rgba, RgbaImage};
use thiserror::Error;

/// Error returned when tile bytes cannot be turned into pixels.
#[derive(Debug, Error)]
#[error("could not decode image ({0})")]
pub struct DecodeError(#[from] ::image::ImageError);

/// Decoded RGBA pixel data with explicit dimensions.
///
/// Wraps an [`RgbaImage`] so the `image` crate's resampling and compositing
/// routines can be applied directly to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: RgbaImage,
}

impl PixelBuffer {
    /// Allocate a fully transparent buffer.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: ImageBuffer::new(width, height),
        }
    }

    /// Allocate a buffer where every pixel is `rgba`.
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            pixels: ImageBuffer::from_pixel(width, height, Rgba(rgba)),
        }
    }

    /// Wrap raw RGBA bytes.
    ///
    /// Returns `None` unless `rgba_data.len() == width * height * 4`.
    #[must_use]
    pub fn from_rgba(width: u32, height: u32, rgba_data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, rgba_data).map(|pixels| Self { pixels })
    }

    /// Decode PNG/JPEG bytes into a buffer.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the bytes are not a supported raster format.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let decoded = ::image::load_from_memory(bytes)?;
        Ok(Self {
            pixels: decoded.to_rgba8(),
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)` in pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Whether the buffer has no pixels at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }

    /// The RGBA value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn rgba_data(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Mutable raw RGBA bytes.
    pub fn rgba_data_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Borrow as an `image` crate buffer.
    #[must_use]
    pub const fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Mutably borrow as an `image` crate buffer.
    pub fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_rejects_short_data() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn test_new_is_transparent() {
        let buf = PixelBuffer::new(3, 2);
        assert_eq!(buf.size(), (3, 2));
        assert!(buf.rgba_data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_png_round_trip() {
        let src = PixelBuffer::filled(4, 4, [10, 20, 30, 255]);
        let mut bytes = std::io::Cursor::new(Vec::new());
        src.as_image()
            .write_to(&mut bytes, ::image::ImageFormat::Png)
            .expect("encode png");
        let decoded = PixelBuffer::decode(bytes.get_ref()).expect("decode png");
        assert_eq!(decoded, src);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(PixelBuffer::decode(b"not an image").is_err());
    }
}
