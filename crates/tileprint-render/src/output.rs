//! Finished page images and their encoding.

use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use tileprint_common::image::PixelBuffer;

/// Default JPEG quality, matching what browsers use for canvas export.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// How finished pages are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    /// Baseline JPEG, flattened onto black the way a canvas with
    /// premultiplied alpha exports it.
    Jpeg {
        /// Quality 1-100.
        quality: u8,
    },
    /// Lossless RGBA PNG.
    Png,
}

impl PageFormat {
    /// Conventional file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "jpg",
            Self::Png => "png",
        }
    }
}

impl Default for PageFormat {
    fn default() -> Self {
        Self::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Encoding of `bytes`.
    pub format: PageFormat,
}

/// Encode a finished page buffer.
///
/// # Errors
///
/// Returns [`RenderError::Encode`](crate::RenderError::Encode) if the encoder
/// rejects the buffer.
pub fn encode_page(buffer: &PixelBuffer, format: PageFormat) -> Result<PageImage> {
    let (width, height) = buffer.size();
    let mut bytes = Vec::new();
    match format {
        PageFormat::Jpeg { quality } => {
            let rgb = flatten_on_black(buffer);
            JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(&rgb)?;
        }
        PageFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(
                buffer.rgba_data(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
        }
    }
    Ok(PageImage {
        bytes,
        width,
        height,
        format,
    })
}

/// Drop alpha by compositing over black, so fully transparent pixels come
/// out black whatever their stored colour.
fn flatten_on_black(buffer: &PixelBuffer) -> RgbImage {
    let (width, height) = buffer.size();
    let rgb = buffer
        .rgba_data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]].map(|c| premultiply(c, px[3])))
        .collect();
    // The length always matches, so `None` cannot occur.
    RgbImage::from_raw(width, height, rgb).unwrap_or_else(|| RgbImage::new(width, height))
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    let scaled = (u16::from(channel) * u16::from(alpha) + 127) / 255;
    u8::try_from(scaled).unwrap_or(u8::MAX)
}
