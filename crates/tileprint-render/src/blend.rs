//! Pixel operations used by the composer.
//!
//! Three operations, all on straight-alpha RGBA buffers:
//!
//! - [`draw_tile`] - resample a tile to its rectangle and composite it
//!   source-over into a bucket, clipping at the bucket edges.
//! - [`blit_scaled`] - resample a whole bucket to the target's size and
//!   composite it source-over. Opaque base content therefore replaces what
//!   was there before.
//! - [`blend_overlay`] - the multiply-through overlay formula.

use crate::error::{RenderError, Result};
use crate::layer::TileRect;
use image::imageops::{self, FilterType};
use tileprint_common::image::PixelBuffer;

/// Resampling filter for every scaled draw (bilinear).
const RESAMPLE: FilterType = FilterType::Triangle;

/// Luminance is remapped from `[0, 255]` into `[LUMA_FLOOR, 255]` so an
/// overlay never goes fully black over dark base content.
const LUMA_FLOOR: f64 = 63.0;

/// Draw `tile` into `bucket` at `rect`, resampling if the sizes differ.
pub fn draw_tile(bucket: &mut PixelBuffer, tile: &PixelBuffer, rect: TileRect) {
    if tile.is_empty() || rect.width == 0 || rect.height == 0 {
        return;
    }
    if tile.size() == (rect.width, rect.height) {
        imageops::overlay(bucket.as_image_mut(), tile.as_image(), rect.x, rect.y);
    } else {
        let scaled = imageops::resize(tile.as_image(), rect.width, rect.height, RESAMPLE);
        imageops::overlay(bucket.as_image_mut(), &scaled, rect.x, rect.y);
    }
}

/// Draw all of `src` over all of `target`, resampling to the target's size.
pub fn blit_scaled(target: &mut PixelBuffer, src: &PixelBuffer) {
    if src.is_empty() || target.is_empty() {
        return;
    }
    if src.size() == target.size() {
        imageops::overlay(target.as_image_mut(), src.as_image(), 0, 0);
    } else {
        let scaled = imageops::resize(src.as_image(), target.width(), target.height(), RESAMPLE);
        imageops::overlay(target.as_image_mut(), &scaled, 0, 0);
    }
}

/// Multiply `overlay` through `target` in place.
///
/// For every pixel where the overlay's alpha is non-zero:
///
/// ```text
/// l  = (dR + dG + dB) / 3
/// l' = l / 255 * 192 + 63
/// d  = o / 255 * l'          (per colour channel; alpha untouched)
/// ```
///
/// Pixels where the overlay's alpha is zero are left as they are.
///
/// # Errors
///
/// Returns [`RenderError::BufferSizeMismatch`] if the buffers differ in size.
pub fn blend_overlay(target: &mut PixelBuffer, overlay: &PixelBuffer) -> Result<()> {
    if target.size() != overlay.size() {
        return Err(RenderError::BufferSizeMismatch {
            src_width: overlay.width(),
            src_height: overlay.height(),
            dest_width: target.width(),
            dest_height: target.height(),
        });
    }

    let src = overlay.rgba_data();
    let dest = target.rgba_data_mut();
    for (d, s) in dest.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        let l = (f64::from(d[0]) + f64::from(d[1]) + f64::from(d[2])) / 3.0;
        let l = l / 255.0 * (255.0 - LUMA_FLOOR) + LUMA_FLOOR;
        d[0] = to_channel(f64::from(s[0]) / 255.0 * l);
        d[1] = to_channel(f64::from(s[1]) / 255.0 * l);
        d[2] = to_channel(f64::from(s[2]) / 255.0 * l);
    }
    Ok(())
}

/// Store a computed channel the way a clamped byte array does: round half to
/// even, then clamp.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(v: f64) -> u8 {
    v.round_ties_even().clamp(0.0, 255.0) as u8
}
