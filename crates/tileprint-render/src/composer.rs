//! Zoom-bucket page composer.
//!
//! Tiles for a page arrive grouped by layer, and layers are fetched at
//! different zooms. Rather than resampling every tile into the page, the
//! composer accumulates tiles that share a zoom in one bucket sized for that
//! zoom, then resamples the whole bucket into the page when the next bucket
//! starts.
//!
//! # State machine
//!
//! ```text
//!            put_tile(k)                      put_tile(k' != k)
//! NoBucket ──────────────▶ BucketOpen(k) ─────────────────────────▶ BucketOpen(k')
//!                              │   ▲        merge k into target,
//!                              └───┘        drop it, allocate k'
//!                          put_tile(k)
//! ```
//!
//! Buckets are merged in the order their key is first seen, never sorted by
//! zoom. A numeric bucket is drawn over the target; the overlay bucket is
//! multiplied through it (see [`blend_overlay`]).

use crate::blend::{blend_overlay, blit_scaled, draw_tile};
use crate::error::Result;
use crate::geo::{PixelBounds, REFERENCE_ZOOM};
use crate::output::{PageFormat, PageImage, encode_page};
use crate::tiles::{TileResult, ZoomBucketKey};
use std::sync::Arc;
use tileprint_common::image::PixelBuffer;
use tileprint_common::warning::WarningSet;

struct OpenBucket {
    key: ZoomBucketKey,
    buffer: PixelBuffer,
}

/// Accumulates one page's tiles and produces its [`PageImage`].
pub struct ZoomBucketComposer {
    dest_size: (u32, u32),
    reference_bounds: PixelBounds,
    format: PageFormat,
    target: Option<PixelBuffer>,
    open: Option<OpenBucket>,
    merged_overlay: bool,
    warnings: Arc<WarningSet>,
}

impl ZoomBucketComposer {
    /// Create a composer for a page of `dest_size` pixels whose geometry at
    /// [`REFERENCE_ZOOM`] is `reference_bounds`.
    ///
    /// No buffer is allocated until the first tile is drawn.
    #[must_use]
    pub fn new(dest_size: (u32, u32), reference_bounds: PixelBounds, format: PageFormat) -> Self {
        Self {
            dest_size,
            reference_bounds,
            format,
            target: None,
            open: None,
            merged_overlay: false,
            warnings: Arc::default(),
        }
    }

    /// Report warnings through `warnings`, shared with the other pages of
    /// the same render.
    #[must_use]
    pub fn with_warnings(mut self, warnings: Arc<WarningSet>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Pixel extents of the bucket for `key`.
    ///
    /// A numeric zoom `z` divides the reference bounds by `2^(24 - z)` and
    /// rounds each corner; the overlay bucket is always the destination size.
    #[must_use]
    pub fn bucket_size(&self, key: ZoomBucketKey) -> (u32, u32) {
        match key {
            ZoomBucketKey::Overlay => self.dest_size,
            ZoomBucketKey::Zoom(z) => self.reference_bounds.rescale(REFERENCE_ZOOM, z).size(),
        }
    }

    /// Key of the bucket currently accumulating, if any.
    #[must_use]
    pub fn open_bucket(&self) -> Option<ZoomBucketKey> {
        self.open.as_ref().map(|b| b.key)
    }

    /// Draw one tile.
    ///
    /// A tile without pixels is ignored entirely: it neither draws nor
    /// switches buckets.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::BufferSizeMismatch`](crate::RenderError::BufferSizeMismatch)
    /// if switching buckets merges an overlay bucket of the wrong size.
    pub fn put_tile(&mut self, tile: TileResult) -> Result<()> {
        let Some(image) = tile.image else {
            return Ok(());
        };
        if self.open_bucket() != Some(tile.bucket) {
            self.merge_open()?;
            self.open_new(tile.bucket);
        }
        if let Some(open) = self.open.as_mut() {
            draw_tile(&mut open.buffer, &image, tile.rect);
        }
        Ok(())
    }

    /// Merge any open bucket and encode the page, releasing all buffers.
    ///
    /// A page that received no drawable tiles encodes as fully transparent.
    ///
    /// # Errors
    ///
    /// Returns a merge error or
    /// [`RenderError::Encode`](crate::RenderError::Encode).
    pub fn finalize(mut self) -> Result<PageImage> {
        self.merge_open()?;
        let (width, height) = self.dest_size;
        let target = self
            .target
            .take()
            .unwrap_or_else(|| PixelBuffer::new(width, height));
        encode_page(&target, self.format)
    }

    fn open_new(&mut self, key: ZoomBucketKey) {
        if self.merged_overlay && key != ZoomBucketKey::Overlay {
            let _ = self.warnings.warn_once(
                "composer",
                &format!("{key} bucket follows an overlay bucket; overlays should be stacked last"),
            );
        }
        let (width, height) = self.bucket_size(key);
        log::debug!(target: "tileprint::composer", "open {key} bucket {width}x{height}");
        self.open = Some(OpenBucket {
            key,
            buffer: PixelBuffer::new(width, height),
        });
    }

    fn merge_open(&mut self) -> Result<()> {
        let Some(bucket) = self.open.take() else {
            return Ok(());
        };
        let (width, height) = self.dest_size;
        let target = self
            .target
            .get_or_insert_with(|| PixelBuffer::new(width, height));
        match bucket.key {
            ZoomBucketKey::Overlay => {
                blend_overlay(target, &bucket.buffer)?;
                self.merged_overlay = true;
            }
            ZoomBucketKey::Zoom(_) => blit_scaled(target, &bucket.buffer),
        }
        log::debug!(target: "tileprint::composer", "merged {} bucket", bucket.key);
        Ok(())
    }
}
