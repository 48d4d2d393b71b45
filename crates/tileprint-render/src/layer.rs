//! The capability a printable layer provides to the pipeline.
//!
//! Layers are owned by the surrounding application; the pipeline only
//! borrows them for the duration of one render.

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::geo::{Page, PixelBounds};
use std::fmt;
use tileprint_common::image::PixelBuffer;

/// Which zoom each kind of layer is printed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomSelection {
    /// Zoom for scale-dependent layers (rendered maps whose labels and
    /// symbols are designed for one zoom).
    pub map_zoom: u8,
    /// Zoom for everything else (imagery, overlays).
    pub sat_zoom: u8,
}

impl ZoomSelection {
    /// The zoom a layer is fetched at.
    #[must_use]
    pub const fn for_layer(&self, scale_dependent: bool) -> u8 {
        if scale_dependent {
            self.map_zoom
        } else {
            self.sat_zoom
        }
    }
}

/// Everything a layer needs to enumerate its tiles for one page.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// The page being rendered.
    pub page: &'a Page,
    /// Effective tile zoom for this layer.
    pub zoom: u8,
    /// The page's projected pixel bounds at `zoom`.
    pub pixel_bounds: PixelBounds,
    /// Final page raster size `(width, height)`.
    pub dest_size: (u32, u32),
    /// Output resolution in dots per inch.
    pub resolution_dpi: f64,
    /// Print scale, passed through for layers that size symbols by it.
    pub scale: f64,
}

/// Where a tile lands in its zoom bucket, in bucket pixels.
///
/// The offset may be negative and the rectangle may overhang the bucket:
/// edge tiles are clipped when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Drawn width (the tile is resampled if this differs from its own).
    pub width: u32,
    /// Drawn height.
    pub height: u32,
}

type FetchFn = Box<dyn FnOnce(&CancelToken) -> Result<Option<PixelBuffer>> + Send>;

/// A not-yet-started tile fetch and the rectangle it will be drawn into.
///
/// The fetch returns `Ok(None)` for a tile that does not exist.
pub struct TileFetch {
    /// Destination rectangle.
    pub rect: TileRect,
    fetch: FetchFn,
}

impl TileFetch {
    /// Wrap a fetch closure.
    #[must_use]
    pub fn new(
        rect: TileRect,
        fetch: impl FnOnce(&CancelToken) -> Result<Option<PixelBuffer>> + Send + 'static,
    ) -> Self {
        Self {
            rect,
            fetch: Box::new(fetch),
        }
    }

    /// A tile whose pixels are already known.
    #[must_use]
    pub fn ready(rect: TileRect, image: Option<PixelBuffer>) -> Self {
        Self::new(rect, move |_| Ok(image))
    }

    /// Run the fetch on the current thread.
    ///
    /// # Errors
    ///
    /// Whatever the fetch closure reports.
    pub fn run(self, cancel: &CancelToken) -> Result<Option<PixelBuffer>> {
        (self.fetch)(cancel)
    }
}

impl fmt::Debug for TileFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileFetch")
            .field("rect", &self.rect)
            .finish_non_exhaustive()
    }
}

/// A layer that can be printed.
pub trait PrintLayer {
    /// Name used in diagnostics and errors.
    fn name(&self) -> &str;

    /// Stacking indices from the map container down to this layer's anchor.
    ///
    /// `None` means the layer has no anchor and cannot be ordered.
    fn stacking_path(&self) -> Option<Vec<i32>>;

    /// Overlay layers are multiplied through the base map instead of
    /// replacing it.
    fn is_overlay(&self) -> bool;

    /// Scale-dependent layers print at the map zoom, others at the
    /// imagery zoom.
    fn scale_dependent(&self) -> bool;

    /// Share of overall progress this layer accounts for, per page.
    fn print_progress_weight(&self) -> f64 {
        1.0
    }

    /// Enumerate the tiles covering one page.
    ///
    /// Base layers address tiles in bucket pixels at `request.zoom`; overlay
    /// layers address them in destination pixels (`request.dest_size`).
    fn tiles_for(&self, request: &PageRequest<'_>) -> Vec<TileFetch>;
}
