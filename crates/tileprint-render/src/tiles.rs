//! Per-layer, per-page tile streams.
//!
//! A [`TileStream`] turns one layer's tiles for one page into
//! [`PendingTile`] tasks for the [`ConcurrencyWindow`](crate::ConcurrencyWindow).
//! Each task, once run, yields a [`TileResult`] tagged with its zoom bucket
//! and its share of the overall progress.

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::geo::{Page, PixelBounds};
use crate::layer::{PageRequest, PrintLayer, TileFetch, TileRect, ZoomSelection};
use crate::window::Task;
use std::fmt;
use std::vec;
use tileprint_common::image::PixelBuffer;

/// Identifies the accumulation buffer a tile is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoomBucketKey {
    /// Base content captured at this zoom.
    Zoom(u8),
    /// Overlay content, already at destination resolution.
    Overlay,
}

impl fmt::Display for ZoomBucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zoom(z) => write!(f, "zoom {z}"),
            Self::Overlay => f.write_str("overlay"),
        }
    }
}

/// One fetched tile, ready for the composer.
#[derive(Debug, Clone)]
pub struct TileResult {
    /// Pixels, or `None` if the tile does not exist. `None` is never drawn
    /// but still counts toward progress.
    pub image: Option<PixelBuffer>,
    /// Where the tile lands in its bucket.
    pub rect: TileRect,
    /// Which bucket it belongs to.
    pub bucket: ZoomBucketKey,
    /// Whether the originating layer is an overlay.
    pub is_overlay: bool,
    /// This tile's share of overall progress.
    pub progress_increment: f64,
}

/// A tile fetch plus the tags its result will carry.
pub struct PendingTile {
    fetch: TileFetch,
    bucket: ZoomBucketKey,
    is_overlay: bool,
    progress_increment: f64,
}

impl Task for PendingTile {
    type Output = Result<TileResult>;

    fn run(self, cancel: &CancelToken) -> Self::Output {
        let rect = self.fetch.rect;
        let image = self.fetch.run(cancel)?;
        Ok(TileResult {
            image,
            rect,
            bucket: self.bucket,
            is_overlay: self.is_overlay,
            progress_increment: self.progress_increment,
        })
    }
}

impl fmt::Debug for PendingTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTile")
            .field("rect", &self.fetch.rect)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

/// Geometry shared by every layer's stream for one page.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry<'a> {
    /// The page.
    pub page: &'a Page,
    /// Final raster size.
    pub dest_size: (u32, u32),
    /// Which zoom each kind of layer uses.
    pub zooms: ZoomSelection,
    /// Output resolution.
    pub resolution_dpi: f64,
    /// Print scale.
    pub scale: f64,
}

/// Lazy, finite, non-restartable sequence of one layer's tiles for one page.
#[derive(Debug)]
pub struct TileStream {
    tiles: vec::IntoIter<TileFetch>,
    bucket: ZoomBucketKey,
    is_overlay: bool,
    progress_increment: f64,
}

impl TileStream {
    /// Build the stream for `layer` on the page described by `geometry`.
    ///
    /// Returns `None` if the layer has no tiles on this page; such a layer
    /// contributes nothing to progress.
    #[must_use]
    pub fn for_layer(layer: &dyn PrintLayer, geometry: &PageGeometry<'_>) -> Option<Self> {
        let zoom = geometry.zooms.for_layer(layer.scale_dependent());
        let request = PageRequest {
            page: geometry.page,
            zoom,
            pixel_bounds: PixelBounds::for_bounds(&geometry.page.bounds, zoom),
            dest_size: geometry.dest_size,
            resolution_dpi: geometry.resolution_dpi,
            scale: geometry.scale,
        };
        let tiles = layer.tiles_for(&request);
        if tiles.is_empty() {
            log::debug!(target: "tileprint::tiles", "layer '{}' has no tiles on this page", layer.name());
            return None;
        }

        let is_overlay = layer.is_overlay();
        let bucket = if is_overlay {
            ZoomBucketKey::Overlay
        } else {
            ZoomBucketKey::Zoom(zoom)
        };
        let progress_increment = layer.print_progress_weight() / tiles.len() as f64;
        log::debug!(
            target: "tileprint::tiles",
            "layer '{}': {} tiles into {bucket}",
            layer.name(),
            tiles.len()
        );
        Some(Self {
            tiles: tiles.into_iter(),
            bucket,
            is_overlay,
            progress_increment,
        })
    }

    /// Tiles not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }
}

impl Iterator for TileStream {
    type Item = PendingTile;

    fn next(&mut self) -> Option<PendingTile> {
        let fetch = self.tiles.next()?;
        Some(PendingTile {
            fetch,
            bucket: self.bucket,
            is_overlay: self.is_overlay,
            progress_increment: self.progress_increment,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tiles.size_hint()
    }
}

/// Concatenate the streams of `layers` (already in draw order) for one page.
pub fn page_tiles<'a>(
    layers: &'a [&'a dyn PrintLayer],
    geometry: PageGeometry<'a>,
) -> impl Iterator<Item = PendingTile> + 'a {
    layers
        .iter()
        .filter_map(move |layer| TileStream::for_layer(*layer, &geometry))
        .flatten()
}
