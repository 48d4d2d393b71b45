//! Slippy-map ("XYZ") tile layers.
//!
//! [`XyzTileLayer`] is the stock [`PrintLayer`]: it covers a page with tiles
//! from a URL template and fetches them through a shared [`TileFetcher`].
//!
//! Tiles are addressed at the layer's zoom, or at its native zoom if that is
//! lower. Native tiles are drawn enlarged: one native tile spans
//! `256 << (zoom - native)` bucket pixels.

use crate::cancel::CancelToken;
use crate::error::RenderError;
use crate::geo::{TILE_SIZE, round_half_up};
use crate::layer::{PageRequest, PrintLayer, TileFetch, TileRect};
use std::fmt;
use std::sync::Arc;
use tileprint_common::image::PixelBuffer;
use tileprint_common::net::TileFetcher;
use tileprint_common::url::{expand_template, pick_subdomain};

/// A tile layer backed by a `{z}/{x}/{y}` URL template.
#[derive(Clone)]
pub struct XyzTileLayer {
    name: String,
    template: String,
    subdomains: Vec<String>,
    tms: bool,
    max_native_zoom: Option<u8>,
    overlay: bool,
    scale_dependent: bool,
    weight: f64,
    stacking: Option<Vec<i32>>,
    fetcher: Arc<dyn TileFetcher>,
}

impl XyzTileLayer {
    /// A non-overlay, imagery-zoom layer with weight 1 and no anchor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        fetcher: Arc<dyn TileFetcher>,
    ) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            subdomains: Vec::new(),
            tms: false,
            max_native_zoom: None,
            overlay: false,
            scale_dependent: false,
            weight: 1.0,
            stacking: None,
            fetcher,
        }
    }

    /// Hosts substituted for `{s}`.
    #[must_use]
    pub fn with_subdomains(mut self, subdomains: Vec<String>) -> Self {
        self.subdomains = subdomains;
        self
    }

    /// Count tile rows from the south (TMS) instead of the north.
    #[must_use]
    pub const fn with_tms(mut self, tms: bool) -> Self {
        self.tms = tms;
        self
    }

    /// Highest zoom the source serves; deeper zooms enlarge its tiles.
    #[must_use]
    pub const fn with_max_native_zoom(mut self, zoom: Option<u8>) -> Self {
        self.max_native_zoom = zoom;
        self
    }

    /// Mark the layer as an overlay.
    #[must_use]
    pub const fn with_overlay(mut self, overlay: bool) -> Self {
        self.overlay = overlay;
        self
    }

    /// Print at the map zoom rather than the imagery zoom.
    #[must_use]
    pub const fn with_scale_dependent(mut self, scale_dependent: bool) -> Self {
        self.scale_dependent = scale_dependent;
        self
    }

    /// Set the layer's progress weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the layer's stacking path (see [`PrintLayer::stacking_path`]).
    #[must_use]
    pub fn with_stacking_path(mut self, path: Option<Vec<i32>>) -> Self {
        self.stacking = path;
        self
    }

    /// URL of the tile at native address `(z, x, y)`.
    ///
    /// `x` and `y` are used as given: wrapping and the TMS flip happen in
    /// [`PrintLayer::tiles_for`].
    #[must_use]
    pub fn tile_url(&self, z: u8, x: u32, y: u32) -> String {
        let subdomain = pick_subdomain(&self.subdomains, x, y);
        expand_template(&self.template, z, x, y, subdomain)
    }

    fn native_zoom(&self, zoom: u8) -> u8 {
        self.max_native_zoom.map_or(zoom, |max| zoom.min(max))
    }

    fn fetch_tile(&self, rect: TileRect, url: String) -> TileFetch {
        let fetcher = Arc::clone(&self.fetcher);
        TileFetch::new(rect, move |cancel: &CancelToken| {
            if cancel.is_cancelled() {
                return Err(RenderError::RenderCancelled);
            }
            let bytes = fetcher
                .fetch(&url)
                .map_err(|e| RenderError::TileFetchFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
            if cancel.is_cancelled() {
                return Err(RenderError::RenderCancelled);
            }
            let Some(bytes) = bytes else {
                log::debug!(target: "tileprint::xyz", "no tile at {url}");
                return Ok(None);
            };
            PixelBuffer::decode(&bytes)
                .map(Some)
                .map_err(|e| RenderError::TileDecodeFailed {
                    url,
                    reason: e.to_string(),
                })
        })
    }
}

impl fmt::Debug for XyzTileLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XyzTileLayer")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("overlay", &self.overlay)
            .field("scale_dependent", &self.scale_dependent)
            .field("stacking", &self.stacking)
            .finish_non_exhaustive()
    }
}

/// Maps a span in bucket pixels onto destination pixels.
struct DestScale {
    fx: f64,
    fy: f64,
}

impl DestScale {
    fn span(start: i64, len: i64, f: f64) -> (i64, u32) {
        let from = round_half_up(start as f64 * f);
        let to = round_half_up((start + len) as f64 * f);
        (from, u32::try_from(to - from).unwrap_or(0))
    }

    fn apply(&self, x: i64, y: i64, len: i64) -> TileRect {
        let (x, width) = Self::span(x, len, self.fx);
        let (y, height) = Self::span(y, len, self.fy);
        TileRect {
            x,
            y,
            width,
            height,
        }
    }
}

impl PrintLayer for XyzTileLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn stacking_path(&self) -> Option<Vec<i32>> {
        self.stacking.clone()
    }

    fn is_overlay(&self) -> bool {
        self.overlay
    }

    fn scale_dependent(&self) -> bool {
        self.scale_dependent
    }

    fn print_progress_weight(&self) -> f64 {
        self.weight
    }

    fn tiles_for(&self, request: &PageRequest<'_>) -> Vec<TileFetch> {
        let bounds = request.pixel_bounds;
        if bounds.width() == 0 || bounds.height() == 0 {
            return Vec::new();
        }
        let native = self.native_zoom(request.zoom);
        let tile_px = i64::from(TILE_SIZE) << (request.zoom - native);
        let grid = 1_i64 << native;

        let dest = self.overlay.then(|| DestScale {
            fx: f64::from(request.dest_size.0) / f64::from(bounds.width()),
            fy: f64::from(request.dest_size.1) / f64::from(bounds.height()),
        });

        let (x0, x1) = (
            bounds.min.0.div_euclid(tile_px),
            (bounds.max.0 - 1).div_euclid(tile_px),
        );
        let (y0, y1) = (
            bounds.min.1.div_euclid(tile_px),
            (bounds.max.1 - 1).div_euclid(tile_px),
        );

        let mut tiles = Vec::new();
        for ty in y0.max(0)..=y1.min(grid - 1) {
            for tx in x0..=x1 {
                let ox = tx * tile_px - bounds.min.0;
                let oy = ty * tile_px - bounds.min.1;
                let rect = dest.as_ref().map_or(
                    TileRect {
                        x: ox,
                        y: oy,
                        width: u32::try_from(tile_px).unwrap_or(u32::MAX),
                        height: u32::try_from(tile_px).unwrap_or(u32::MAX),
                    },
                    |scale| scale.apply(ox, oy, tile_px),
                );
                let row = if self.tms { grid - 1 - ty } else { ty };
                let (Ok(x), Ok(y)) = (u32::try_from(tx.rem_euclid(grid)), u32::try_from(row))
                else {
                    continue;
                };
                tiles.push(self.fetch_tile(rect, self.tile_url(native, x, y)));
            }
        }
        log::trace!(
            target: "tileprint::xyz",
            "layer '{}' at z{} (native {native}): {} tiles",
            self.name,
            request.zoom,
            tiles.len()
        );
        tiles
    }
}
