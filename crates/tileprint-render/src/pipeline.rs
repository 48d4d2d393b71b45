//! The page render pipeline.
//!
//! # Architecture
//!
//! ```text
//! layers ─▶ zorder::resolve ─┐
//!                            ▼
//! for each page:  TileStream(layer 0) ++ TileStream(layer 1) ++ …
//!                            │
//!                   ConcurrencyWindow (FIFO, N in flight)
//!                            │
//!              progress(inc, total) ; composer.put_tile
//!                            │
//!                   composer.finalize ─▶ PageImage
//! ```
//!
//! Compositing happens on the calling thread; only tile fetches overlap.

use crate::cancel::CancelToken;
use crate::composer::ZoomBucketComposer;
use crate::error::{RenderError, Result};
use crate::geo::Page;
use crate::layer::{PrintLayer, ZoomSelection};
use crate::output::{PageFormat, PageImage};
use crate::tiles::{PageGeometry, page_tiles};
use crate::window::{ConcurrencyWindow, DEFAULT_MAX_IN_FLIGHT};
use crate::zorder;
use std::fmt;
use std::sync::Arc;
use tileprint_common::warning::WarningSet;

/// Progress callback: `(increment, total_range)`, once per tile.
pub type ProgressFn<'a> = Box<dyn FnMut(f64, f64) + 'a>;

/// Pipeline settings that outlive a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum concurrently outstanding tile fetches.
    pub max_in_flight: usize,
    /// Page encoding.
    pub output: PageFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            output: PageFormat::default(),
        }
    }
}

/// One export action: which layers, which pages, at what resolution.
pub struct RenderRequest<'a> {
    /// Layers to print, in any order.
    pub layers: Vec<&'a dyn PrintLayer>,
    /// Pages to render, in output order.
    pub pages: Vec<Page>,
    /// Zoom per layer kind.
    pub zooms: ZoomSelection,
    /// Output resolution.
    pub resolution_dpi: f64,
    /// Print scale passed through to layers.
    pub scale: f64,
    /// Called once per processed tile, including tiles with no content.
    pub progress: ProgressFn<'a>,
    /// Caller-held stop signal.
    pub cancel: Option<CancelToken>,
}

impl<'a> RenderRequest<'a> {
    /// A request with scale 1, no progress reporting and no stop signal.
    #[must_use]
    pub fn new(
        layers: Vec<&'a dyn PrintLayer>,
        pages: Vec<Page>,
        zooms: ZoomSelection,
        resolution_dpi: f64,
    ) -> Self {
        Self {
            layers,
            pages,
            zooms,
            resolution_dpi,
            scale: 1.0,
            progress: Box::new(|_, _| {}),
            cancel: None,
        }
    }

    /// Set the print scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Report progress to `progress`.
    #[must_use]
    pub fn on_progress(mut self, progress: impl FnMut(f64, f64) + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Stop the render when `cancel` is cancelled.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Total progress range: the sum of layer weights times the page count.
    #[must_use]
    pub fn progress_range(&self) -> f64 {
        self.layers
            .iter()
            .map(|layer| layer.print_progress_weight())
            .sum::<f64>()
            * self.pages.len() as f64
    }
}

impl fmt::Debug for RenderRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRequest")
            .field("layers", &self.layers.iter().map(|l| l.name()).collect::<Vec<_>>())
            .field("pages", &self.pages)
            .field("zooms", &self.zooms)
            .field("resolution_dpi", &self.resolution_dpi)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

/// Renders print requests into page images.
#[derive(Debug, Clone, Default)]
pub struct RenderPipeline {
    config: PipelineConfig,
}

impl RenderPipeline {
    /// Create a pipeline.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The pipeline's settings.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Render every page of `request`, in order.
    ///
    /// Returns one [`PageImage`] per page, or the first error. A failed or
    /// cancelled render returns no pages at all.
    ///
    /// # Errors
    ///
    /// - [`RenderError::LayerNotRenderable`] before any fetch starts.
    /// - [`RenderError::TileFetchFailed`] / [`RenderError::TileDecodeFailed`]
    ///   / [`RenderError::WorkerLost`] from the tile stream.
    /// - [`RenderError::RenderCancelled`] if the request's token fires.
    /// - [`RenderError::BufferSizeMismatch`] / [`RenderError::Encode`] from
    ///   the composer.
    pub fn render(&self, request: RenderRequest<'_>) -> Result<Vec<PageImage>> {
        let warnings = Arc::new(WarningSet::new());
        let total_range = request.progress_range();
        let RenderRequest {
            layers,
            pages,
            zooms,
            resolution_dpi,
            scale,
            mut progress,
            cancel,
        } = request;

        let ordered = zorder::resolve(&layers)?;
        log::info!(
            target: "tileprint::pipeline",
            "rendering {} pages with {} layers at {resolution_dpi} dpi",
            pages.len(),
            ordered.len()
        );

        let mut images = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let geometry = PageGeometry {
                page,
                dest_size: page.dest_pixel_size(resolution_dpi),
                zooms,
                resolution_dpi,
                scale,
            };
            let image = self.render_page(
                &ordered,
                geometry,
                total_range,
                &mut progress,
                cancel.as_ref(),
                &warnings,
            )?;
            log::info!(
                target: "tileprint::pipeline",
                "page {}/{} done ({}x{}, {} bytes)",
                index + 1,
                pages.len(),
                image.width,
                image.height,
                image.bytes.len()
            );
            images.push(image);
        }
        Ok(images)
    }

    fn render_page(
        &self,
        ordered: &[&dyn PrintLayer],
        geometry: PageGeometry<'_>,
        total_range: f64,
        progress: &mut ProgressFn<'_>,
        cancel: Option<&CancelToken>,
        warnings: &Arc<WarningSet>,
    ) -> Result<PageImage> {
        let is_cancelled = || cancel.is_some_and(CancelToken::is_cancelled);
        if is_cancelled() {
            return Err(RenderError::RenderCancelled);
        }

        let mut composer = ZoomBucketComposer::new(
            geometry.dest_size,
            geometry.page.reference_bounds(),
            self.config.output,
        )
        .with_warnings(Arc::clone(warnings));
        let tiles = page_tiles(ordered, geometry);
        let mut window = match cancel {
            Some(token) => ConcurrencyWindow::with_cancel(tiles, self.config.max_in_flight, token),
            None => ConcurrencyWindow::new(tiles, self.config.max_in_flight),
        };

        while let Some(result) = window.next() {
            if is_cancelled() {
                window.stop();
                return Err(RenderError::RenderCancelled);
            }
            let tile = match result.and_then(|fetched| fetched) {
                Ok(tile) => tile,
                Err(e) => {
                    window.stop();
                    log::warn!(target: "tileprint::pipeline", "page aborted: {e}");
                    return Err(e);
                }
            };
            progress(tile.progress_increment, total_range);
            if let Err(e) = composer.put_tile(tile) {
                window.stop();
                return Err(e);
            }
        }

        composer.finalize()
    }
}
