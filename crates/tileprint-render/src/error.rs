//! Render pipeline errors.
//!
//! Nothing here is retried inside the pipeline: every variant aborts the
//! current page and the whole request, and surfaces to the caller of
//! [`RenderPipeline::render`](crate::RenderPipeline::render).

use thiserror::Error;

/// Error type for page rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A layer could not report where it sits in the stacking order.
    ///
    /// Raised while resolving z-order, before any tile is fetched.
    #[error("layer '{layer}' has no stacking anchor and cannot be printed")]
    LayerNotRenderable {
        /// Name of the offending layer.
        layer: String,
    },

    /// Two buffers that must share extents did not.
    ///
    /// Indicates an internal invariant violation.
    #[error(
        "buffer size mismatch: source is {src_width}x{src_height}, \
         destination is {dest_width}x{dest_height}"
    )]
    BufferSizeMismatch {
        /// Source width in pixels.
        src_width: u32,
        /// Source height in pixels.
        src_height: u32,
        /// Destination width in pixels.
        dest_width: u32,
        /// Destination height in pixels.
        dest_height: u32,
    },

    /// A tile could not be fetched for a reason other than "not found".
    #[error("failed to fetch tile '{url}': {reason}")]
    TileFetchFailed {
        /// The tile URL.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// Tile bytes arrived but were not a decodable image.
    #[error("failed to decode tile '{url}': {reason}")]
    TileDecodeFailed {
        /// The tile URL.
        url: String,
        /// Decoder message.
        reason: String,
    },

    /// The caller stopped the render.
    #[error("render cancelled")]
    RenderCancelled,

    /// A fetch worker exited without reporting a result (it panicked).
    #[error("tile fetch worker exited without a result")]
    WorkerLost,

    /// The finished page could not be encoded.
    #[error("failed to encode page: {0}")]
    Encode(#[from] image::ImageError),
}

impl RenderError {
    /// Whether this error is a caller-initiated stop rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::RenderCancelled)
    }
}

/// Shorthand for results in this crate.
pub type Result<T, E = RenderError> = std::result::Result<T, E>;
