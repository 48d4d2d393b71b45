//! Print rasterization for stacked map tile layers.
//!
//! # Scope
//!
//! This crate turns a set of printable layers and a list of pages into
//! encoded page images:
//! - **Z-order** - layers sorted by their place in the surface hierarchy
//! - **Tile streaming** - per-layer tile enumeration tagged by zoom bucket
//! - **Bounded fetching** - a FIFO window of concurrent fetches
//! - **Composition** - zoom buckets resampled into the page, overlays
//!   multiplied through the base map
//! - **Encoding** - JPEG or PNG output
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tileprint_common::net::HttpFetcher;
//! use tileprint_render::geo::{LatLng, LatLngBounds, Page};
//! use tileprint_render::{PrintLayer, RenderPipeline, RenderRequest, XyzTileLayer, ZoomSelection};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(HttpFetcher::new()?);
//! let osm = XyzTileLayer::new("osm", "https://tile.openstreetmap.org/{z}/{x}/{y}.png", fetcher)
//!     .with_stacking_path(Some(vec![200, 0]));
//! let page = Page {
//!     print_size_mm: (190.0, 277.0),
//!     bounds: LatLngBounds::new(LatLng::new(55.80, 37.55), LatLng::new(55.74, 37.65)),
//! };
//! let layers: Vec<&dyn PrintLayer> = vec![&osm];
//! let request = RenderRequest::new(layers, vec![page], ZoomSelection { map_zoom: 15, sat_zoom: 16 }, 300.0);
//! let _pages = RenderPipeline::default().render(request)?;
//! # Ok(())
//! # }
//! ```

pub mod blend;
pub mod cancel;
pub mod composer;
pub mod error;
pub mod geo;
pub mod layer;
pub mod output;
pub mod pipeline;
pub mod stacking;
pub mod tiles;
pub mod window;
pub mod xyz;
pub mod zorder;

pub use cancel::CancelToken;
pub use composer::ZoomBucketComposer;
pub use error::{RenderError, Result};
pub use layer::{PageRequest, PrintLayer, TileFetch, TileRect, ZoomSelection};
pub use output::{PageFormat, PageImage};
pub use pipeline::{PipelineConfig, RenderPipeline, RenderRequest};
pub use tiles::{TileResult, TileStream, ZoomBucketKey};
pub use window::{ConcurrencyWindow, Task};
pub use xyz::XyzTileLayer;
