//! JSON job files.
//!
//! A job lists tile layers, pages and print settings:
//!
//! ```json
//! {
//!   "resolution_dpi": 300,
//!   "zooms": { "map_zoom": 15, "sat_zoom": 16 },
//!   "layers": [
//!     { "name": "osm", "url": "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
//!       "subdomains": ["a", "b", "c"], "scale_dependent": true },
//!     { "name": "hillshade", "url": "tiles/shade/{z}/{x}/{y}.png", "overlay": true }
//!   ],
//!   "pages": [
//!     { "size_mm": [190, 277], "north_west": [55.80, 37.55], "south_east": [55.74, 37.65] }
//!   ]
//! }
//! ```
//!
//! Layer order in the file does not matter. Each layer is placed in a pane
//! (`tile` or `overlay`) and ordered within it by `z_index`, the way a web map
//! stacks its layer containers.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tileprint_common::net::TileFetcher;
use tileprint_common::url::resolve_url;
use tileprint_render::geo::{LatLng, LatLngBounds, Page};
use tileprint_render::stacking::SurfaceTree;
use tileprint_render::{XyzTileLayer, ZoomSelection};

const TILE_PANE_Z: i32 = 200;
const OVERLAY_PANE_Z: i32 = 400;

/// Where a layer's container lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pane {
    /// Base map tiles.
    Tile,
    /// Semi-transparent overlays.
    Overlay,
}

impl Pane {
    const fn z_index(self) -> i32 {
        match self {
            Self::Tile => TILE_PANE_Z,
            Self::Overlay => OVERLAY_PANE_Z,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_weight() -> f64 {
    1.0
}

const fn default_scale() -> f64 {
    1.0
}

const fn default_dpi() -> f64 {
    300.0
}

/// One tile layer.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerSpec {
    /// Display name.
    pub name: String,
    /// URL template with `{z}`, `{x}`, `{y}` and optionally `{s}`.
    pub url: String,
    /// Hosts for `{s}`.
    #[serde(default)]
    pub subdomains: Vec<String>,
    /// Pane; defaults to `overlay` for overlays and `tile` otherwise.
    #[serde(default)]
    pub pane: Option<Pane>,
    /// Order within the pane.
    #[serde(default)]
    pub z_index: Option<i32>,
    /// Multiply through the base map.
    #[serde(default)]
    pub overlay: bool,
    /// Print at the map zoom.
    #[serde(default)]
    pub scale_dependent: bool,
    /// Progress weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// TMS row numbering.
    #[serde(default)]
    pub tms: bool,
    /// Highest zoom the source serves.
    #[serde(default)]
    pub max_native_zoom: Option<u8>,
    /// Set to `false` to keep the layer out of the print.
    #[serde(default = "default_true")]
    pub print: bool,
}

impl LayerSpec {
    fn pane(&self) -> Pane {
        self.pane.unwrap_or(if self.overlay {
            Pane::Overlay
        } else {
            Pane::Tile
        })
    }
}

/// One page.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageSpec {
    /// Paper size `[width, height]` in millimetres.
    pub size_mm: [f64; 2],
    /// `[lat, lng]` of the top-left corner.
    pub north_west: [f64; 2],
    /// `[lat, lng]` of the bottom-right corner.
    pub south_east: [f64; 2],
}

impl From<PageSpec> for Page {
    fn from(spec: PageSpec) -> Self {
        let [nw_lat, nw_lng] = spec.north_west;
        let [se_lat, se_lng] = spec.south_east;
        Self {
            print_size_mm: (spec.size_mm[0], spec.size_mm[1]),
            bounds: LatLngBounds::new(LatLng::new(nw_lat, nw_lng), LatLng::new(se_lat, se_lng)),
        }
    }
}

/// Zoom levels.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ZoomSpec {
    /// Zoom for scale-dependent layers.
    pub map_zoom: u8,
    /// Zoom for everything else.
    pub sat_zoom: u8,
}

/// A parsed job file.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    /// Output resolution.
    #[serde(default = "default_dpi")]
    pub resolution_dpi: f64,
    /// Print scale passed through to layers.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Zoom levels.
    pub zooms: ZoomSpec,
    /// Layers in any order.
    pub layers: Vec<LayerSpec>,
    /// Pages in output order.
    pub pages: Vec<PageSpec>,
}

impl Job {
    /// Read and parse a job file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read job file '{}'", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid job file '{}'", path.display()))
    }

    /// Parse job JSON.
    pub fn parse(text: &str) -> Result<Self> {
        let job: Self = serde_json::from_str(text)?;
        if job.pages.is_empty() {
            anyhow::bail!("job has no pages");
        }
        Ok(job)
    }

    /// Zoom selection for the pipeline.
    pub const fn zooms(&self) -> ZoomSelection {
        ZoomSelection {
            map_zoom: self.zooms.map_zoom,
            sat_zoom: self.zooms.sat_zoom,
        }
    }

    /// Pages for the pipeline.
    pub fn pages(&self) -> Vec<Page> {
        self.pages.iter().copied().map(Page::from).collect()
    }

    /// Build the printable layers.
    ///
    /// Relative tile paths are resolved against `base_dir`. Layers with
    /// `print: false` are skipped.
    pub fn build_layers(
        &self,
        fetcher: &Arc<dyn TileFetcher>,
        base_dir: Option<&str>,
    ) -> Vec<XyzTileLayer> {
        let mut tree = SurfaceTree::new();
        let root = tree.root();
        let tile_pane = tree.insert(root, "tilePane", Some(Pane::Tile.z_index()));
        let overlay_pane = tree.insert(root, "overlayPane", Some(Pane::Overlay.z_index()));

        self.layers
            .iter()
            .filter(|spec| {
                if !spec.print {
                    log::info!("skipping layer '{}' (print disabled)", spec.name);
                }
                spec.print
            })
            .map(|spec| {
                let pane = match spec.pane() {
                    Pane::Tile => tile_pane,
                    Pane::Overlay => overlay_pane,
                };
                let container = tree.insert(pane, &spec.name, spec.z_index);
                XyzTileLayer::new(
                    spec.name.clone(),
                    resolve_url(&spec.url, base_dir),
                    Arc::clone(fetcher),
                )
                .with_subdomains(spec.subdomains.clone())
                .with_tms(spec.tms)
                .with_max_native_zoom(spec.max_native_zoom)
                .with_overlay(spec.overlay)
                .with_scale_dependent(spec.scale_dependent)
                .with_weight(spec.weight)
                .with_stacking_path(tree.stacking_path(container))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileprint_common::net::FetchError;
    use tileprint_render::PrintLayer;
    use tileprint_render::zorder::resolve;

    struct NoTiles;

    impl TileFetcher for NoTiles {
        fn fetch(&self, _url: &str) -> Result<Option<Vec<u8>>, FetchError> {
            Ok(None)
        }
    }

    const JOB: &str = r#"{
        "resolution_dpi": 150,
        "zooms": { "map_zoom": 14, "sat_zoom": 15 },
        "layers": [
            { "name": "shade", "url": "shade/{z}/{x}/{y}.png", "overlay": true },
            { "name": "osm", "url": "https://{s}.tile.org/{z}/{x}/{y}.png",
              "subdomains": ["a", "b"], "z_index": 1, "scale_dependent": true },
            { "name": "sat", "url": "https://sat.org/{z}/{y}/{x}.jpg", "z_index": 0 },
            { "name": "hidden", "url": "https://h.org/{z}/{x}/{y}.png", "print": false }
        ],
        "pages": [
            { "size_mm": [190, 277], "north_west": [55.8, 37.55], "south_east": [55.74, 37.65] }
        ]
    }"#;

    #[test]
    fn test_parse_defaults() {
        let job = Job::parse(JOB).unwrap();
        assert!((job.resolution_dpi - 150.0).abs() < f64::EPSILON);
        assert!((job.scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(job.layers.len(), 4);
        assert!((job.layers[0].weight - 1.0).abs() < f64::EPSILON);
        assert_eq!(job.layers[0].pane(), Pane::Overlay);
        assert_eq!(job.layers[1].pane(), Pane::Tile);
        assert!(!job.layers[3].print);

        let page = job.pages()[0];
        assert_eq!(page.print_size_mm, (190.0, 277.0));
        assert!((page.bounds.south_east.lng - 37.65).abs() < f64::EPSILON);
        assert_eq!(job.zooms().map_zoom, 14);
    }

    #[test]
    fn test_layers_stack_by_pane_then_z_index() {
        let job = Job::parse(JOB).unwrap();
        let fetcher: Arc<dyn TileFetcher> = Arc::new(NoTiles);
        let layers = job.build_layers(&fetcher, Some("/data/job"));
        assert_eq!(layers.len(), 3);

        let refs: Vec<&dyn PrintLayer> = layers.iter().map(|l| l as &dyn PrintLayer).collect();
        let ordered = resolve(&refs).unwrap();
        let names: Vec<&str> = ordered.iter().map(|l| l.name()).collect();
        assert_eq!(names, ["sat", "osm", "shade"]);
        assert_eq!(layers[0].stacking_path(), Some(vec![400, 0]));
    }

    #[test]
    fn test_relative_urls_resolve_against_job_dir() {
        let job = Job::parse(JOB).unwrap();
        let fetcher: Arc<dyn TileFetcher> = Arc::new(NoTiles);
        let layers = job.build_layers(&fetcher, Some("/data/job"));
        assert_eq!(layers[0].tile_url(3, 1, 2), "/data/job/shade/3/1/2.png");
        assert_eq!(layers[1].tile_url(3, 1, 2), "https://b.tile.org/3/1/2.png");
    }

    #[test]
    fn test_rejects_unknown_pane_and_empty_pages() {
        let bad_pane = JOB.replace(r#""overlay": true"#, r#""pane": "marker""#);
        assert!(Job::parse(&bad_pane).is_err());
        let no_pages = r#"{ "zooms": { "map_zoom": 1, "sat_zoom": 1 }, "layers": [], "pages": [] }"#;
        assert!(Job::parse(no_pages).is_err());
    }
}
