//! Spherical-mercator projection and page pixel geometry.
//!
//! Pixel coordinates follow the slippy-map convention: at zoom `z` the world
//! is a square of `256 * 2^z` pixels, origin at the north-west corner.

use std::f64::consts::PI;

/// The fixed high zoom at which page geometry is computed once per page.
///
/// Every zoom bucket's extents are derived from bounds at this zoom by an
/// exact power-of-two division.
pub const REFERENCE_ZOOM: u8 = 24;

/// Edge length of a map tile in pixels.
pub const TILE_SIZE: u32 = 256;

const EARTH_RADIUS: f64 = 6_378_137.0;
const MAX_LATITUDE: f64 = 85.051_128_779_8;
const MM_PER_INCH: f64 = 25.4;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

impl LatLng {
    /// Construct a position.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A geographic rectangle given by its north-west and south-east corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    /// Top-left corner.
    pub north_west: LatLng,
    /// Bottom-right corner.
    pub south_east: LatLng,
}

impl LatLngBounds {
    /// Construct bounds from corners.
    #[must_use]
    pub const fn new(north_west: LatLng, south_east: LatLng) -> Self {
        Self {
            north_west,
            south_east,
        }
    }
}

/// A point on the projected pixel plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal pixel coordinate.
    pub x: f64,
    /// Vertical pixel coordinate (grows southward).
    pub y: f64,
}

/// Project `latlng` onto the pixel plane at `zoom` (EPSG:3857).
#[must_use]
pub fn project(latlng: LatLng, zoom: u8) -> Point {
    let d = PI / 180.0;
    let lat = latlng.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin = (lat * d).sin();
    let mx = EARTH_RADIUS * latlng.lng * d;
    let my = EARTH_RADIUS * ((1.0 + sin) / (1.0 - sin)).ln() / 2.0;

    let scale = f64::from(TILE_SIZE) * 2f64.powi(i32::from(zoom));
    let k = 0.5 / (PI * EARTH_RADIUS);
    Point {
        x: scale * k.mul_add(mx, 0.5),
        y: scale * (-k).mul_add(my, 0.5),
    }
}

/// Round half up, matching how browser map clients round pixel positions.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// Integer pixel bounds on the projected plane, `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    /// Top-left corner `(x, y)`.
    pub min: (i64, i64),
    /// Bottom-right corner `(x, y)`.
    pub max: (i64, i64),
}

impl PixelBounds {
    /// Project a page's corners at `zoom`, rounding each to whole pixels.
    #[must_use]
    pub fn for_bounds(bounds: &LatLngBounds, zoom: u8) -> Self {
        let nw = project(bounds.north_west, zoom);
        let se = project(bounds.south_east, zoom);
        Self {
            min: (round_half_up(nw.x), round_half_up(nw.y)),
            max: (round_half_up(se.x), round_half_up(se.y)),
        }
    }

    /// Derive bounds at zoom `z` from bounds computed at `from_zoom` by
    /// dividing by `2^(from_zoom - z)` and rounding each corner.
    ///
    /// `z` greater than `from_zoom` multiplies instead.
    #[must_use]
    pub fn rescale(&self, from_zoom: u8, z: u8) -> Self {
        let shift = i32::from(from_zoom) - i32::from(z);
        let q = 2f64.powi(shift);
        let div = |v: i64| round_half_up(v as f64 / q);
        Self {
            min: (div(self.min.0), div(self.min.1)),
            max: (div(self.max.0), div(self.max.1)),
        }
    }

    /// Width in pixels (zero if degenerate).
    #[must_use]
    pub fn width(&self) -> u32 {
        u32::try_from(self.max.0 - self.min.0).unwrap_or(0)
    }

    /// Height in pixels (zero if degenerate).
    #[must_use]
    pub fn height(&self) -> u32 {
        u32::try_from(self.max.1 - self.min.1).unwrap_or(0)
    }

    /// `(width, height)` in pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// A printable page: a paper size and the geographic area drawn on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    /// Paper size `(width, height)` in millimetres.
    pub print_size_mm: (f64, f64),
    /// Geographic area covered by the page.
    pub bounds: LatLngBounds,
}

impl Page {
    /// Destination raster size at `dpi`: `round(mm * dpi / 25.4)` per axis.
    #[must_use]
    pub fn dest_pixel_size(&self, dpi: f64) -> (u32, u32) {
        let px = |mm: f64| u32::try_from(round_half_up(mm * dpi / MM_PER_INCH)).unwrap_or(0);
        (px(self.print_size_mm.0), px(self.print_size_mm.1))
    }

    /// Pixel bounds at [`REFERENCE_ZOOM`].
    #[must_use]
    pub fn reference_bounds(&self) -> PixelBounds {
        PixelBounds::for_bounds(&self.bounds, REFERENCE_ZOOM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_origin() {
        let p = project(LatLng::new(0.0, 0.0), 0);
        assert!((p.x - 128.0).abs() < 1e-9);
        assert!((p.y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_corners() {
        let nw = project(LatLng::new(90.0, -180.0), 1);
        assert!(nw.x.abs() < 1e-6);
        assert!(nw.y.abs() < 1e-3);
        let se = project(LatLng::new(-90.0, 180.0), 1);
        assert!((se.x - 512.0).abs() < 1e-6);
        assert!((se.y - 512.0).abs() < 1e-3);
    }

    #[test]
    fn test_rescale_halves_per_zoom() {
        let b = PixelBounds {
            min: (1000, 2000),
            max: (1512, 2256),
        };
        let half = b.rescale(10, 9);
        assert_eq!(half.min, (500, 1000));
        assert_eq!(half.max, (756, 1128));
        assert_eq!(b.rescale(10, 10), b);
    }

    #[test]
    fn test_dest_pixel_size() {
        let page = Page {
            print_size_mm: (25.4, 50.8),
            bounds: LatLngBounds::new(LatLng::new(1.0, 0.0), LatLng::new(0.0, 1.0)),
        };
        assert_eq!(page.dest_pixel_size(300.0), (300, 600));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(-2.5), -2);
    }
}
