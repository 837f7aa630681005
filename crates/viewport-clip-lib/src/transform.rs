//! Domain-to-view transforms and Web Mercator coordinate conversions
//!
//! Shapes keep their points in domain coordinates and reach view space through a
//! [`ViewTransform`]. Any `Fn(Point<f64>) -> Point<f64>` closure works as a transform.

use crate::{BoundingRectangle, SurfaceSize};
use geo::Point;

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_MERCATOR_MIN: f64 = -20037508.34;
pub const EARTH_SIZE_METERS: f64 = EARTH_MERCATOR_MAX - EARTH_MERCATOR_MIN;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Side of one map tile in pixels; zoom level 0 shows the world on one tile
pub const TILE_SIZE: f64 = 256.0;

const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;
const X_TO_LON_FACTOR: f64 = 180.0 / EARTH_MERCATOR_MAX;
const Y_TO_LAT_FACTOR: f64 = std::f64::consts::PI / EARTH_MERCATOR_MAX;

/// Maps domain points into view space
///
/// Implementations must be pure. Non-finite outputs are allowed and simply never
/// become visible.
pub trait ViewTransform: Send + Sync {
    fn to_view(&self, point: Point<f64>) -> Point<f64>;
}

impl<F> ViewTransform for F
where
    F: Fn(Point<f64>) -> Point<f64> + Send + Sync,
{
    #[inline(always)]
    fn to_view(&self, point: Point<f64>) -> Point<f64> {
        self(point)
    }
}

/// Domain points are already in view space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityTransform;

impl ViewTransform for IdentityTransform {
    #[inline(always)]
    fn to_view(&self, point: Point<f64>) -> Point<f64> {
        point
    }
}

/// Convert WGS84 (lat, lon) to Web Mercator (x, y) in meters
///
/// # Arguments
/// * `lat` - Latitude in degrees, clamped to the Web Mercator range
/// * `lon` - Longitude in degrees (-180 to 180)
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    wgs84_to_mercator_unclamped(lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), lon)
}

/// Convert WGS84 to Web Mercator without clamping (for trusted input)
#[inline(always)]
pub fn wgs84_to_mercator_unclamped(lat: f64, lon: f64) -> Point<f64> {
    let x = lon * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;
    Point::new(x, y)
}

/// Convert Web Mercator (x, y) in meters to WGS84, returned as (latitude, longitude)
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x * X_TO_LON_FACTOR;
    let lat =
        (std::f64::consts::PI / 2.0 - 2.0 * ((-y * Y_TO_LAT_FACTOR).exp()).atan()).to_degrees();
    (lat, lon)
}

/// Check if a point is within Web Mercator bounds
#[inline(always)]
pub fn is_valid_mercator(point: &Point<f64>) -> bool {
    let x = point.x();
    let y = point.y();
    (EARTH_MERCATOR_MIN..=EARTH_MERCATOR_MAX).contains(&x)
        && (EARTH_MERCATOR_MIN..=EARTH_MERCATOR_MAX).contains(&y)
}

/// Slippy-map view of WGS84 data at a fixed zoom level
///
/// Domain points are `(lon, lat)` in degrees. View space is world pixels: the whole world
/// is `256 * 2^zoom` pixels wide, the origin is the north-west corner and y grows
/// southwards. Panning only moves the visible rectangle, zooming replaces the transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercatorView {
    zoom: f64,
}

impl WebMercatorView {
    pub fn new(zoom: f64) -> Self {
        Self { zoom }
    }

    #[inline]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Size of the world in view units
    #[inline]
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    #[inline(always)]
    fn pixels_per_meter(&self) -> f64 {
        self.world_size() / EARTH_SIZE_METERS
    }

    /// Inverse of [`ViewTransform::to_view`], returned as (latitude, longitude)
    pub fn to_wgs84(&self, view: Point<f64>) -> (f64, f64) {
        let ppm = self.pixels_per_meter();
        let x = view.x() / ppm + EARTH_MERCATOR_MIN;
        let y = EARTH_MERCATOR_MAX - view.y() / ppm;
        mercator_to_wgs84(x, y)
    }

    /// Visible rectangle of a surface centered on a location, one view unit per pixel
    pub fn visible_rect(
        &self,
        center_lat: f64,
        center_lon: f64,
        surface: SurfaceSize,
    ) -> BoundingRectangle {
        let center = self.to_view(Point::new(center_lon, center_lat));
        BoundingRectangle::from_center_size(center, surface.width, surface.height)
    }
}

impl ViewTransform for WebMercatorView {
    #[inline(always)]
    fn to_view(&self, point: Point<f64>) -> Point<f64> {
        let mercator = wgs84_to_mercator(point.y(), point.x());
        let ppm = self.pixels_per_meter();
        Point::new(
            (mercator.x() - EARTH_MERCATOR_MIN) * ppm,
            (EARTH_MERCATOR_MAX - mercator.y()) * ppm,
        )
    }
}
