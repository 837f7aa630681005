//! JSON report of a replayed viewport session

use geo::Point;
use serde::Serialize;
use viewport_clip_lib::{
    BoundingRectangle, Config, GeometrySink, SurfaceSize, UpdateStats, WebMercatorView,
};

/// Geographic location in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Geographic bounds in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLonBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLonBounds {
    /// Convert world-pixel bounds (y growing southwards) back to degrees
    pub fn from_view(view: &WebMercatorView, bounds: &BoundingRectangle) -> Option<Self> {
        if bounds.is_empty() {
            return None;
        }
        let (south, west) = view.to_wgs84(Point::new(bounds.west(), bounds.north()));
        let (north, east) = view.to_wgs84(Point::new(bounds.east(), bounds.south()));
        Some(Self {
            south,
            west,
            north,
            east,
        })
    }
}

/// Geometry handed to the sink during one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeometrySummary {
    pub polylines: usize,
    pub polygons: usize,
    pub points: usize,
    pub bounds: Option<LatLonBounds>,
}

/// Sink that only measures what would be drawn
#[derive(Debug, Clone, Default)]
pub struct SummarySink {
    polylines: usize,
    polygons: usize,
    points: usize,
    bounds: BoundingRectangle,
    invalidated: bool,
}

impl SummarySink {
    pub fn invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn summary(&self, view: &WebMercatorView) -> GeometrySummary {
        GeometrySummary {
            polylines: self.polylines,
            polygons: self.polygons,
            points: self.points,
            bounds: LatLonBounds::from_view(view, &self.bounds),
        }
    }

    fn add_points(&mut self, points: &[Point<f64>]) {
        self.points += points.len();
        for &point in points {
            self.bounds |= point;
        }
    }
}

impl GeometrySink for SummarySink {
    fn add_polyline(&mut self, points: &[Point<f64>]) {
        self.polylines += 1;
        self.add_points(points);
    }

    fn add_polygon(&mut self, ring: &[Point<f64>]) {
        self.polygons += 1;
        self.add_points(ring);
    }

    fn invalidate(&mut self) {
        self.invalidated = true;
    }
}

/// One replayed frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub index: usize,
    pub trigger: String,
    /// Horizontal pan offset from the initial viewport, in pixels
    pub offset_pixels: f64,
    pub stats: UpdateStats,
    pub emitted: GeometrySummary,
    pub invalidated: bool,
    pub elapsed_us: u64,
}

/// Whole session report printed on stdout
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub shapes: usize,
    pub input_points: usize,
    pub zoom: f64,
    pub center: LatLon,
    pub surface: SurfaceSize,
    pub config: Config,
    pub frames: Vec<FrameReport>,
}
