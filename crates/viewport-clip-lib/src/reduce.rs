//! Clip-and-reduce of polylines and polygons against an acceptance window
//!
//! Polylines are split into one piece per visible run. Inside a run, points that would
//! land on the same device pixel as the previously retained point are dropped. Points
//! are only ever dropped, never moved: every output point is either an input point or
//! an exact boundary crossing.

use crate::clip::{clip_segment, is_finite_point};
use crate::{BoundingRectangle, Config, SurfaceSize};
use geo::Point;

/// One contiguous visible run of a polyline (at least two points)
pub type Piece = Vec<Point<f64>>;

/// Per-axis distance, in view units, under which two points share a device pixel
#[derive(Debug, Clone, Copy)]
struct PixelTolerance {
    x: f64,
    y: f64,
}

impl PixelTolerance {
    fn new(window: &BoundingRectangle, surface: SurfaceSize, pixels: f64) -> Self {
        if window.is_empty() || !surface.is_valid() {
            return Self { x: 0.0, y: 0.0 };
        }
        let sanitize = |value: f64| if value.is_finite() { value.max(0.0) } else { 0.0 };
        Self {
            x: sanitize(pixels * window.width() / surface.width),
            y: sanitize(pixels * window.height() / surface.height),
        }
    }

    #[inline(always)]
    fn same_pixel(&self, a: Point<f64>, b: Point<f64>) -> bool {
        a == b || ((a.x() - b.x()).abs() < self.x && (a.y() - b.y()).abs() < self.y)
    }
}

/// Accumulates the piece currently being walked
struct PieceBuilder {
    tolerance: PixelTolerance,
    current: Piece,
    /// Latest accepted point that was merged into the last retained one
    pending: Option<Point<f64>>,
}

impl PieceBuilder {
    fn new(tolerance: PixelTolerance) -> Self {
        Self {
            tolerance,
            current: Vec::new(),
            pending: None,
        }
    }

    #[inline]
    fn is_idle(&self) -> bool {
        self.current.is_empty()
    }

    #[inline]
    fn start(&mut self, entry: Point<f64>) {
        self.current.push(entry);
    }

    #[inline]
    fn push(&mut self, point: Point<f64>) {
        match self.current.last() {
            Some(&last) if self.tolerance.same_pixel(last, point) => {
                self.pending = Some(point);
            }
            _ => {
                self.current.push(point);
                self.pending = None;
            }
        }
    }

    /// End the piece at an exact exit crossing
    fn close_at(&mut self, exit: Point<f64>, pieces: &mut Vec<Piece>) {
        self.pending = None;
        // A vertex lying on the edge is already the exit crossing
        if self.current.len() < 2 || self.current.last() != Some(&exit) {
            self.current.push(exit);
        }
        self.emit(pieces);
    }

    /// End the piece at the last accepted point
    fn finish(&mut self, pieces: &mut Vec<Piece>) {
        if let Some(last) = self.pending.take() {
            self.current.push(last);
        }
        self.emit(pieces);
    }

    fn emit(&mut self, pieces: &mut Vec<Piece>) {
        if self.current.len() >= 2 {
            pieces.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
        self.pending = None;
    }
}

/// Clips polylines and polygons to a window and drops sub-pixel detail
///
/// The reducer holds no state between calls, so one instance can serve any number of
/// shapes, including from several threads at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineReducer {
    pixel_tolerance: f64,
}

impl Default for PolylineReducer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PolylineReducer {
    /// Create a reducer merging points closer than `pixel_tolerance` device pixels
    ///
    /// Non-finite or negative tolerances disable merging.
    pub fn new(pixel_tolerance: f64) -> Self {
        let pixel_tolerance = if pixel_tolerance.is_finite() {
            pixel_tolerance.max(0.0)
        } else {
            0.0
        };
        Self { pixel_tolerance }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.pixel_tolerance)
    }

    #[inline]
    pub fn pixel_tolerance(&self) -> f64 {
        self.pixel_tolerance
    }

    /// Clip and reduce a polyline, returning its visible pieces
    ///
    /// # Arguments
    /// * `points` - Polyline in view space
    /// * `window` - Acceptance window (visible extent plus half the stroke thickness)
    /// * `surface` - Rendering surface size in device pixels
    pub fn reduce(
        &self,
        points: &[Point<f64>],
        window: &BoundingRectangle,
        surface: SurfaceSize,
    ) -> Vec<Piece> {
        let mut pieces = Vec::new();
        self.reduce_into(points, window, surface, &mut pieces);
        pieces
    }

    /// Same as [`PolylineReducer::reduce`], writing into a caller-owned buffer
    ///
    /// `pieces` is cleared first.
    pub fn reduce_into(
        &self,
        points: &[Point<f64>],
        window: &BoundingRectangle,
        surface: SurfaceSize,
        pieces: &mut Vec<Piece>,
    ) {
        pieces.clear();
        if points.len() < 2 || window.is_empty() {
            return;
        }

        let tolerance = PixelTolerance::new(window, surface, self.pixel_tolerance);
        let mut builder = PieceBuilder::new(tolerance);

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            match clip_segment(window, a, b) {
                None => builder.finish(pieces),
                Some((entry, exit)) => {
                    if builder.is_idle() {
                        builder.start(entry);
                    }
                    if exit != b {
                        builder.close_at(exit, pieces);
                    } else {
                        builder.push(b);
                    }
                }
            }
        }
        builder.finish(pieces);

        tracing::trace!(
            "Reduced polyline of {} points into {} pieces",
            points.len(),
            pieces.len()
        );
    }

    /// Reduce a closed polygon ring
    ///
    /// Polygons are never split by visibility since their fill still matters when the
    /// outline leaves the window. Only invalid vertices and vertices sharing a device
    /// pixel with their predecessor are dropped. A polygon whose bounds miss the window
    /// entirely produces no vertices.
    pub fn reduce_polygon(
        &self,
        points: &[Point<f64>],
        window: &BoundingRectangle,
        surface: SurfaceSize,
    ) -> Vec<Point<f64>> {
        let mut ring = Vec::new();
        self.reduce_polygon_into(points, window, surface, &mut ring);
        ring
    }

    /// Same as [`PolylineReducer::reduce_polygon`], writing into a caller-owned buffer
    pub fn reduce_polygon_into(
        &self,
        points: &[Point<f64>],
        window: &BoundingRectangle,
        surface: SurfaceSize,
        ring: &mut Vec<Point<f64>>,
    ) {
        ring.clear();
        if window.is_empty() {
            return;
        }

        let bounds = BoundingRectangle::from_points(
            points.iter().copied().filter(|point| is_finite_point(*point)),
        );
        if !bounds.intersects(window) {
            return;
        }

        let tolerance = PixelTolerance::new(window, surface, self.pixel_tolerance);
        for &point in points {
            if !is_finite_point(point) {
                continue;
            }
            match ring.last() {
                Some(&last) if tolerance.same_pixel(last, point) => {}
                _ => ring.push(point),
            }
        }

        // The ring closes implicitly, a closing vertex on the first one is redundant
        if ring.len() >= 3 && tolerance.same_pixel(ring[0], ring[ring.len() - 1]) {
            ring.pop();
        }
        if ring.len() < 2 {
            ring.clear();
        }
    }
}
