//! Cohen-Sutherland clipping of a single line segment against a rectangle
//!
//! The clipper only compares coordinates against the four bounds, so it works the same
//! whether the vertical axis grows upwards (map space) or downwards (screen space).

use crate::BoundingRectangle;
use bitflags::bitflags;
use geo::Point;

/// Points closer than this to a bound are treated as lying on it
pub const BOUNDARY_TOLERANCE: f64 = 1e-4;

/// Upper bound on edge intersections computed for one segment
pub const MAX_CLIP_ITERATIONS: usize = 16;

bitflags! {
    /// Sides of a rectangle violated by a point
    ///
    /// ```text
    ///          west  inside  east
    /// north    1001   1000   1010
    /// inside   0001   0000   0010
    /// south    0101   0100   0110
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Outcode: u8 {
        const WEST = 0b0001;
        const EAST = 0b0010;
        const SOUTH = 0b0100;
        const NORTH = 0b1000;
    }
}

/// Compute the outcode of `point` relative to `rect`
#[inline(always)]
pub fn outcode(rect: &BoundingRectangle, point: Point<f64>) -> Outcode {
    let mut code = Outcode::empty();

    if point.x() < rect.west() - BOUNDARY_TOLERANCE {
        code |= Outcode::WEST;
    } else if point.x() > rect.east() + BOUNDARY_TOLERANCE {
        code |= Outcode::EAST;
    }

    if point.y() < rect.south() - BOUNDARY_TOLERANCE {
        code |= Outcode::SOUTH;
    } else if point.y() > rect.north() + BOUNDARY_TOLERANCE {
        code |= Outcode::NORTH;
    }

    code
}

#[inline(always)]
pub(crate) fn is_finite_point(point: Point<f64>) -> bool {
    point.x().is_finite() && point.y().is_finite()
}

#[inline(always)]
fn has_nan_bound(rect: &BoundingRectangle) -> bool {
    rect.west().is_nan() || rect.east().is_nan() || rect.south().is_nan() || rect.north().is_nan()
}

/// Intersect the line through `a` and `b` with the first edge flagged in `code`
///
/// Returns `None` when the segment is parallel to that edge, which can only happen for
/// degenerate input and is treated as "outside".
#[inline(always)]
fn edge_intersection(
    rect: &BoundingRectangle,
    a: Point<f64>,
    b: Point<f64>,
    code: Outcode,
) -> Option<Point<f64>> {
    let dx = b.x() - a.x();
    let dy = b.y() - a.y();

    let (edge_y, horizontal_edge) = if code.contains(Outcode::NORTH) {
        (rect.north(), true)
    } else if code.contains(Outcode::SOUTH) {
        (rect.south(), true)
    } else {
        (0.0, false)
    };

    if horizontal_edge {
        if dy == 0.0 {
            return None;
        }
        return Some(Point::new(a.x() + dx * (edge_y - a.y()) / dy, edge_y));
    }

    let edge_x = if code.contains(Outcode::EAST) {
        rect.east()
    } else if code.contains(Outcode::WEST) {
        rect.west()
    } else {
        return None;
    };

    if dx == 0.0 {
        return None;
    }
    Some(Point::new(edge_x, a.y() + dy * (edge_x - a.x()) / dx))
}

/// Clip the segment `p0`-`p1` against `rect`
///
/// Returns the visible part of the segment, or `None` when no part of it is visible.
/// Both endpoints are returned together: a segment is never half clipped. Segments with
/// a non-finite coordinate are rejected, and so is any rectangle with a NaN bound.
///
/// # Example
/// ```
/// use geo::Point;
/// use viewport_clip_lib::{BoundingRectangle, clip_segment};
///
/// let rect = BoundingRectangle::new(-1000.0, 1000.0, -1000.0, 1000.0);
/// let clipped = clip_segment(&rect, Point::new(-2000.0, 0.0), Point::new(2000.0, 0.0));
/// assert_eq!(clipped, Some((Point::new(-1000.0, 0.0), Point::new(1000.0, 0.0))));
/// ```
pub fn clip_segment(
    rect: &BoundingRectangle,
    p0: Point<f64>,
    p1: Point<f64>,
) -> Option<(Point<f64>, Point<f64>)> {
    if rect.is_empty() || has_nan_bound(rect) || !is_finite_point(p0) || !is_finite_point(p1) {
        return None;
    }

    let mut a = p0;
    let mut b = p1;
    let mut code_a = outcode(rect, a);
    let mut code_b = outcode(rect, b);

    for _ in 0..MAX_CLIP_ITERATIONS {
        if (code_a | code_b).is_empty() {
            // accept
            return Some((a, b));
        }
        if code_a.intersects(code_b) {
            // trivial reject
            return None;
        }

        if !code_a.is_empty() {
            a = edge_intersection(rect, a, b, code_a)?;
            code_a = outcode(rect, a);
        } else {
            b = edge_intersection(rect, a, b, code_b)?;
            code_b = outcode(rect, b);
        }
    }

    tracing::trace!(
        "Segment ({}, {})-({}, {}) exceeded clip iteration bound",
        p0.x(),
        p0.y(),
        p1.x(),
        p1.y()
    );
    None
}

/// Check if any part of the segment `p0`-`p1` is inside `rect`
#[inline]
pub fn segment_intersects(rect: &BoundingRectangle, p0: Point<f64>, p1: Point<f64>) -> bool {
    clip_segment(rect, p0, p1).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> BoundingRectangle {
        BoundingRectangle::new(-1000.0, 1000.0, -1000.0, 1000.0)
    }

    fn assert_close(actual: Point<f64>, expected: Point<f64>) {
        assert!(
            (actual.x() - expected.x()).abs() < 1e-9 && (actual.y() - expected.y()).abs() < 1e-9,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_outcode_regions() {
        let rect = window();
        assert_eq!(outcode(&rect, Point::new(0.0, 0.0)), Outcode::empty());
        assert_eq!(outcode(&rect, Point::new(-2000.0, 0.0)), Outcode::WEST);
        assert_eq!(outcode(&rect, Point::new(2000.0, 0.0)), Outcode::EAST);
        assert_eq!(outcode(&rect, Point::new(0.0, -2000.0)), Outcode::SOUTH);
        assert_eq!(
            outcode(&rect, Point::new(2000.0, 2000.0)),
            Outcode::EAST | Outcode::NORTH
        );
    }

    #[test]
    fn test_outcode_boundary_tolerance() {
        let rect = window();
        assert!(outcode(&rect, Point::new(1000.0 + BOUNDARY_TOLERANCE / 2.0, 0.0)).is_empty());
        assert_eq!(
            outcode(&rect, Point::new(1000.0 + BOUNDARY_TOLERANCE * 2.0, 0.0)),
            Outcode::EAST
        );
    }

    #[test]
    fn test_clip_horizontal_through() {
        let clipped = clip_segment(
            &window(),
            Point::new(-2000.0, 0.0),
            Point::new(2000.0, 0.0),
        )
        .unwrap();
        assert_eq!(clipped.0, Point::new(-1000.0, 0.0));
        assert_eq!(clipped.1, Point::new(1000.0, 0.0));
    }

    #[test]
    fn test_clip_diagonal_through() {
        let rect = BoundingRectangle::new(-500.0, 500.0, -500.0, 500.0);
        let (a, b) = clip_segment(
            &rect,
            Point::new(-2000.0, -2000.0),
            Point::new(2000.0, 2000.0),
        )
        .unwrap();
        assert_eq!(a, Point::new(-500.0, -500.0));
        assert_eq!(b, Point::new(500.0, 500.0));
    }

    #[test]
    fn test_clip_inside_is_unchanged() {
        let a = Point::new(-10.0, 20.0);
        let b = Point::new(300.5, -999.0);
        assert_eq!(clip_segment(&window(), a, b), Some((a, b)));
    }

    #[test]
    fn test_clip_one_endpoint_outside() {
        let (a, b) = clip_segment(&window(), Point::new(0.0, 0.0), Point::new(0.0, 5000.0))
            .unwrap();
        assert_eq!(a, Point::new(0.0, 0.0));
        assert_eq!(b, Point::new(0.0, 1000.0));

        let (a, b) = clip_segment(&window(), Point::new(-3000.0, -1000.0), Point::new(0.0, 500.0))
            .unwrap();
        assert_close(a, Point::new(-1000.0, 0.0));
        assert_eq!(b, Point::new(0.0, 500.0));
    }

    #[test]
    fn test_clip_trivial_reject() {
        // Both points west of the rectangle
        assert!(clip_segment(&window(), Point::new(-2000.0, -5.0), Point::new(-1500.0, 5.0)).is_none());
        // Both points north of the rectangle
        assert!(clip_segment(&window(), Point::new(-5000.0, 1001.0), Point::new(5000.0, 3000.0)).is_none());
    }

    #[test]
    fn test_clip_misses_corner() {
        // Crosses the west and north outside regions without entering the rectangle
        let result = clip_segment(&window(), Point::new(-2000.0, 500.0), Point::new(-500.0, 2000.0));
        assert!(result.is_none());
        assert!(!segment_intersects(&window(), Point::new(-2000.0, 500.0), Point::new(-500.0, 2000.0)));
    }

    #[test]
    fn test_clip_touches_corner() {
        let (a, b) = clip_segment(&window(), Point::new(-2000.0, 0.0), Point::new(0.0, 2000.0))
            .unwrap();
        assert_close(a, Point::new(-1000.0, 1000.0));
        assert_close(b, Point::new(-1000.0, 1000.0));
    }

    #[test]
    fn test_clip_rejects_invalid_input() {
        let rect = window();
        assert!(clip_segment(&rect, Point::new(f64::NAN, 0.0), Point::new(0.0, 0.0)).is_none());
        assert!(clip_segment(&rect, Point::new(0.0, 0.0), Point::new(0.0, f64::NAN)).is_none());
        assert!(clip_segment(&rect, Point::new(f64::INFINITY, 0.0), Point::new(0.0, 0.0)).is_none());
        assert!(
            clip_segment(&BoundingRectangle::empty(), Point::new(0.0, 0.0), Point::new(1.0, 1.0))
                .is_none()
        );
        let nan_rect = BoundingRectangle::new(f64::NAN, 10.0, 0.0, 10.0);
        assert!(clip_segment(&nan_rect, Point::new(1.0, 1.0), Point::new(2.0, 2.0)).is_none());
    }

    #[test]
    fn test_clip_coincident_endpoints() {
        let inside = Point::new(1.0, 2.0);
        assert_eq!(clip_segment(&window(), inside, inside), Some((inside, inside)));

        let outside = Point::new(5000.0, 2.0);
        assert!(clip_segment(&window(), outside, outside).is_none());
    }

    #[test]
    fn test_clip_degenerate_rectangle() {
        // Zero-width rectangle: a vertical line at x = 0
        let line = BoundingRectangle::new(0.0, 0.0, -10.0, 10.0);
        let (a, b) = clip_segment(&line, Point::new(-5.0, 0.0), Point::new(5.0, 0.0)).unwrap();
        assert_eq!(a, Point::new(0.0, 0.0));
        assert_eq!(b, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_clipped_points_stay_inside() {
        let rect = BoundingRectangle::new(-300.0, 700.0, -50.0, 250.0);
        let expanded = rect.expand(BOUNDARY_TOLERANCE, BOUNDARY_TOLERANCE);
        let mut state: u64 = 42;
        let mut next = || {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            ((state >> 33) % 4000) as f64 - 2000.0
        };

        let mut accepted = 0;
        for _ in 0..500 {
            let a = Point::new(next(), next());
            let b = Point::new(next(), next());
            if let Some((ca, cb)) = clip_segment(&rect, a, b) {
                accepted += 1;
                assert!(expanded.contains_point(ca), "{:?} outside {:?}", ca, rect);
                assert!(expanded.contains_point(cb), "{:?} outside {:?}", cb, rect);
            }
        }
        assert!(accepted > 0);
    }
}
