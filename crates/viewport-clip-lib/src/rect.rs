//! Axis-aligned bounding rectangle with an explicit empty state
//!
//! The empty rectangle is encoded with sentinel bounds (`west = south = +inf`,
//! `east = north = -inf`) so that plain floating-point min/max arithmetic composes
//! correctly through every operator without a separate flag.

use geo::{Coord, Point, Rect};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle described by its four bounds
///
/// `west`/`east` bound the horizontal axis and `south`/`north` the vertical axis.
/// A rectangle is empty when `west > east` or `south > north`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingRectangle {
    west: f64,
    east: f64,
    south: f64,
    north: f64,
}

#[inline(always)]
fn is_valid_point(point: Point<f64>) -> bool {
    !point.x().is_nan() && !point.y().is_nan()
}

impl Default for BoundingRectangle {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingRectangle {
    /// The empty rectangle (no content yet)
    #[inline]
    pub const fn empty() -> Self {
        Self {
            west: f64::INFINITY,
            east: f64::NEG_INFINITY,
            south: f64::INFINITY,
            north: f64::NEG_INFINITY,
        }
    }

    /// Create a rectangle from four bounds that are assumed to be ordered already
    #[inline]
    pub const fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self {
            west,
            east,
            south,
            north,
        }
    }

    /// Degenerate rectangle with zero extent at `point`
    #[inline]
    pub fn from_point(point: Point<f64>) -> Self {
        Self::new(point.x(), point.x(), point.y(), point.y())
    }

    /// Rectangle spanned by two opposite corners, in any order
    pub fn from_corners(a: Point<f64>, b: Point<f64>) -> Self {
        Self::new(
            a.x().min(b.x()),
            a.x().max(b.x()),
            a.y().min(b.y()),
            a.y().max(b.y()),
        )
    }

    /// Bounding rectangle of all points; points with a NaN coordinate are ignored
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Point<f64>>,
    {
        points
            .into_iter()
            .fold(Self::empty(), |rect, point| rect.union_point(point))
    }

    /// Rectangle of the given size centered on `center`
    pub fn from_center_size(center: Point<f64>, width: f64, height: f64) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        Self::new(
            center.x() - half_width,
            center.x() + half_width,
            center.y() - half_height,
            center.y() + half_height,
        )
    }

    #[inline]
    pub fn west(&self) -> f64 {
        self.west
    }

    #[inline]
    pub fn east(&self) -> f64 {
        self.east
    }

    #[inline]
    pub fn south(&self) -> f64 {
        self.south
    }

    #[inline]
    pub fn north(&self) -> f64 {
        self.north
    }

    /// Set the west bound; does not repair emptiness
    #[inline]
    pub fn set_west(&mut self, west: f64) {
        self.west = west;
    }

    /// Set the east bound; does not repair emptiness
    #[inline]
    pub fn set_east(&mut self, east: f64) {
        self.east = east;
    }

    /// Set the south bound; does not repair emptiness
    #[inline]
    pub fn set_south(&mut self, south: f64) {
        self.south = south;
    }

    /// Set the north bound; does not repair emptiness
    #[inline]
    pub fn set_north(&mut self, north: f64) {
        self.north = north;
    }

    /// Check whether the rectangle has no content
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.west > self.east || self.south > self.north
    }

    /// `east - west` (`-inf` for the empty rectangle)
    #[inline]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// `north - south` (`-inf` for the empty rectangle)
    #[inline]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center point (`(NaN, NaN)` for the empty rectangle)
    #[inline]
    pub fn center(&self) -> Point<f64> {
        Point::new(
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        )
    }

    /// Resize horizontally keeping the center fixed; no-op on an empty rectangle
    pub fn set_width(&mut self, width: f64) {
        if self.is_empty() {
            return;
        }
        let delta = (width - self.width()) / 2.0;
        self.west -= delta;
        self.east += delta;
    }

    /// Resize vertically keeping the center fixed; no-op on an empty rectangle
    pub fn set_height(&mut self, height: f64) {
        if self.is_empty() {
            return;
        }
        let delta = (height - self.height()) / 2.0;
        self.south -= delta;
        self.north += delta;
    }

    /// Move the rectangle so that its center is `center`; no-op on an empty rectangle
    pub fn set_center(&mut self, center: Point<f64>) {
        let current = self.center();
        *self = self.translate(center.x() - current.x(), center.y() - current.y());
    }

    #[inline]
    pub fn south_west(&self) -> Point<f64> {
        Point::new(self.west, self.south)
    }

    #[inline]
    pub fn south_east(&self) -> Point<f64> {
        Point::new(self.east, self.south)
    }

    #[inline]
    pub fn north_west(&self) -> Point<f64> {
        Point::new(self.west, self.north)
    }

    #[inline]
    pub fn north_east(&self) -> Point<f64> {
        Point::new(self.east, self.north)
    }

    /// Inclusive point containment; false for an empty rectangle or a NaN coordinate
    #[inline]
    pub fn contains_point(&self, point: Point<f64>) -> bool {
        if self.is_empty() || !is_valid_point(point) {
            return false;
        }
        point.x() >= self.west
            && point.x() <= self.east
            && point.y() >= self.south
            && point.y() <= self.north
    }

    /// Check whether `other` lies entirely inside this rectangle
    pub fn contains_rect(&self, other: &BoundingRectangle) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        other.west >= self.west
            && other.east <= self.east
            && other.south >= self.south
            && other.north <= self.north
    }

    /// Check for overlap on both axes (touching edges count)
    pub fn intersects(&self, other: &BoundingRectangle) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        other.west <= self.east
            && other.east >= self.west
            && other.south <= self.north
            && other.north >= self.south
    }

    /// Tightest common rectangle, or empty when there is no overlap
    pub fn intersection(&self, other: &BoundingRectangle) -> BoundingRectangle {
        if !self.intersects(other) {
            return Self::empty();
        }
        Self::new(
            self.west.max(other.west),
            self.east.min(other.east),
            self.south.max(other.south),
            self.north.min(other.north),
        )
    }

    /// Smallest rectangle covering both; the empty rectangle is the identity
    pub fn union(&self, other: &BoundingRectangle) -> BoundingRectangle {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::new(
            self.west.min(other.west),
            self.east.max(other.east),
            self.south.min(other.south),
            self.north.max(other.north),
        )
    }

    /// Smallest rectangle covering this one and `point`; NaN points are ignored
    pub fn union_point(&self, point: Point<f64>) -> BoundingRectangle {
        if !is_valid_point(point) {
            return *self;
        }
        if self.is_empty() {
            return Self::from_point(point);
        }
        Self::new(
            self.west.min(point.x()),
            self.east.max(point.x()),
            self.south.min(point.y()),
            self.north.max(point.y()),
        )
    }

    /// Shift by `(dx, dy)`; the empty rectangle stays empty
    pub fn translate(&self, dx: f64, dy: f64) -> BoundingRectangle {
        if self.is_empty() {
            return *self;
        }
        Self::new(
            self.west + dx,
            self.east + dx,
            self.south + dy,
            self.north + dy,
        )
    }

    #[inline]
    pub fn translate_horizontally(&self, dx: f64) -> BoundingRectangle {
        self.translate(dx, 0.0)
    }

    #[inline]
    pub fn translate_vertically(&self, dy: f64) -> BoundingRectangle {
        self.translate(0.0, dy)
    }

    /// Scale width and height about the center (2.0 doubles the size)
    pub fn inflate(&self, factor_x: f64, factor_y: f64) -> BoundingRectangle {
        if self.is_empty() {
            return *self;
        }
        // A factor of 1.0 leaves the bounds bit-identical
        let dx = self.width() * (factor_x - 1.0) / 2.0;
        let dy = self.height() * (factor_y - 1.0) / 2.0;
        self.expand(dx, dy)
    }

    #[inline]
    pub fn inflate_uniform(&self, factor: f64) -> BoundingRectangle {
        self.inflate(factor, factor)
    }

    /// Grow each side by a fixed margin (`dx` on west and east, `dy` on south and north)
    pub fn expand(&self, dx: f64, dy: f64) -> BoundingRectangle {
        if self.is_empty() {
            return *self;
        }
        Self::new(
            self.west - dx,
            self.east + dx,
            self.south - dy,
            self.north + dy,
        )
    }

    /// Convert to a `geo::Rect`, or `None` for the empty rectangle
    pub fn to_rect(&self) -> Option<Rect<f64>> {
        if self.is_empty() {
            return None;
        }
        Some(Rect::new(
            Coord {
                x: self.west,
                y: self.south,
            },
            Coord {
                x: self.east,
                y: self.north,
            },
        ))
    }
}

impl From<Rect<f64>> for BoundingRectangle {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.max().x, rect.min().y, rect.max().y)
    }
}

impl BitAnd for BoundingRectangle {
    type Output = BoundingRectangle;

    fn bitand(self, rhs: BoundingRectangle) -> Self::Output {
        self.intersection(&rhs)
    }
}

impl BitAndAssign for BoundingRectangle {
    fn bitand_assign(&mut self, rhs: BoundingRectangle) {
        *self = self.intersection(&rhs);
    }
}

impl BitOr for BoundingRectangle {
    type Output = BoundingRectangle;

    fn bitor(self, rhs: BoundingRectangle) -> Self::Output {
        self.union(&rhs)
    }
}

impl BitOr<Point<f64>> for BoundingRectangle {
    type Output = BoundingRectangle;

    fn bitor(self, rhs: Point<f64>) -> Self::Output {
        self.union_point(rhs)
    }
}

impl BitOrAssign for BoundingRectangle {
    fn bitor_assign(&mut self, rhs: BoundingRectangle) {
        *self = self.union(&rhs);
    }
}

impl BitOrAssign<Point<f64>> for BoundingRectangle {
    fn bitor_assign(&mut self, rhs: Point<f64>) {
        *self = self.union_point(rhs);
    }
}
