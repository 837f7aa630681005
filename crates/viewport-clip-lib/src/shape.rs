//! Per-shape update state machine
//!
//! A [`Shape`] owns its domain points and knows how to bring its drawable geometry up
//! to date for a viewport. How much work an update does depends on the [`UpdateTrigger`]
//! and on what changed since the last build.

use crate::reduce::{Piece, PolylineReducer};
use crate::transform::ViewTransform;
use crate::{BoundingRectangle, SurfaceSize, ViewportContext};
use geo::Point;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Stroke thickness in device pixels used when none is given
pub const DEFAULT_STROKE_THICKNESS: f64 = 1.0;

/// Geometry strategy, fixed when the shape is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Open line, split into one piece per visible run
    Polyline,
    /// Closed filled ring, culled but never split
    Polygon,
}

/// Why an update was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateTrigger {
    /// Full refresh: always re-transform and re-clip
    Refresh,
    /// Viewport translated: re-clip, re-transform only if points or transform changed
    Pan,
    /// A pan or zoom gesture completed: always re-transform and re-clip
    EndTransition,
    /// Nothing visible changed: skipped unless the viewport differs from the last build
    NoOp,
}

impl UpdateTrigger {
    /// Minimum amount of work this trigger asks for
    #[inline]
    pub fn required_state(self) -> UpdateState {
        match self {
            UpdateTrigger::Refresh | UpdateTrigger::EndTransition => {
                UpdateState::NeedsTransformAndClip
            }
            UpdateTrigger::Pan => UpdateState::NeedsClip,
            UpdateTrigger::NoOp => UpdateState::Clean,
        }
    }

    /// Forcing triggers bypass lazy skipping
    #[inline]
    pub fn is_forcing(self) -> bool {
        matches!(self, UpdateTrigger::Refresh | UpdateTrigger::EndTransition)
    }
}

/// Pending work of a shape, ordered by cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateState {
    Clean,
    NeedsClip,
    NeedsTransformAndClip,
}

/// Work actually done by one update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOutcome {
    Skipped,
    Reclipped,
    Rebuilt,
}

/// Receiver of drawable geometry, typically the rendering surface
pub trait GeometrySink {
    fn add_polyline(&mut self, points: &[Point<f64>]);

    fn add_polygon(&mut self, ring: &[Point<f64>]);

    /// Called once after new geometry was produced, so the surface can redraw
    fn invalidate(&mut self) {}
}

/// Drawable output of a shape in view space
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeGeometry {
    kind: ShapeKind,
    pieces: SmallVec<[Piece; 1]>,
}

impl ShapeGeometry {
    fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            pieces: SmallVec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Visible pieces; a polygon has at most one (its reduced ring)
    #[inline]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.pieces.iter().map(Vec::len).sum()
    }

    pub fn bounding_rect(&self) -> BoundingRectangle {
        self.pieces
            .iter()
            .fold(BoundingRectangle::empty(), |acc, piece| {
                acc | BoundingRectangle::from_points(piece.iter().copied())
            })
    }

    /// Hand every piece to `sink`
    pub fn emit<S: GeometrySink + ?Sized>(&self, sink: &mut S) {
        for piece in &self.pieces {
            match self.kind {
                ShapeKind::Polyline => sink.add_polyline(piece),
                ShapeKind::Polygon => sink.add_polygon(piece),
            }
        }
    }
}

/// Inputs of the last clip, compared to decide whether lazy updates may skip
#[derive(Debug, Clone, Copy, PartialEq)]
struct BuildKey {
    window: BoundingRectangle,
    surface: SurfaceSize,
    scale: f64,
    pixel_tolerance: f64,
}

/// A polyline or polygon with its cached view-space geometry
#[derive(Clone)]
pub struct Shape {
    kind: ShapeKind,
    points: Vec<Point<f64>>,
    transform: Arc<dyn ViewTransform>,
    stroke_thickness: f64,
    /// Domain points after the transform, reused by clip-only updates
    view_points: Vec<Point<f64>>,
    geometry: ShapeGeometry,
    /// Scratch output of the reducer
    scratch: Vec<Piece>,
    state: UpdateState,
    last_key: Option<BuildKey>,
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("kind", &self.kind)
            .field("points", &self.points.len())
            .field("stroke_thickness", &self.stroke_thickness)
            .field("state", &self.state)
            .field("pieces", &self.geometry.pieces.len())
            .finish_non_exhaustive()
    }
}

fn sanitize_thickness(thickness: f64) -> f64 {
    if thickness.is_finite() {
        thickness.max(0.0)
    } else {
        0.0
    }
}

fn warn_invalid_points(points: &[Point<f64>]) {
    let invalid = points
        .iter()
        .filter(|p| !(p.x().is_finite() && p.y().is_finite()))
        .count();
    if invalid > 0 {
        tracing::warn!(
            "Shape has {} non-finite points out of {}, they will not be drawn",
            invalid,
            points.len()
        );
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Shape {
    /// Create a shape that still needs a full build
    pub fn new(kind: ShapeKind, points: Vec<Point<f64>>, transform: Arc<dyn ViewTransform>) -> Self {
        warn_invalid_points(&points);
        Self {
            kind,
            points,
            transform,
            stroke_thickness: DEFAULT_STROKE_THICKNESS,
            view_points: Vec::new(),
            geometry: ShapeGeometry::new(kind),
            scratch: Vec::new(),
            state: UpdateState::NeedsTransformAndClip,
            last_key: None,
        }
    }

    pub fn polyline(points: Vec<Point<f64>>, transform: Arc<dyn ViewTransform>) -> Self {
        Self::new(ShapeKind::Polyline, points, transform)
    }

    pub fn polygon(points: Vec<Point<f64>>, transform: Arc<dyn ViewTransform>) -> Self {
        Self::new(ShapeKind::Polygon, points, transform)
    }

    /// Set the stroke thickness in device pixels
    pub fn with_stroke_thickness(mut self, thickness: f64) -> Self {
        self.stroke_thickness = sanitize_thickness(thickness);
        self
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    #[inline]
    pub fn points(&self) -> &[Point<f64>] {
        &self.points
    }

    #[inline]
    pub fn stroke_thickness(&self) -> f64 {
        self.stroke_thickness
    }

    #[inline]
    pub fn state(&self) -> UpdateState {
        self.state
    }

    #[inline]
    pub fn geometry(&self) -> &ShapeGeometry {
        &self.geometry
    }

    /// Points in view space as of the last transform
    #[inline]
    pub fn view_points(&self) -> &[Point<f64>] {
        &self.view_points
    }

    fn require(&mut self, state: UpdateState) {
        self.state = self.state.max(state);
    }

    pub fn set_points(&mut self, points: Vec<Point<f64>>) {
        warn_invalid_points(&points);
        self.points = points;
        self.require(UpdateState::NeedsTransformAndClip);
    }

    pub fn set_transform(&mut self, transform: Arc<dyn ViewTransform>) {
        self.transform = transform;
        self.require(UpdateState::NeedsTransformAndClip);
    }

    pub fn set_stroke_thickness(&mut self, thickness: f64) {
        self.stroke_thickness = sanitize_thickness(thickness);
        self.require(UpdateState::NeedsClip);
    }

    /// Bring the geometry up to date for `ctx`
    ///
    /// With `lazy` set, an update that is neither forced by its trigger nor needed by a
    /// change of points, transform or viewport is skipped. Skipping never changes the
    /// geometry compared to running the full path.
    pub fn update(
        &mut self,
        ctx: &ViewportContext,
        trigger: UpdateTrigger,
        reducer: &PolylineReducer,
        lazy: bool,
    ) -> UpdateOutcome {
        self.require(trigger.required_state());

        let key = BuildKey {
            window: ctx.acceptance_window(self.stroke_thickness),
            surface: ctx.surface(),
            scale: ctx.scale(),
            pixel_tolerance: reducer.pixel_tolerance(),
        };
        let key_unchanged = self.last_key == Some(key);

        if lazy && !trigger.is_forcing() && self.state <= UpdateState::NeedsClip && key_unchanged {
            self.state = UpdateState::Clean;
            return UpdateOutcome::Skipped;
        }
        if self.state == UpdateState::Clean {
            self.state = UpdateState::NeedsClip;
        }

        let outcome = if self.state == UpdateState::NeedsTransformAndClip {
            self.transform_points();
            UpdateOutcome::Rebuilt
        } else {
            UpdateOutcome::Reclipped
        };
        self.clip(&key, reducer);

        self.last_key = Some(key);
        self.state = UpdateState::Clean;

        tracing::trace!(
            "Shape {:?} {:?}: {} points in {} pieces",
            self.kind,
            outcome,
            self.geometry.point_count(),
            self.geometry.pieces.len()
        );
        outcome
    }

    fn transform_points(&mut self) {
        let transform = &self.transform;
        self.view_points.clear();
        self.view_points
            .extend(self.points.iter().map(|&point| transform.to_view(point)));
    }

    fn clip(&mut self, key: &BuildKey, reducer: &PolylineReducer) {
        match self.kind {
            ShapeKind::Polyline => {
                self.geometry.pieces.clear();
                reducer.reduce_into(&self.view_points, &key.window, key.surface, &mut self.scratch);
                self.geometry.pieces.extend(self.scratch.drain(..));
            }
            ShapeKind::Polygon => {
                // Reuse the previous ring, or the spare one kept while the polygon was hidden
                let mut ring = self
                    .geometry
                    .pieces
                    .pop()
                    .or_else(|| self.scratch.pop())
                    .unwrap_or_default();
                self.geometry.pieces.clear();
                reducer.reduce_polygon_into(&self.view_points, &key.window, key.surface, &mut ring);
                if ring.is_empty() {
                    self.scratch.push(ring);
                } else {
                    self.geometry.pieces.push(ring);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityTransform;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        polylines: Vec<Vec<Point<f64>>>,
        polygons: Vec<Vec<Point<f64>>>,
        invalidations: usize,
    }

    impl GeometrySink for RecordingSink {
        fn add_polyline(&mut self, points: &[Point<f64>]) {
            self.polylines.push(points.to_vec());
        }

        fn add_polygon(&mut self, ring: &[Point<f64>]) {
            self.polygons.push(ring.to_vec());
        }

        fn invalidate(&mut self) {
            self.invalidations += 1;
        }
    }

    fn context(west: f64, south: f64) -> ViewportContext {
        ViewportContext::new(
            BoundingRectangle::new(west, west + 100.0, south, south + 100.0),
            SurfaceSize::new(100.0, 100.0),
            1.0,
        )
        .unwrap()
    }

    fn line() -> Vec<Point<f64>> {
        (0..=40).map(|i| Point::new(i as f64 * 10.0 - 200.0, 50.0)).collect()
    }

    fn counting_transform(counter: Arc<AtomicUsize>) -> Arc<dyn ViewTransform> {
        Arc::new(move |p: Point<f64>| {
            counter.fetch_add(1, Ordering::Relaxed);
            p
        })
    }

    #[test]
    fn test_trigger_requirements() {
        assert_eq!(
            UpdateTrigger::Refresh.required_state(),
            UpdateState::NeedsTransformAndClip
        );
        assert_eq!(UpdateTrigger::Pan.required_state(), UpdateState::NeedsClip);
        assert_eq!(UpdateTrigger::NoOp.required_state(), UpdateState::Clean);
        assert!(UpdateTrigger::EndTransition.is_forcing());
        assert!(!UpdateTrigger::Pan.is_forcing());
        assert!(UpdateState::Clean < UpdateState::NeedsClip);
        assert!(UpdateState::NeedsClip < UpdateState::NeedsTransformAndClip);
    }

    #[test]
    fn test_first_update_builds() {
        let reducer = PolylineReducer::default();
        let mut shape = Shape::polyline(line(), Arc::new(IdentityTransform));
        assert_eq!(shape.state(), UpdateState::NeedsTransformAndClip);

        let outcome = shape.update(&context(0.0, 0.0), UpdateTrigger::NoOp, &reducer, true);
        assert_eq!(outcome, UpdateOutcome::Rebuilt);
        assert_eq!(shape.state(), UpdateState::Clean);

        let pieces = shape.geometry().pieces();
        assert_eq!(pieces.len(), 1);
        // Half a pixel of stroke margin on each side
        assert_eq!(pieces[0][0], Point::new(-0.5, 50.0));
        assert_eq!(pieces[0][pieces[0].len() - 1], Point::new(100.5, 50.0));
    }

    #[test]
    fn test_forcing_triggers_always_rebuild() {
        let reducer = PolylineReducer::default();
        let ctx = context(0.0, 0.0);
        let mut shape = Shape::polyline(line(), Arc::new(IdentityTransform));
        shape.update(&ctx, UpdateTrigger::Refresh, &reducer, true);

        assert_eq!(
            shape.update(&ctx, UpdateTrigger::Refresh, &reducer, true),
            UpdateOutcome::Rebuilt
        );
        assert_eq!(
            shape.update(&ctx, UpdateTrigger::EndTransition, &reducer, true),
            UpdateOutcome::Rebuilt
        );
    }

    #[test]
    fn test_lazy_skip_when_nothing_changed() {
        let reducer = PolylineReducer::default();
        let ctx = context(0.0, 0.0);
        let mut shape = Shape::polyline(line(), Arc::new(IdentityTransform));
        shape.update(&ctx, UpdateTrigger::Refresh, &reducer, true);
        let before = shape.geometry().clone();

        assert_eq!(
            shape.update(&ctx, UpdateTrigger::NoOp, &reducer, true),
            UpdateOutcome::Skipped
        );
        assert_eq!(
            shape.update(&ctx, UpdateTrigger::Pan, &reducer, true),
            UpdateOutcome::Skipped
        );
        assert_eq!(shape.geometry(), &before);

        // Without lazy updates the work is redone, with the same result
        assert_eq!(
            shape.update(&ctx, UpdateTrigger::NoOp, &reducer, false),
            UpdateOutcome::Reclipped
        );
        assert_eq!(shape.geometry(), &before);
    }

    #[test]
    fn test_pan_reclips_without_transforming() {
        let reducer = PolylineReducer::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut shape = Shape::polyline(line(), counting_transform(counter.clone()));

        shape.update(&context(0.0, 0.0), UpdateTrigger::Refresh, &reducer, true);
        let transformed = counter.load(Ordering::Relaxed);
        assert_eq!(transformed, line().len());

        let outcome = shape.update(&context(50.0, 0.0), UpdateTrigger::Pan, &reducer, true);
        assert_eq!(outcome, UpdateOutcome::Reclipped);
        assert_eq!(counter.load(Ordering::Relaxed), transformed);

        let pieces = shape.geometry().pieces();
        assert_eq!(pieces[0][0], Point::new(49.5, 50.0));
        assert_eq!(pieces[0][pieces[0].len() - 1], Point::new(150.5, 50.0));
    }

    #[test]
    fn test_noop_with_moved_viewport_reclips() {
        let reducer = PolylineReducer::default();
        let mut shape = Shape::polyline(line(), Arc::new(IdentityTransform));
        shape.update(&context(0.0, 0.0), UpdateTrigger::Refresh, &reducer, true);
        assert_eq!(
            shape.update(&context(10.0, 0.0), UpdateTrigger::NoOp, &reducer, true),
            UpdateOutcome::Reclipped
        );
        // A different tolerance is also a different build
        assert_eq!(
            shape.update(&context(10.0, 0.0), UpdateTrigger::NoOp, &PolylineReducer::new(3.0), true),
            UpdateOutcome::Reclipped
        );
    }

    #[test]
    fn test_set_points_forces_rebuild() {
        let reducer = PolylineReducer::default();
        let ctx = context(0.0, 0.0);
        let mut shape = Shape::polyline(line(), Arc::new(IdentityTransform));
        shape.update(&ctx, UpdateTrigger::Refresh, &reducer, true);

        shape.set_points(vec![Point::new(10.0, 10.0), Point::new(20.0, 20.0)]);
        assert_eq!(shape.state(), UpdateState::NeedsTransformAndClip);
        assert_eq!(
            shape.update(&ctx, UpdateTrigger::Pan, &reducer, true),
            UpdateOutcome::Rebuilt
        );
        assert_eq!(
            shape.geometry().pieces(),
            &[vec![Point::new(10.0, 10.0), Point::new(20.0, 20.0)]]
        );

        shape.set_transform(Arc::new(|p: Point<f64>| Point::new(p.x() + 1.0, p.y())));
        assert_eq!(
            shape.update(&ctx, UpdateTrigger::NoOp, &reducer, true),
            UpdateOutcome::Rebuilt
        );
        assert_eq!(shape.geometry().pieces()[0][0], Point::new(11.0, 10.0));
    }

    #[test]
    fn test_stroke_thickness_widens_window() {
        let reducer = PolylineReducer::default();
        let ctx = context(0.0, 0.0);
        // Vertical line 3 units east of the visible extent
        let points = vec![Point::new(103.0, 0.0), Point::new(103.0, 100.0)];
        let mut shape = Shape::polyline(points, Arc::new(IdentityTransform));

        shape.update(&ctx, UpdateTrigger::Refresh, &reducer, true);
        assert!(shape.geometry().is_empty());

        shape.set_stroke_thickness(10.0);
        assert_eq!(shape.state(), UpdateState::NeedsClip);
        assert_eq!(
            shape.update(&ctx, UpdateTrigger::NoOp, &reducer, true),
            UpdateOutcome::Reclipped
        );
        assert_eq!(shape.geometry().pieces().len(), 1);
    }

    #[test]
    fn test_lazy_matches_full_path() {
        let reducer = PolylineReducer::default();
        let mut lazy = Shape::polyline(line(), Arc::new(IdentityTransform));
        let mut eager = Shape::polyline(line(), Arc::new(IdentityTransform));

        let frames = [
            (context(0.0, 0.0), UpdateTrigger::Refresh),
            (context(0.0, 0.0), UpdateTrigger::NoOp),
            (context(30.0, 0.0), UpdateTrigger::Pan),
            (context(30.0, 0.0), UpdateTrigger::Pan),
            (context(-300.0, 0.0), UpdateTrigger::Pan),
            (context(-300.0, 0.0), UpdateTrigger::EndTransition),
            (context(0.0, 20.0), UpdateTrigger::NoOp),
        ];
        for (ctx, trigger) in frames {
            lazy.update(&ctx, trigger, &reducer, true);
            eager.update(&ctx, trigger, &reducer, false);
            assert_eq!(lazy.geometry(), eager.geometry());
        }
    }

    #[test]
    fn test_non_finite_transform_output_is_excluded() {
        let reducer = PolylineReducer::default();
        let transform: Arc<dyn ViewTransform> = Arc::new(|p: Point<f64>| {
            if p.x() == 0.0 { Point::new(f64::NAN, p.y()) } else { p }
        });
        let points = vec![
            Point::new(-20.0, 50.0),
            Point::new(10.0, 50.0),
            Point::new(0.0, 50.0),
            Point::new(20.0, 50.0),
            Point::new(30.0, 50.0),
        ];
        let mut shape = Shape::polyline(points, transform);
        shape.update(&context(0.0, 0.0), UpdateTrigger::Refresh, &reducer, true);

        assert_eq!(shape.view_points().len(), 5);
        assert_eq!(
            shape.geometry().pieces(),
            &[
                vec![Point::new(-0.5, 50.0), Point::new(10.0, 50.0)],
                vec![Point::new(20.0, 50.0), Point::new(30.0, 50.0)],
            ]
        );
    }

    #[test]
    fn test_polygon_reclip_reuses_ring_buffer() {
        let reducer = PolylineReducer::default();
        let ring = vec![
            Point::new(10.0, 10.0),
            Point::new(90.0, 10.0),
            Point::new(50.0, 90.0),
        ];
        let mut polygon = Shape::polygon(ring.clone(), Arc::new(IdentityTransform));
        polygon.update(&context(0.0, 0.0), UpdateTrigger::Refresh, &reducer, true);
        let buffer = polygon.geometry().pieces()[0].as_ptr();

        polygon.update(&context(5.0, 0.0), UpdateTrigger::Pan, &reducer, true);
        assert_eq!(polygon.geometry().pieces()[0].as_ptr(), buffer);

        // Hidden then visible again: the spare ring comes back
        polygon.update(&context(5000.0, 0.0), UpdateTrigger::Pan, &reducer, true);
        assert!(polygon.geometry().is_empty());
        polygon.update(&context(0.0, 0.0), UpdateTrigger::Pan, &reducer, true);
        assert_eq!(polygon.geometry().pieces(), &[ring]);
        assert_eq!(polygon.geometry().pieces()[0].as_ptr(), buffer);
    }

    #[test]
    fn test_emit_by_kind() {
        let reducer = PolylineReducer::default();
        let ctx = context(0.0, 0.0);
        let ring = vec![
            Point::new(10.0, 10.0),
            Point::new(90.0, 10.0),
            Point::new(50.0, 90.0),
        ];
        let mut polygon = Shape::polygon(ring.clone(), Arc::new(IdentityTransform));
        let mut polyline = Shape::polyline(line(), Arc::new(IdentityTransform));
        polygon.update(&ctx, UpdateTrigger::Refresh, &reducer, true);
        polyline.update(&ctx, UpdateTrigger::Refresh, &reducer, true);

        let mut sink = RecordingSink::default();
        polygon.geometry().emit(&mut sink);
        polyline.geometry().emit(&mut sink);

        assert_eq!(sink.polygons, vec![ring]);
        assert_eq!(sink.polylines.len(), 1);
        assert_eq!(sink.invalidations, 0);
        assert_eq!(polygon.geometry().kind(), ShapeKind::Polygon);
        assert_eq!(polygon.geometry().point_count(), 3);
        assert_eq!(
            polygon.geometry().bounding_rect(),
            BoundingRectangle::new(10.0, 90.0, 10.0, 90.0)
        );
    }
}
