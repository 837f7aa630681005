//! ShapeRenderPipeline - owner of all shapes and per-frame driver
//!
//! The pipeline keeps every shape together with its cached geometry and updates them
//! for each new viewport, in parallel once there are enough shapes to make it pay off.

use crate::{
    ClipError, GeometrySink, PolylineReducer, Result, Shape, ShapeGeometry, UpdateOutcome,
    UpdateTrigger, ViewportContext,
};
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the render pipeline
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Points closer than this many device pixels to the previously kept point are
    /// dropped (default 1.0). Zero keeps every distinct point.
    pub pixel_tolerance: f64,
    /// Skip shapes whose inputs did not change since their last build (default true)
    pub lazy_updates: bool,
    /// Minimum number of shapes before updates run in parallel (default 64)
    pub parallel_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pixel_tolerance: 1.0,
            lazy_updates: true,
            parallel_threshold: 64,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.pixel_tolerance.is_finite() || self.pixel_tolerance < 0.0 {
            return Err(ClipError::InvalidConfig(format!(
                "pixel_tolerance must be finite and non-negative, got {}",
                self.pixel_tolerance
            )));
        }
        if self.parallel_threshold == 0 {
            return Err(ClipError::InvalidConfig(
                "parallel_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Stable handle of a shape inside a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeId(usize);

impl ShapeId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Summary of one pipeline update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateStats {
    pub skipped: usize,
    pub reclipped: usize,
    pub rebuilt: usize,
    /// Drawable pieces across all shapes after the update
    pub pieces: usize,
    /// Drawable points across all shapes after the update
    pub points: usize,
}

impl UpdateStats {
    fn of_shape(outcome: UpdateOutcome, geometry: &ShapeGeometry) -> Self {
        let mut stats = Self {
            pieces: geometry.pieces().len(),
            points: geometry.point_count(),
            ..Self::default()
        };
        match outcome {
            UpdateOutcome::Skipped => stats.skipped = 1,
            UpdateOutcome::Reclipped => stats.reclipped = 1,
            UpdateOutcome::Rebuilt => stats.rebuilt = 1,
        }
        stats
    }

    fn merge(self, other: Self) -> Self {
        Self {
            skipped: self.skipped + other.skipped,
            reclipped: self.reclipped + other.reclipped,
            rebuilt: self.rebuilt + other.rebuilt,
            pieces: self.pieces + other.pieces,
            points: self.points + other.points,
        }
    }

    /// Whether any shape produced new geometry
    #[inline]
    pub fn changed(&self) -> bool {
        self.reclipped + self.rebuilt > 0
    }

    /// Number of shapes visited
    #[inline]
    pub fn shapes(&self) -> usize {
        self.skipped + self.reclipped + self.rebuilt
    }
}

/// Top-level manager for all shapes of a map layer
#[derive(Debug, Clone)]
pub struct ShapeRenderPipeline {
    /// Shapes ordered by id
    shapes: Vec<(ShapeId, Shape)>,
    next_id: usize,
    config: Config,
    reducer: PolylineReducer,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ShapeRenderPipeline {
    /// Create an empty pipeline, rejecting invalid configurations
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let reducer = PolylineReducer::from_config(&config);
        Ok(Self {
            shapes: Vec::new(),
            next_id: 0,
            config,
            reducer,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn reducer(&self) -> &PolylineReducer {
        &self.reducer
    }

    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.shapes.push((id, shape));
        id
    }

    fn position(&self, id: ShapeId) -> Option<usize> {
        self.shapes.binary_search_by_key(&id, |(sid, _)| *sid).ok()
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.position(id).map(|index| &self.shapes[index].1)
    }

    /// Mutable access, used to change points, transform or stroke thickness
    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        let index = self.position(id)?;
        Some(&mut self.shapes[index].1)
    }

    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.position(id)?;
        Some(self.shapes.remove(index).1)
    }

    /// Iterate over shapes in insertion order
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.shapes.iter().map(|(id, shape)| (*id, shape))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Update every shape for `ctx`
    pub fn update(&mut self, ctx: &ViewportContext, trigger: UpdateTrigger) -> UpdateStats {
        let lazy = self.config.lazy_updates;
        self.update_with(ctx, trigger, |_, _| lazy)
    }

    /// Update every shape for `ctx`, asking `may_skip` whether each shape may take the lazy path
    ///
    /// Returning `false` runs the full path for that shape. Returning `true` only allows a skip:
    /// a shape whose points, transform or viewport changed is still updated. The predicate is
    /// called from worker threads when the pipeline runs in parallel.
    pub fn update_with<F>(
        &mut self,
        ctx: &ViewportContext,
        trigger: UpdateTrigger,
        may_skip: F,
    ) -> UpdateStats
    where
        F: Fn(ShapeId, &Shape) -> bool + Sync,
    {
        #[cfg(feature = "profiling")]
        profiling::scope!("pipeline::update");

        let reducer = self.reducer;
        let update_one = |(id, shape): &mut (ShapeId, Shape)| {
            let lazy = may_skip(*id, shape);
            let outcome = shape.update(ctx, trigger, &reducer, lazy);
            UpdateStats::of_shape(outcome, shape.geometry())
        };

        let stats = if self.shapes.len() >= self.config.parallel_threshold {
            self.shapes
                .par_iter_mut()
                .map(update_one)
                .reduce(UpdateStats::default, UpdateStats::merge)
        } else {
            self.shapes
                .iter_mut()
                .map(update_one)
                .fold(UpdateStats::default(), UpdateStats::merge)
        };

        tracing::debug!(
            "Updated {} shapes on {:?}: {} rebuilt, {} reclipped, {} skipped, {} points in {} pieces",
            stats.shapes(),
            trigger,
            stats.rebuilt,
            stats.reclipped,
            stats.skipped,
            stats.points,
            stats.pieces
        );
        stats
    }

    /// Update a single shape, returns `None` for an unknown id
    pub fn update_shape(
        &mut self,
        id: ShapeId,
        ctx: &ViewportContext,
        trigger: UpdateTrigger,
    ) -> Option<UpdateOutcome> {
        let reducer = self.reducer;
        let lazy = self.config.lazy_updates;
        self.shape_mut(id)
            .map(|shape| shape.update(ctx, trigger, &reducer, lazy))
    }

    /// Hand the current geometry of every shape to `sink`, in insertion order
    pub fn emit<S: GeometrySink + ?Sized>(&self, sink: &mut S) {
        for (_, shape) in &self.shapes {
            shape.geometry().emit(sink);
        }
    }

    /// Update, emit, and invalidate the sink once if any geometry changed
    pub fn render<S: GeometrySink + ?Sized>(
        &mut self,
        ctx: &ViewportContext,
        trigger: UpdateTrigger,
        sink: &mut S,
    ) -> UpdateStats {
        let stats = self.update(ctx, trigger);
        self.emit(sink);
        if stats.changed() {
            sink.invalidate();
        }
        stats
    }
}
