//! Viewport Clip Library - Clipping and Reduction of Map Shapes
//!
//! This library keeps vector shapes (polylines and polygons) cheap to redraw on a
//! continuously pannable, zoomable map. Every time the viewport changes, each shape is
//! clipped to the visible extent and reduced so that off-screen and sub-pixel geometry
//! never reaches the rasterizer.
//!
//! # Architecture
//!
//! - **[`BoundingRectangle`]**: Axis-aligned rectangle with an explicit empty state
//! - **[`clip_segment`]**: Cohen-Sutherland clipping of a single segment
//! - **[`PolylineReducer`]**: Splits polylines into visible pieces and drops sub-pixel points
//! - **[`Shape`]**: Per-shape update state machine (transform, clip, reduce)
//! - **[`ShapeRenderPipeline`]**: Owns all shapes and drives them frame by frame
//!
//! # Performance Characteristics
//!
//! - **Clip + reduce**: O(N) per shape, single pass, no allocation beyond the output
//! - **Lazy updates**: O(1) per shape when nothing relevant changed since the last build
//! - **Many shapes**: updated in parallel once the shape count reaches the configured threshold

mod clip;
mod pipeline;
mod rect;
mod reduce;
mod shape;
pub mod transform;
mod viewport;

// Public API exports
pub use clip::{
    BOUNDARY_TOLERANCE, MAX_CLIP_ITERATIONS, Outcode, clip_segment, outcode, segment_intersects,
};
pub use pipeline::{Config, ShapeId, ShapeRenderPipeline, UpdateStats};
pub use rect::BoundingRectangle;
pub use reduce::{Piece, PolylineReducer};
pub use shape::{
    DEFAULT_STROKE_THICKNESS, GeometrySink, Shape, ShapeGeometry, ShapeKind, UpdateOutcome,
    UpdateState, UpdateTrigger,
};
pub use transform::{IdentityTransform, ViewTransform, WebMercatorView};
pub use viewport::{SurfaceSize, ViewportContext};

/// Error types for the clipping engine
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid surface size: {width}x{height}")]
    InvalidSurface { width: f64, height: f64 },

    #[error("Invalid scale: {0}")]
    InvalidScale(f64),
}

pub type Result<T> = std::result::Result<T, ClipError>;
