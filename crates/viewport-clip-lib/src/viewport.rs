//! Per-frame viewport description supplied by the caller

use crate::{BoundingRectangle, ClipError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Size of the rendering surface in device pixels
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and strictly positive
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Read-only description of the current view for one update
///
/// # Fields
/// * `visible` - Visible extent in view space
/// * `surface` - Rendering surface size in device pixels
/// * `scale` - Device pixels per view unit, used to convert stroke thickness
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportContext {
    visible: BoundingRectangle,
    surface: SurfaceSize,
    scale: f64,
}

impl ViewportContext {
    /// Create a viewport context, validating the surface size and the scale
    ///
    /// An empty `visible` rectangle is accepted: nothing is visible in that frame.
    pub fn new(visible: BoundingRectangle, surface: SurfaceSize, scale: f64) -> Result<Self> {
        if !surface.is_valid() {
            return Err(ClipError::InvalidSurface {
                width: surface.width,
                height: surface.height,
            });
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ClipError::InvalidScale(scale));
        }

        Ok(Self {
            visible,
            surface,
            scale,
        })
    }

    #[inline]
    pub fn visible(&self) -> BoundingRectangle {
        self.visible
    }

    #[inline]
    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Visible rectangle grown by half the stroke thickness on every side
    ///
    /// Lines whose centerline is just outside the visible extent still draw part of
    /// their stroke inside it, so they must survive clipping.
    pub fn acceptance_window(&self, stroke_thickness: f64) -> BoundingRectangle {
        let margin = 0.5 * stroke_thickness.max(0.0) / self.scale;
        self.visible.expand(margin, margin)
    }

    /// Same context with the visible rectangle moved by `(dx, dy)` view units
    pub fn panned(&self, dx: f64, dy: f64) -> Self {
        Self {
            visible: self.visible.translate(dx, dy),
            ..*self
        }
    }
}
