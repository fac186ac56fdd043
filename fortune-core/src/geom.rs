//! Tolerances and the clip rectangle.

use crate::{Result, VoronoiError};

/// Absolute tolerance used by every geometric comparison in the sweep,
/// the clipper and the cell closer.
pub const EPSILON: f64 = 1e-9;

/// Orientation guard for circle events: triples whose doubled
/// cross product is not below `-CIRCLE_EPSILON` never converge.
pub const CIRCLE_EPSILON: f64 = 2e-12;

#[inline]
pub(crate) fn eq_eps(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

#[inline]
pub(crate) fn gt_eps(a: f64, b: f64) -> bool {
    a - b > EPSILON
}

#[inline]
pub(crate) fn lt_eps(a: f64, b: f64) -> bool {
    b - a > EPSILON
}

/// Axis-aligned clip rectangle in screen orientation: `yt` is the top
/// (smaller y) edge and `yb` the bottom (larger y) edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub xl: f64,
    pub xr: f64,
    pub yt: f64,
    pub yb: f64,
}

impl BBox {
    pub fn new(xl: f64, xr: f64, yt: f64, yb: f64) -> Self {
        Self { xl, xr, yt, yb }
    }

    /// Rectangle anchored at the origin
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, width, 0.0, height)
    }

    pub fn width(&self) -> f64 {
        self.xr - self.xl
    }

    pub fn height(&self) -> f64 {
        self.yb - self.yt
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Inclusive containment test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xl && x <= self.xr && y >= self.yt && y <= self.yb
    }

    /// Reject rectangles the cell closer cannot walk around.
    pub fn validate(&self) -> Result<()> {
        let coords = [self.xl, self.xr, self.yt, self.yb];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(VoronoiError::InvalidBoundingBox(format!(
                "non-finite coordinate in {:?}",
                self
            )));
        }
        if self.xr <= self.xl || self.yb <= self.yt {
            return Err(VoronoiError::InvalidBoundingBox(format!(
                "empty rectangle {:?}",
                self
            )));
        }
        Ok(())
    }
}
