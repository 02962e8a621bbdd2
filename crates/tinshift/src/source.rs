//! The seam between the locator and whatever stores the triangles.

use std::ops::ControlFlow;

use glam::DVec2;

use crate::error::Result;
use crate::metadata::MeshMetadata;

/// Axis-aligned query window, inclusive on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchWindow {
    pub min: DVec2,
    pub max: DVec2,
}

impl SearchWindow {
    /// Square window of half-width `radius` centred on `center`.
    #[must_use]
    pub fn around(center: DVec2, radius: f64) -> Self {
        Self {
            min: center - DVec2::splat(radius),
            max: center + DVec2::splat(radius),
        }
    }

    /// Whether an extent `[min, max]` intersects the window.
    #[must_use]
    pub fn intersects(&self, min: DVec2, max: DVec2) -> bool {
        max.x >= self.min.x && min.x <= self.max.x && max.y >= self.min.y && min.y <= self.max.y
    }
}

/// Per-corner vertical correction values of one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalValues {
    Offset([f64; 3]),
    Paired { source: [f64; 3], target: [f64; 3] },
}

impl VerticalValues {
    /// Signed correction at each corner.
    #[must_use]
    pub fn offsets(&self) -> [f64; 3] {
        match *self {
            Self::Offset(offsets) => offsets,
            Self::Paired { source, target } => [
                target[0] - source[0],
                target[1] - source[1],
                target[2] - source[2],
            ],
        }
    }
}

/// Raw columns of one candidate triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleRow {
    /// Encoded source positions of the three corners.
    pub geometry: [Vec<u8>; 3],
    /// Target positions, present when the mesh has a horizontal component.
    pub target: Option<[DVec2; 3]>,
    /// Vertical values, present when the mesh has a vertical component.
    pub vertical: Option<VerticalValues>,
}

/// A store that can stream the triangles intersecting a window.
pub trait TriangleSource {
    fn metadata(&self) -> &MeshMetadata;

    /// Stream every triangle whose extent intersects `window` to `visitor`.
    ///
    /// Rows are produced lazily; the stream stops as soon as the visitor
    /// returns `Break` or an error. Each call issues a fresh query.
    fn visit_candidates<F>(&mut self, window: &SearchWindow, visitor: F) -> Result<()>
    where
        F: FnMut(TriangleRow) -> Result<ControlFlow<()>>;
}
