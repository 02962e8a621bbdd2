//! Forward and inverse evaluation of a triangulated shift mesh.

use glam::DVec3;

use crate::config::OpenOptions;
use crate::error::Result;
use crate::locator::{Direction, TriangleLocator};
use crate::metadata::MeshMetadata;
use crate::source::TriangleSource;
use crate::store::MeshStore;

/// A coordinate correction that can be applied in both directions.
///
/// `Ok(None)` means the coordinate is outside the correction's coverage;
/// errors are reserved for failures reading the correction data.
pub trait ShiftEvaluator {
    fn forward(&mut self, coord: DVec3) -> Result<Option<DVec3>>;
    fn inverse(&mut self, coord: DVec3) -> Result<Option<DVec3>>;
}

/// Evaluates a triangulated irregular network of corrections.
#[derive(Debug)]
pub struct TinShiftEvaluator<S = MeshStore> {
    locator: TriangleLocator<S>,
}

impl TinShiftEvaluator<MeshStore> {
    /// Open the mesh at `location` and build an evaluator over it.
    pub fn open(location: &str, options: &OpenOptions) -> Result<Self> {
        Ok(Self::new(TriangleLocator::new(MeshStore::open(location, options)?)))
    }
}

impl<S: TriangleSource> TinShiftEvaluator<S> {
    #[must_use]
    pub fn new(locator: TriangleLocator<S>) -> Self {
        Self { locator }
    }

    #[must_use]
    pub fn metadata(&self) -> &MeshMetadata {
        self.locator.metadata()
    }

    #[must_use]
    pub fn locator(&self) -> &TriangleLocator<S> {
        &self.locator
    }

    fn transform(&mut self, coord: DVec3, direction: Direction) -> Result<Option<DVec3>> {
        let Some(found) = self.locator.find_triangle(coord.truncate(), direction)? else {
            return Ok(None);
        };
        let weights = found.weights;

        let horizontal = found
            .corrections
            .horizontal
            .map_or(coord.truncate(), |corners| weights.interpolate_point(&corners));

        let sign = match direction {
            Direction::Forward => 1.0,
            Direction::Inverse => -1.0,
        };
        let z = found
            .corrections
            .vertical
            .map_or(coord.z, |values| coord.z + sign * weights.interpolate(values.offsets()));

        Ok(Some(DVec3::new(horizontal.x, horizontal.y, z)))
    }
}

impl<S: TriangleSource> ShiftEvaluator for TinShiftEvaluator<S> {
    fn forward(&mut self, coord: DVec3) -> Result<Option<DVec3>> {
        self.transform(coord, Direction::Forward)
    }

    fn inverse(&mut self, coord: DVec3) -> Result<Option<DVec3>> {
        self.transform(coord, Direction::Inverse)
    }
}

/// Marker for coordinates that could not be transformed.
pub const NOT_TRANSFORMABLE: DVec3 = DVec3::splat(f64::INFINITY);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{BoundingBox, FallbackStrategy, ShiftBounds, VerticalEncoding};
    use crate::source::{SearchWindow, TriangleRow, VerticalValues};
    use glam::DVec2;
    use std::ops::ControlFlow;
    use tinshift_decode::pack_point;

    struct OneTriangle {
        metadata: MeshMetadata,
        row: TriangleRow,
    }

    impl TriangleSource for OneTriangle {
        fn metadata(&self) -> &MeshMetadata {
            &self.metadata
        }

        fn visit_candidates<F>(&mut self, _window: &SearchWindow, mut visitor: F) -> Result<()>
        where
            F: FnMut(TriangleRow) -> Result<ControlFlow<()>>,
        {
            visitor(self.row.clone()).map(drop)
        }
    }

    const CORNERS: [DVec2; 3] = [
        DVec2::new(0.0, 0.0),
        DVec2::new(10.0, 0.0),
        DVec2::new(0.0, 10.0),
    ];

    fn evaluator(
        target: Option<[DVec2; 3]>,
        vertical: Option<VerticalValues>,
    ) -> TinShiftEvaluator<OneTriangle> {
        let metadata = MeshMetadata {
            horizontal: target.is_some(),
            vertical: match vertical {
                Some(VerticalValues::Offset(_)) => Some(VerticalEncoding::Offset),
                Some(VerticalValues::Paired { .. }) => Some(VerticalEncoding::Paired),
                None => None,
            },
            shift: ShiftBounds::default(),
            fallback: FallbackStrategy::None,
            num_vertices: None,
            bbox: BoundingBox::new(DVec2::ZERO, DVec2::splat(10.0)).unwrap(),
            input_crs: None,
            output_crs: None,
        };
        let row = TriangleRow {
            geometry: CORNERS.map(|c| pack_point(c, 0).to_vec()),
            target,
            vertical,
        };
        TinShiftEvaluator::new(TriangleLocator::new(OneTriangle { metadata, row }))
    }

    #[test]
    fn vertical_only_keeps_horizontal_position() {
        let mut eval = evaluator(None, Some(VerticalValues::Offset([1.0, 2.0, 3.0])));
        let p = DVec3::new(2.5, 2.5, 100.0);
        let out = eval.forward(p).unwrap().unwrap();
        // Weights (0.5, 0.25, 0.25).
        assert_eq!(out.truncate(), p.truncate());
        assert!((out.z - 101.75).abs() < 1e-12);
        let back = eval.inverse(out).unwrap().unwrap();
        assert!((back.z - 100.0).abs() < 1e-12);
    }

    #[test]
    fn paired_heights_apply_their_difference() {
        let mut eval = evaluator(
            None,
            Some(VerticalValues::Paired {
                source: [10.0, 20.0, 30.0],
                target: [12.0, 20.0, 28.0],
            }),
        );
        let out = eval.forward(DVec3::new(0.0, 0.0, 5.0)).unwrap().unwrap();
        assert!((out.z - 7.0).abs() < 1e-12);
        let out = eval.inverse(DVec3::new(0.0, 10.0, 5.0)).unwrap().unwrap();
        assert!((out.z - 7.0).abs() < 1e-12);
    }

    #[test]
    fn horizontal_interpolates_targets() {
        let target = CORNERS.map(|c| c * 2.0 + DVec2::new(100.0, 0.0));
        let mut eval = evaluator(Some(target), None);
        let out = eval.forward(DVec3::new(1.0, 2.0, 3.0)).unwrap().unwrap();
        assert!((out - DVec3::new(102.0, 4.0, 3.0)).length() < 1e-12);
        assert!(eval.forward(DVec3::new(20.0, 20.0, 0.0)).unwrap().is_none());
    }
}
