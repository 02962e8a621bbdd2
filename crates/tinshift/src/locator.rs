//! Triangle location with a single-slot cache and nearest-triangle fallback.
//!
//! A lookup first re-tests the triangle that answered the previous lookup,
//! then queries the store with a tight window around the point, and finally,
//! when the mesh declares a fallback strategy, searches outward with a
//! doubling radius for the nearest usable triangle.

use std::ops::ControlFlow;

use glam::DVec2;
use tinshift_decode::unpack_triangle;

use crate::error::Result;
use crate::geometry::{
    BarycentricWeights, EPSILON, centroid, extent_within, is_degenerate, sq_distance_to_edges,
};
use crate::metadata::{FallbackStrategy, MeshMetadata};
use crate::source::{SearchWindow, TriangleRow, TriangleSource, VerticalValues};

/// Upper bound on radius doublings during the fallback search.
pub const MAX_FALLBACK_ITERATIONS: usize = 20;

/// Direction of a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Source coordinates to target coordinates.
    Forward,
    /// Target coordinates back to source coordinates.
    Inverse,
}

/// Correction values at the three corners of the matched triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionSet {
    /// Output horizontal position of each corner: target positions going
    /// forward, source positions going inverse.
    pub horizontal: Option<[DVec2; 3]>,
    pub vertical: Option<VerticalValues>,
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMatch {
    pub weights: BarycentricWeights,
    pub corrections: CorrectionSet,
}

#[derive(Debug, Clone)]
struct CachedTriangle {
    direction: Direction,
    vertices: [DVec2; 3],
    corrections: CorrectionSet,
}

/// Best triangle found so far by the fallback search.
struct Candidate {
    sq_dist: f64,
    vertices: [DVec2; 3],
    corrections: CorrectionSet,
}

/// Finds the triangle that covers a point and the corrections attached to it.
///
/// Lookups must be serialised: each one may overwrite the cache the next
/// one reads.
#[derive(Debug)]
pub struct TriangleLocator<S> {
    source: S,
    cache: Option<CachedTriangle>,
}

impl<S: TriangleSource> TriangleLocator<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: None,
        }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn metadata(&self) -> &MeshMetadata {
        self.source.metadata()
    }

    /// Consume the locator and return its store.
    #[must_use]
    pub fn into_source(self) -> S {
        self.source
    }

    /// Find the triangle for `point`, or `None` if the point is not covered
    /// and no fallback applies.
    ///
    /// Decode and storage failures are returned as errors and leave the
    /// cache as it was.
    pub fn find_triangle(
        &mut self,
        point: DVec2,
        direction: Direction,
    ) -> Result<Option<TriangleMatch>> {
        if let Some(found) = self.cached(point, direction) {
            tracing::trace!(x = point.x, y = point.y, "cached triangle reused");
            return Ok(Some(found));
        }

        let target_geometry = self.uses_target_geometry(direction);
        if let Some(found) = self.exact_search(point, direction, target_geometry)? {
            return Ok(Some(found));
        }

        let fallback = self.metadata().fallback;
        if fallback == FallbackStrategy::None {
            tracing::debug!(x = point.x, y = point.y, "point outside mesh");
            return Ok(None);
        }
        self.fallback_search(point, fallback, target_geometry)
    }

    /// Inverse lookups on a mesh with horizontal corrections search the
    /// target-side triangles.
    fn uses_target_geometry(&self, direction: Direction) -> bool {
        direction == Direction::Inverse && self.metadata().horizontal
    }

    fn cached(&self, point: DVec2, direction: Direction) -> Option<TriangleMatch> {
        let cached = self.cache.as_ref().filter(|c| c.direction == direction)?;
        let weights = BarycentricWeights::inside(&cached.vertices, point)?;
        Some(TriangleMatch {
            weights,
            corrections: cached.corrections.clone(),
        })
    }

    fn exact_search(
        &mut self,
        point: DVec2,
        direction: Direction,
        target_geometry: bool,
    ) -> Result<Option<TriangleMatch>> {
        let window = if target_geometry {
            // The store indexes source-side extents; widen by the shift range.
            let shift = self.metadata().shift;
            SearchWindow {
                min: point - shift.max - DVec2::splat(EPSILON),
                max: point - shift.min + DVec2::splat(EPSILON),
            }
        } else {
            SearchWindow::around(point, EPSILON)
        };

        let mut hit = None;
        self.source.visit_candidates(&window, |row| {
            let vertices = row_vertices(&row, target_geometry)?;
            let Some(weights) = BarycentricWeights::inside(&vertices, point) else {
                return Ok(ControlFlow::Continue(()));
            };
            let corrections = row_corrections(&row, target_geometry)?;
            hit = Some((vertices, weights, corrections));
            Ok(ControlFlow::Break(()))
        })?;

        let Some((vertices, weights, corrections)) = hit else {
            return Ok(None);
        };
        self.cache = Some(CachedTriangle {
            direction,
            vertices,
            corrections: corrections.clone(),
        });
        Ok(Some(TriangleMatch {
            weights,
            corrections,
        }))
    }

    fn fallback_search(
        &mut self,
        point: DVec2,
        strategy: FallbackStrategy,
        target_geometry: bool,
    ) -> Result<Option<TriangleMatch>> {
        let metadata = self.metadata();
        let Some(num_vertices) = metadata.num_vertices else {
            return Ok(None);
        };
        let bbox = metadata.bbox;
        let offset = if target_geometry {
            -metadata.shift.midpoint()
        } else {
            DVec2::ZERO
        };
        let center = bbox.clamp(point + offset);
        let limit = bbox.width().max(bbox.height());

        // Start from the expected spacing between vertices.
        let mut radius = (bbox.width() * bbox.height() / f64::from(num_vertices.get())).sqrt();
        let mut best: Option<Candidate> = None;

        for iteration in 0..MAX_FALLBACK_ITERATIONS {
            if radius > limit {
                break;
            }
            let window = SearchWindow::around(center, radius);
            self.source.visit_candidates(&window, |row| {
                let vertices = row_vertices(&row, target_geometry)?;
                let closest = best.as_ref().map_or(f64::INFINITY, |b| b.sq_dist.sqrt());
                if !extent_within(&vertices, point, closest) || is_degenerate(&vertices) {
                    return Ok(ControlFlow::Continue(()));
                }
                let sq_dist = match strategy {
                    FallbackStrategy::NearestCentroid => {
                        point.distance_squared(centroid(&vertices))
                    }
                    FallbackStrategy::NearestSide | FallbackStrategy::None => {
                        sq_distance_to_edges(&vertices, point)
                    }
                };
                // Non-finite distances never beat the empty slot.
                if sq_dist < best.as_ref().map_or(f64::INFINITY, |b| b.sq_dist) {
                    best = Some(Candidate {
                        sq_dist,
                        vertices,
                        corrections: row_corrections(&row, target_geometry)?,
                    });
                }
                Ok(ControlFlow::Continue(()))
            })?;

            if best.is_some() {
                break;
            }
            radius *= 2.0;
            tracing::debug!(iteration, radius, "no fallback candidate, widening search");
        }

        let Some(best) = best else {
            tracing::debug!(x = point.x, y = point.y, "fallback search found nothing");
            return Ok(None);
        };
        Ok(BarycentricWeights::compute(&best.vertices, point).map(|weights| TriangleMatch {
            weights,
            corrections: best.corrections,
        }))
    }
}

/// Corner positions used for the containment test.
fn row_vertices(row: &TriangleRow, target_geometry: bool) -> Result<[DVec2; 3]> {
    match (target_geometry, row.target) {
        (true, Some(target)) => Ok(target),
        _ => Ok(decode_geometry(row)?),
    }
}

fn row_corrections(row: &TriangleRow, target_geometry: bool) -> Result<CorrectionSet> {
    let horizontal = match row.target {
        Some(_) if target_geometry => Some(decode_geometry(row)?),
        target => target,
    };
    Ok(CorrectionSet {
        horizontal,
        vertical: row.vertical,
    })
}

fn decode_geometry(row: &TriangleRow) -> tinshift_decode::DecodeResult<[DVec2; 3]> {
    let [a, b, c] = &row.geometry;
    unpack_triangle([a, b, c])
}
