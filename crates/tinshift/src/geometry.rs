//! Planar predicates used by the triangle search.

use glam::DVec2;

/// Tolerance for degeneracy, inclusion and point windows.
pub const EPSILON: f64 = 1e-10;

/// Barycentric coordinates of a point relative to a triangle.
///
/// `lambda[2]` is derived as `1 - lambda[0] - lambda[1]`, so the weights sum
/// to one by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarycentricWeights {
    pub lambda: [f64; 3],
}

impl BarycentricWeights {
    /// Weights of `p` in the triangle `v`, or `None` if the triangle is degenerate.
    ///
    /// Points outside the triangle yield weights outside `[0, 1]`.
    #[must_use]
    pub fn compute(v: &[DVec2; 3], p: DVec2) -> Option<Self> {
        let det = (v[1].y - v[2].y) * (v[0].x - v[2].x) + (v[2].x - v[1].x) * (v[0].y - v[2].y);
        if det.abs() < EPSILON {
            return None;
        }
        let l1 = ((v[1].y - v[2].y) * (p.x - v[2].x) + (v[2].x - v[1].x) * (p.y - v[2].y)) / det;
        let l2 = ((v[2].y - v[0].y) * (p.x - v[2].x) + (v[0].x - v[2].x) * (p.y - v[2].y)) / det;
        Some(Self {
            lambda: [l1, l2, 1.0 - l1 - l2],
        })
    }

    /// Weights of `p` if it lies in the non-degenerate triangle `v`, with tolerance.
    #[must_use]
    pub fn inside(v: &[DVec2; 3], p: DVec2) -> Option<Self> {
        Self::compute(v, p).filter(Self::is_inside)
    }

    /// Each weight within `[-EPSILON, 1 + EPSILON]`.
    #[must_use]
    pub fn is_inside(&self) -> bool {
        self.lambda
            .iter()
            .all(|&l| (-EPSILON..=1.0 + EPSILON).contains(&l))
    }

    #[must_use]
    pub fn interpolate(&self, values: [f64; 3]) -> f64 {
        self.lambda[0] * values[0] + self.lambda[1] * values[1] + self.lambda[2] * values[2]
    }

    #[must_use]
    pub fn interpolate_point(&self, points: &[DVec2; 3]) -> DVec2 {
        points[0] * self.lambda[0] + points[1] * self.lambda[1] + points[2] * self.lambda[2]
    }
}

/// Squared distance from `p` to the segment `a`-`b`, given `|b - a|^2 > 0`.
#[must_use]
pub fn sq_distance_to_segment(p: DVec2, a: DVec2, b: DVec2, sq_len: f64) -> f64 {
    let t = (p - a).dot(b - a) / sq_len;
    if t <= 0.0 {
        p.distance_squared(a)
    } else if t >= 1.0 {
        p.distance_squared(b)
    } else {
        p.distance_squared(a + (b - a) * t)
    }
}

/// Squared lengths of edges 1-2, 2-3 and 1-3.
#[must_use]
pub fn sq_edge_lengths(v: &[DVec2; 3]) -> [f64; 3] {
    [
        v[0].distance_squared(v[1]),
        v[1].distance_squared(v[2]),
        v[0].distance_squared(v[2]),
    ]
}

/// Smallest squared distance from `p` to any edge of `v`.
#[must_use]
pub fn sq_distance_to_edges(v: &[DVec2; 3], p: DVec2) -> f64 {
    let [d12, d23, d13] = sq_edge_lengths(v);
    sq_distance_to_segment(p, v[0], v[1], d12)
        .min(sq_distance_to_segment(p, v[1], v[2], d23))
        .min(sq_distance_to_segment(p, v[0], v[2], d13))
}

#[must_use]
pub fn centroid(v: &[DVec2; 3]) -> DVec2 {
    (v[0] + v[1] + v[2]) / 3.0
}

/// Triangle with a near-zero edge or near-zero area.
#[must_use]
pub fn is_degenerate(v: &[DVec2; 3]) -> bool {
    sq_edge_lengths(v).iter().any(|&d| d < EPSILON)
        || BarycentricWeights::compute(v, v[0]).is_none()
}

/// Whether the extent of `v` comes within `distance` of `p` on both axes.
#[must_use]
pub fn extent_within(v: &[DVec2; 3], p: DVec2, distance: f64) -> bool {
    let min = v[0].min(v[1]).min(v[2]);
    let max = v[0].max(v[1]).max(v[2]);
    !(p.x + distance < min.x
        || p.x - distance > max.x
        || p.y + distance < min.y
        || p.y - distance > max.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TRI: [DVec2; 3] = [
        DVec2::new(0.0, 0.0),
        DVec2::new(10.0, 0.0),
        DVec2::new(0.0, 10.0),
    ];

    #[test]
    fn corners_have_unit_weights() {
        for (i, corner) in TRI.iter().enumerate() {
            let w = BarycentricWeights::inside(&TRI, *corner).unwrap();
            for (j, l) in w.lambda.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((l - expected).abs() < 1e-12, "{w:?}");
            }
        }
    }

    #[test]
    fn outside_points_extrapolate() {
        assert!(BarycentricWeights::inside(&TRI, DVec2::new(-5.0, -5.0)).is_none());
        let w = BarycentricWeights::compute(&TRI, DVec2::new(-5.0, -5.0)).unwrap();
        assert!((w.lambda[0] - 2.0).abs() < 1e-12);
        assert!((w.lambda[1] + 0.5).abs() < 1e-12);
        assert!((w.lambda[2] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn tolerance_admits_points_on_the_boundary() {
        let on_edge = DVec2::new(5.0, 5.0);
        assert!(BarycentricWeights::inside(&TRI, on_edge).is_some());
        let just_out = DVec2::new(5.0, 5.0 + 1e-6);
        assert!(BarycentricWeights::inside(&TRI, just_out).is_none());
    }

    #[test]
    fn collinear_triangles_are_degenerate() {
        let line = [DVec2::ZERO, DVec2::new(5.0, 5.0), DVec2::new(10.0, 10.0)];
        assert!(BarycentricWeights::compute(&line, DVec2::new(1.0, 1.0)).is_none());
        assert!(is_degenerate(&line));
        let collapsed = [DVec2::ZERO, DVec2::ZERO, DVec2::new(10.0, 0.0)];
        assert!(is_degenerate(&collapsed));
        assert!(!is_degenerate(&TRI));
    }

    #[test]
    fn shared_edge_interpolates_continuously() {
        let other = [TRI[1], DVec2::new(10.0, 10.0), TRI[2]];
        let values_a = [1.0, 4.0, 7.0];
        // Corners shared with `TRI` keep their values.
        let values_b = [4.0, 9.0, 7.0];
        for t in [0.0, 0.25, 0.5, 0.9, 1.0] {
            let p = TRI[1] + (TRI[2] - TRI[1]) * t;
            let a = BarycentricWeights::inside(&TRI, p).unwrap().interpolate(values_a);
            let b = BarycentricWeights::inside(&other, p).unwrap().interpolate(values_b);
            assert!((a - b).abs() < 1e-9, "t={t}: {a} vs {b}");
        }
    }

    #[test]
    fn segment_distance_regions() {
        let a = DVec2::ZERO;
        let b = DVec2::new(10.0, 0.0);
        let len = a.distance_squared(b);
        assert_eq!(sq_distance_to_segment(DVec2::new(-3.0, 4.0), a, b, len), 25.0);
        assert_eq!(sq_distance_to_segment(DVec2::new(13.0, 4.0), a, b, len), 25.0);
        assert_eq!(sq_distance_to_segment(DVec2::new(5.0, -2.0), a, b, len), 4.0);
        assert_eq!(sq_distance_to_edges(&TRI, DVec2::new(-1.0, 5.0)), 1.0);
    }

    #[test]
    fn extent_check() {
        assert!(extent_within(&TRI, DVec2::new(-1.0, 5.0), 1.0));
        assert!(!extent_within(&TRI, DVec2::new(-1.0, 5.0), 0.5));
        assert!(extent_within(&TRI, DVec2::new(5.0, 12.0), f64::INFINITY));
        assert!(!extent_within(&TRI, DVec2::new(5.0, 12.0), 1.0));
    }

    proptest! {
        #[test]
        fn interior_weights_are_a_partition_of_unity(
            a in 0.01..1.0f64,
            b in 0.01..1.0f64,
            c in 0.01..1.0f64,
        ) {
            let s = a + b + c;
            let p = TRI[0] * (a / s) + TRI[1] * (b / s) + TRI[2] * (c / s);
            let w = BarycentricWeights::inside(&TRI, p).unwrap();
            prop_assert!((w.lambda.iter().sum::<f64>() - 1.0).abs() < 1e-12);
            for l in w.lambda {
                prop_assert!((0.0..=1.0).contains(&l));
            }
            prop_assert!((w.interpolate_point(&TRI) - p).length() < 1e-9);
        }
    }
}
