//! Filled-region resolution from raw glyph contours.
//!
//! Font outlines arrive as a flat list of closed loops with no explicit
//! solid/hole structure. This module rebuilds that structure: the largest
//! valid loop is the exterior, loops contained in it are holes, and the
//! filled region is the regularized set difference `exterior - union(holes)`.

use std::cmp::Ordering;

use geo::orient::Direction;
use geo::{Area, BooleanOps, Contains, LineString, MultiPolygon, Orient, Polygon};

use crate::math::{polygon_2d, Point2, AREA_EPSILON, TOLERANCE};
use crate::outline::Contour;

/// A filled 2D region: one exterior ring plus zero or more hole rings.
///
/// Rings are open loops (the closing edge is implicit), with the exterior
/// wound counter-clockwise and holes clockwise.
#[derive(Debug, Clone)]
pub struct GlyphRegion {
    /// Outer boundary of the filled region.
    pub exterior: Vec<Point2>,
    /// Boundaries of interior voids, each strictly inside the exterior.
    pub holes: Vec<Vec<Point2>>,
}

impl GlyphRegion {
    /// Net filled area: exterior area minus the area of all holes.
    #[must_use]
    pub fn fill_area(&self) -> f64 {
        let outer = polygon_2d::signed_area(&self.exterior).abs();
        let voids: f64 = self
            .holes
            .iter()
            .map(|h| polygon_2d::signed_area(h).abs())
            .sum();
        outer - voids
    }
}

/// Resolves raw glyph contours into a single filled region with holes.
///
/// Contours that are degenerate, self-intersecting beyond repair, or below
/// the area epsilon are discarded. Valid contours not contained in the
/// largest one are also discarded: the resolver prioritizes one connected
/// region, which is a known limitation for glyphs with disjoint strokes.
pub struct ResolveRegion {
    contours: Vec<Contour>,
}

impl ResolveRegion {
    /// Creates a new `ResolveRegion` operation.
    #[must_use]
    pub fn new(contours: Vec<Contour>) -> Self {
        Self { contours }
    }

    /// Executes the resolution.
    ///
    /// Returns `None` when no valid polygon exists — "nothing to extrude",
    /// not an error.
    #[must_use]
    pub fn execute(self) -> Option<GlyphRegion> {
        let mut polygons: Vec<Polygon<f64>> = Vec::new();
        for contour in &self.contours {
            if contour.len() < 3 {
                continue;
            }
            if !polygon_2d::ring_is_simple(contour) {
                continue;
            }
            let ring = LineString::from(
                contour.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>(),
            );
            let polygon = Polygon::new(ring, vec![]);
            if polygon.unsigned_area() <= AREA_EPSILON {
                continue;
            }
            polygons.push(polygon);
        }
        if polygons.is_empty() {
            return None;
        }

        // Largest enclosed area is the exterior.
        polygons.sort_by(|a, b| {
            b.unsigned_area()
                .partial_cmp(&a.unsigned_area())
                .unwrap_or(Ordering::Equal)
        });
        let mut rest = polygons.split_off(1);
        let exterior = polygons.remove(0);

        // Holes are contained in the exterior; anything else is dropped.
        rest.retain(|candidate| exterior.contains(candidate));

        let filled = if rest.is_empty() {
            MultiPolygon::new(vec![exterior])
        } else {
            MultiPolygon::new(vec![exterior]).difference(&MultiPolygon::new(rest))
        };

        // The difference can leave slivers; keep the largest remaining part
        // above the area epsilon.
        let best = filled
            .0
            .into_iter()
            .filter(|p| p.unsigned_area() > AREA_EPSILON)
            .max_by(|a, b| {
                a.unsigned_area()
                    .partial_cmp(&b.unsigned_area())
                    .unwrap_or(Ordering::Equal)
            })?;

        let oriented = best.orient(Direction::Default);
        Some(GlyphRegion {
            exterior: ring_points(oriented.exterior()),
            holes: oriented.interiors().iter().map(ring_points).collect(),
        })
    }
}

/// Converts a closed `LineString` into an open point loop.
fn ring_points(ring: &LineString<f64>) -> Vec<Point2> {
    let mut points: Vec<Point2> = ring.coords().map(|c| Point2::new(c.x, c.y)).collect();
    if points.len() >= 2 {
        let first = points[0];
        let last = points[points.len() - 1];
        if (last - first).norm() < TOLERANCE {
            points.pop();
        }
    }
    points
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn square(origin: f64, size: f64) -> Contour {
        vec![
            p(origin, origin),
            p(origin + size, origin),
            p(origin + size, origin + size),
            p(origin, origin + size),
        ]
    }

    #[test]
    fn empty_input_resolves_to_none() {
        assert!(ResolveRegion::new(vec![]).execute().is_none());
    }

    #[test]
    fn short_contours_are_discarded() {
        let region = ResolveRegion::new(vec![vec![p(0.0, 0.0), p(1.0, 0.0)]]).execute();
        assert!(region.is_none());
    }

    #[test]
    fn self_intersecting_contour_is_discarded() {
        // Bowtie: crosses itself at the center.
        let bowtie = vec![p(0.0, 0.0), p(2.0, 2.0), p(2.0, 0.0), p(0.0, 2.0)];
        assert!(ResolveRegion::new(vec![bowtie]).execute().is_none());
    }

    #[test]
    fn single_contour_is_its_own_region() {
        let region = ResolveRegion::new(vec![square(0.0, 10.0)]).execute().unwrap();
        assert!(region.holes.is_empty());
        assert!((region.fill_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn nested_contour_becomes_a_hole() {
        // 10x10 exterior, concentric 4x4 hole: the letter-"O" case.
        let region = ResolveRegion::new(vec![square(3.0, 4.0), square(0.0, 10.0)])
            .execute()
            .unwrap();
        assert_eq!(region.holes.len(), 1);
        assert!((region.fill_area() - 84.0).abs() < 1e-9);
    }

    #[test]
    fn exterior_area_exceeds_hole_area() {
        let region = ResolveRegion::new(vec![square(0.0, 10.0), square(2.0, 5.0)])
            .execute()
            .unwrap();
        let outer = polygon_2d::signed_area(&region.exterior).abs();
        let holes: f64 = region
            .holes
            .iter()
            .map(|h| polygon_2d::signed_area(h).abs())
            .sum();
        assert!(outer > holes);
        assert!(region.fill_area() > 0.0);
    }

    #[test]
    fn ring_orientation_is_normalized() {
        let region = ResolveRegion::new(vec![square(0.0, 10.0), square(3.0, 4.0)])
            .execute()
            .unwrap();
        assert!(polygon_2d::signed_area(&region.exterior) > 0.0, "exterior is CCW");
        assert!(polygon_2d::signed_area(&region.holes[0]) < 0.0, "hole is CW");
    }

    #[test]
    fn disjoint_contour_is_discarded() {
        // A smaller square entirely outside the largest one: dropped, not a
        // second region (disjoint-stroke glyph limitation).
        let region = ResolveRegion::new(vec![square(0.0, 10.0), square(20.0, 4.0)])
            .execute()
            .unwrap();
        assert!(region.holes.is_empty());
        assert!((region.fill_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn sliver_contour_is_discarded() {
        let sliver = vec![
            p(0.0, 0.0),
            p(1.0, 0.0),
            p(1.0, 1e-9),
            p(0.0, 1e-9),
        ];
        let region = ResolveRegion::new(vec![square(0.0, 10.0), sliver])
            .execute()
            .unwrap();
        assert!(region.holes.is_empty());
    }

    #[test]
    fn winding_direction_of_input_does_not_matter() {
        // Same nested squares, inner wound CW as TrueType emits them.
        let mut inner = square(3.0, 4.0);
        inner.reverse();
        let region = ResolveRegion::new(vec![square(0.0, 10.0), inner])
            .execute()
            .unwrap();
        assert_eq!(region.holes.len(), 1);
        assert!((region.fill_area() - 84.0).abs() < 1e-9);
    }
}
