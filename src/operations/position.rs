use crate::math::Vector3;
use crate::mesh::{Aabb, TriangleMesh};

/// How far below the engraving surface the cutter sinks (mm).
///
/// Zero or negative overlap leaves the cutter and target meeting in a
/// coincident face, which breaks the boolean step or produces a
/// non-manifold seam.
pub const CUTTER_OVERLAP: f64 = 0.1;

/// Places an extruded cutter against a target body.
///
/// The cutter is expected in the local frame produced by
/// [`ExtrudeRegion`](super::ExtrudeRegion): glyph centroid on the Z axis,
/// prism spanning `z ∈ [0, height]`. Positioning translates it so the glyph
/// centroid lands on the target's horizontal bounding-box center (plus the
/// manual offset) and the prism bottom sits [`CUTTER_OVERLAP`] below the
/// target's lowest face — the engraving surface.
///
/// Mirroring is deliberately not applied here: mirrored text comes from
/// mirrored contours upstream, since mirroring a closed solid would invert
/// its face winding.
pub struct PositionCutter {
    target_bounds: Aabb,
    offset_x: f64,
    offset_y: f64,
}

impl PositionCutter {
    /// Creates a new `PositionCutter` operation.
    #[must_use]
    pub fn new(target_bounds: Aabb, offset_x: f64, offset_y: f64) -> Self {
        Self {
            target_bounds,
            offset_x,
            offset_y,
        }
    }

    /// Executes the placement, returning the translated cutter.
    #[must_use]
    pub fn execute(&self, cutter: &TriangleMesh) -> TriangleMesh {
        let center = self.target_bounds.center();
        cutter.translated(Vector3::new(
            center.x + self.offset_x,
            center.y + self.offset_y,
            self.target_bounds.min.z - CUTTER_OVERLAP,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point2, TOLERANCE};
    use crate::operations::ExtrudeRegion;
    use crate::region::GlyphRegion;

    fn target_bounds() -> Aabb {
        Aabb {
            min: crate::math::Point3::new(1.0, 2.0, 0.0),
            max: crate::math::Point3::new(19.0, 20.0, 10.0),
        }
    }

    fn square_cutter() -> TriangleMesh {
        let region = GlyphRegion {
            exterior: vec![
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(4.0, 4.0),
                Point2::new(0.0, 4.0),
            ],
            holes: vec![],
        };
        ExtrudeRegion::new(region, 1.3).execute().unwrap()
    }

    #[test]
    fn centered_cutter_lands_on_target_center() {
        let placed = PositionCutter::new(target_bounds(), 0.0, 0.0).execute(&square_cutter());
        let bounds = placed.bounding_box().unwrap();
        let center = bounds.center();
        // Symmetric cutter: its centroid coincides with its bbox center.
        assert!((center.x - 10.0).abs() < TOLERANCE);
        assert!((center.y - 11.0).abs() < TOLERANCE);
    }

    #[test]
    fn manual_offset_shifts_placement() {
        let placed = PositionCutter::new(target_bounds(), 1.5, -2.0).execute(&square_cutter());
        let center = placed.bounding_box().unwrap().center();
        assert!((center.x - 11.5).abs() < TOLERANCE);
        assert!((center.y - 9.0).abs() < TOLERANCE);
    }

    #[test]
    fn cutter_bottom_overlaps_engraving_surface() {
        let placed = PositionCutter::new(target_bounds(), 0.0, 0.0).execute(&square_cutter());
        let bounds = placed.bounding_box().unwrap();
        assert!((bounds.min.z - (0.0 - CUTTER_OVERLAP)).abs() < TOLERANCE);
        assert!((bounds.max.z - (1.3 - CUTTER_OVERLAP)).abs() < TOLERANCE);
    }

    #[test]
    fn placement_preserves_counts() {
        let cutter = square_cutter();
        let placed = PositionCutter::new(target_bounds(), 0.0, 0.0).execute(&cutter);
        assert_eq!(placed.triangle_count(), cutter.triangle_count());
        assert_eq!(placed.vertices.len(), cutter.vertices.len());
    }
}
