use super::{BooleanBackend, Deadline};
use crate::error::BooleanError;
use crate::math::{Point3, TOLERANCE};
use crate::mesh::TriangleMesh;

/// How often the facet loops re-check the deadline.
const DEADLINE_STRIDE: usize = 64;

/// Tertiary backend: whole-facet classification, no splitting.
///
/// Keeps target facets whose centroid lies outside the cutter and adds
/// cutter facets whose centroid lies inside the target, flipped. Facets
/// straddling the other solid's surface are kept or dropped wholesale, so
/// the result is cruder than a clipped boolean — the generic last resort
/// before the pipeline gives up and returns the unmodified body.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetClassifyBackend;

impl BooleanBackend for FacetClassifyBackend {
    fn name(&self) -> &'static str {
        "facet-classify"
    }

    fn subtract(
        &self,
        target: &TriangleMesh,
        cutter: &TriangleMesh,
        deadline: Deadline,
    ) -> Result<TriangleMesh, BooleanError> {
        if target.is_empty() || cutter.is_empty() {
            return Err(BooleanError::Unsupported {
                backend: self.name(),
                reason: "one of the operands has no facets".into(),
            });
        }

        let mut result = TriangleMesh::default();
        for i in 0..target.triangle_count() {
            if i % DEADLINE_STRIDE == 0 {
                deadline.check(self.name())?;
            }
            let [a, b, c] = target.triangle_vertices(i);
            if !point_in_mesh(&centroid(a, b, c), cutter) {
                result.push_triangle(a, b, c);
            }
        }
        for i in 0..cutter.triangle_count() {
            if i % DEADLINE_STRIDE == 0 {
                deadline.check(self.name())?;
            }
            let [a, b, c] = cutter.triangle_vertices(i);
            if point_in_mesh(&centroid(a, b, c), target) {
                // Cutter facets become interior walls: flipped to face the
                // remaining material.
                result.push_triangle(a, c, b);
            }
        }

        if result.triangle_count() < 4 || !result.is_finite() {
            return Err(BooleanError::InvalidResult {
                backend: self.name(),
            });
        }
        Ok(result)
    }
}

fn centroid(a: Point3, b: Point3, c: Point3) -> Point3 {
    Point3::new(
        (a.x + b.x + c.x) / 3.0,
        (a.y + b.y + c.y) / 3.0,
        (a.z + b.z + c.z) / 3.0,
    )
}

/// Ray-parity containment test: casts a ray along +Z and counts crossings.
fn point_in_mesh(point: &Point3, mesh: &TriangleMesh) -> bool {
    let mut crossings = 0u32;
    for i in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.triangle_vertices(i);
        if let Some(z) = ray_z_intersection(point, &a, &b, &c) {
            if z > point.z + TOLERANCE {
                crossings += 1;
            }
        }
    }
    crossings % 2 == 1
}

/// Returns the Z of the intersection between the vertical ray through
/// `point` and the triangle, if the ray passes through its XY projection.
fn ray_z_intersection(point: &Point3, a: &Point3, b: &Point3, c: &Point3) -> Option<f64> {
    let d1 = (b.x - a.x) * (point.y - a.y) - (b.y - a.y) * (point.x - a.x);
    let d2 = (c.x - b.x) * (point.y - b.y) - (c.y - b.y) * (point.x - b.x);
    let d3 = (a.x - c.x) * (point.y - c.y) - (a.y - c.y) * (point.x - c.x);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    if has_neg && has_pos {
        return None;
    }

    // Barycentric interpolation of Z over the XY projection.
    let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if denom.abs() < TOLERANCE {
        return None;
    }
    let u = ((b.y - c.y) * (point.x - c.x) + (c.x - b.x) * (point.y - c.y)) / denom;
    let v = ((c.y - a.y) * (point.x - c.x) + (a.x - c.x) * (point.y - c.y)) / denom;
    let w = 1.0 - u - v;
    Some(u * a.z + v * b.z + w * c.z)
}
