use super::bsp::bsp_difference;
use super::{BooleanBackend, Deadline};
use crate::error::BooleanError;
use crate::math::Point3;
use crate::mesh::TriangleMesh;

/// Vertex snapping grid of the weld pass (mm).
const WELD_GRID: f64 = 1e-4;

/// Facets below this area after snapping are dropped (mm²).
const MIN_FACET_AREA: f64 = WELD_GRID * WELD_GRID;

/// Classification tolerance of the relaxed BSP pass.
const RELAXED_EPSILON: f64 = 1e-3;

/// Secondary backend: weld, then BSP with a relaxed tolerance.
///
/// Heavier than the strict pass but more permissive: vertices are snapped
/// to a quantization grid so nearly-coincident seams (typical after an STL
/// round-trip through f32) become exactly coincident, collapsed facets are
/// dropped, and classification runs with a coarse epsilon.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeldedBspBackend;

impl BooleanBackend for WeldedBspBackend {
    fn name(&self) -> &'static str {
        "welded-bsp"
    }

    fn subtract(
        &self,
        target: &TriangleMesh,
        cutter: &TriangleMesh,
        deadline: Deadline,
    ) -> Result<TriangleMesh, BooleanError> {
        let target = welded(target);
        let cutter = welded(cutter);
        bsp_difference(&target, &cutter, RELAXED_EPSILON, self.name(), deadline)
    }
}

/// Snaps every vertex to the weld grid and drops facets that collapse.
fn welded(mesh: &TriangleMesh) -> TriangleMesh {
    let mut out = TriangleMesh::default();
    for i in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.triangle_vertices(i).map(snap);
        let area = (b - a).cross(&(c - a)).norm() * 0.5;
        if area > MIN_FACET_AREA {
            out.push_triangle(a, b, c);
        }
    }
    out
}

fn snap(p: Point3) -> Point3 {
    Point3::new(
        (p.x / WELD_GRID).round() * WELD_GRID,
        (p.y / WELD_GRID).round() * WELD_GRID,
        (p.z / WELD_GRID).round() * WELD_GRID,
    )
}
