//! Boolean subtraction with a backend fallback chain.
//!
//! A single capability — attempt `target - cutter` — behind an ordered list
//! of backends, tried fastest-first. Numerically fragile glyphs that break
//! one backend fall through to the next; the chain reports failure only
//! when every backend has failed, and the pipeline then substitutes the
//! unmodified target body.

mod bsp;
mod classify;
mod plane;
mod polygon;
mod weld;

pub use bsp::BspBackend;
pub use classify::FacetClassifyBackend;
pub use weld::WeldedBspBackend;

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::BooleanError;
use crate::mesh::TriangleMesh;

use polygon::Polygon;

/// Default per-backend time budget.
pub const DEFAULT_BACKEND_BUDGET: Duration = Duration::from_secs(5);

/// Deadline for a single backend attempt.
///
/// Backends check it inside their build/clip loops so one pathological
/// glyph cannot stall a whole batch.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires: Instant,
}

impl Deadline {
    /// Creates a deadline `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            expires: Instant::now() + budget,
        }
    }

    /// Fails with [`BooleanError::Timeout`] once the deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns [`BooleanError::Timeout`] tagged with `backend`.
    pub fn check(&self, backend: &'static str) -> Result<(), BooleanError> {
        if Instant::now() >= self.expires {
            Err(BooleanError::Timeout { backend })
        } else {
            Ok(())
        }
    }
}

/// A single boolean subtraction strategy.
pub trait BooleanBackend: Send + Sync {
    /// Short name used in logs and error reports.
    fn name(&self) -> &'static str;

    /// Attempts to compute `target - cutter` within `deadline`.
    ///
    /// # Errors
    ///
    /// Returns a [`BooleanError`] describing why this backend could not
    /// produce a usable result; the chain treats any error as "try the next
    /// backend".
    fn subtract(
        &self,
        target: &TriangleMesh,
        cutter: &TriangleMesh,
        deadline: Deadline,
    ) -> Result<TriangleMesh, BooleanError>;
}

/// Ordered chain of boolean backends with per-backend time budgets.
pub struct SubtractChain {
    backends: Vec<Box<dyn BooleanBackend>>,
    budget: Duration,
}

impl Default for SubtractChain {
    fn default() -> Self {
        Self::new(
            vec![
                Box::new(BspBackend::default()),
                Box::new(WeldedBspBackend),
                Box::new(FacetClassifyBackend),
            ],
            DEFAULT_BACKEND_BUDGET,
        )
    }
}

impl SubtractChain {
    /// Creates a chain from an explicit backend list and time budget.
    #[must_use]
    pub fn new(backends: Vec<Box<dyn BooleanBackend>>, budget: Duration) -> Self {
        Self { backends, budget }
    }

    /// Tries each backend in order, returning the first usable result.
    ///
    /// # Errors
    ///
    /// Returns [`BooleanError::Exhausted`] once every backend has failed.
    /// The caller — not the chain — decides to substitute the unmodified
    /// target body.
    pub fn execute(
        &self,
        target: &TriangleMesh,
        cutter: &TriangleMesh,
    ) -> Result<TriangleMesh, BooleanError> {
        let mut last: Option<BooleanError> = None;
        for backend in &self.backends {
            let deadline = Deadline::after(self.budget);
            match backend.subtract(target, cutter, deadline) {
                Ok(result) => {
                    debug!(backend = backend.name(), "boolean subtraction succeeded");
                    return Ok(result);
                }
                Err(err) => {
                    warn!(
                        backend = backend.name(),
                        error = %err,
                        "boolean backend failed, advancing to next"
                    );
                    last = Some(err);
                }
            }
        }
        Err(BooleanError::Exhausted {
            last: last.map_or_else(|| "no backends configured".into(), |e| e.to_string()),
        })
    }
}

/// Converts a triangle mesh into BSP polygons, skipping degenerate facets.
fn mesh_to_polygons(mesh: &TriangleMesh) -> Vec<Polygon> {
    (0..mesh.triangle_count())
        .filter_map(|i| {
            let [a, b, c] = mesh.triangle_vertices(i);
            Polygon::new(vec![a, b, c])
        })
        .collect()
}

/// Fan-triangulates BSP polygons back into a mesh.
fn polygons_to_mesh(polygons: &[Polygon]) -> TriangleMesh {
    let mut mesh = TriangleMesh::default();
    for polygon in polygons {
        for i in 1..polygon.vertices.len() - 1 {
            mesh.push_triangle(
                polygon.vertices[0],
                polygon.vertices[i],
                polygon.vertices[i + 1],
            );
        }
    }
    mesh
}

/// Converts and sanity-checks a backend's polygon output.
fn finish(backend: &'static str, polygons: &[Polygon]) -> Result<TriangleMesh, BooleanError> {
    let mesh = polygons_to_mesh(polygons);
    // A closed solid has at least a tetrahedron's worth of facets.
    if mesh.triangle_count() < 4 || !mesh.is_finite() {
        return Err(BooleanError::InvalidResult { backend });
    }
    Ok(mesh)
}
