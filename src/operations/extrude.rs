use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::FixedFaceHandle;
use spade::{
    ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation,
};

use crate::error::{GeometryError, Result};
use crate::math::{polygon_2d, Point2, Point3};
use crate::mesh::TriangleMesh;
use crate::region::GlyphRegion;

/// Extrudes a filled region into a closed prism of the given height.
///
/// The region is first centered on the centroid of its exterior ring, so
/// every cutter is produced in a consistent local frame regardless of
/// font-specific side-bearing offsets. The prism spans `z ∈ [0, height]`:
/// a bottom cap facing -Z, a top cap facing +Z, and walls connecting the
/// boundary edges. Hole walls face into the hole cavity.
pub struct ExtrudeRegion {
    region: GlyphRegion,
    height: f64,
}

impl ExtrudeRegion {
    /// Creates a new `ExtrudeRegion` operation.
    #[must_use]
    pub fn new(region: GlyphRegion, height: f64) -> Self {
        Self { region, height }
    }

    /// Executes the extrusion, returning the prism mesh.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NonPositive`] for a non-positive height and
    /// [`GeometryError::Triangulation`] when the region cannot be
    /// triangulated. Both are recoverable: callers treat them like
    /// "no region".
    pub fn execute(&self) -> Result<TriangleMesh> {
        if self.height <= 0.0 {
            return Err(GeometryError::NonPositive {
                parameter: "height",
                value: self.height,
            }
            .into());
        }

        // Center on the exterior ring's centroid (translation only).
        let centroid = polygon_2d::ring_centroid(&self.region.exterior);
        let mut exterior = recentered(&self.region.exterior, centroid);
        let mut holes: Vec<Vec<Point2>> = self
            .region
            .holes
            .iter()
            .map(|h| recentered(h, centroid))
            .collect();

        // Wall generation below relies on exterior CCW / holes CW.
        if polygon_2d::signed_area(&exterior) < 0.0 {
            exterior.reverse();
        }
        for hole in &mut holes {
            if polygon_2d::signed_area(hole) > 0.0 {
                hole.reverse();
            }
        }

        let mut mesh = TriangleMesh::default();
        self.build_caps(&exterior, &holes, &mut mesh)?;
        for ring in std::iter::once(&exterior).chain(holes.iter()) {
            self.build_walls(ring, &mut mesh);
        }
        Ok(mesh)
    }

    /// Triangulates the region via CDT and emits the bottom and top caps.
    fn build_caps(
        &self,
        exterior: &[Point2],
        holes: &[Vec<Point2>],
        mesh: &mut TriangleMesh,
    ) -> Result<()> {
        let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
        insert_constraint_loop(&mut cdt, exterior)?;
        for hole in holes {
            insert_constraint_loop(&mut cdt, hole)?;
        }

        let interior = classify_interior_faces(&cdt);
        let mut emitted = false;
        for face in cdt.inner_faces() {
            if !interior.contains(&face.fix().index()) {
                continue;
            }
            let [a, b, c] = face.vertices().map(|v| {
                let pos = v.position();
                Point2::new(pos.x, pos.y)
            });
            // Bottom cap faces -Z: reversed winding.
            mesh.push_triangle(lift(a, 0.0), lift(c, 0.0), lift(b, 0.0));
            mesh.push_triangle(
                lift(a, self.height),
                lift(b, self.height),
                lift(c, self.height),
            );
            emitted = true;
        }
        if emitted {
            Ok(())
        } else {
            Err(GeometryError::Triangulation("region has no interior triangles".into()).into())
        }
    }

    /// Emits two wall triangles per boundary edge of a ring.
    ///
    /// With the exterior wound CCW and holes CW, the same construction makes
    /// exterior walls face outward and hole walls face into the cavity.
    fn build_walls(&self, ring: &[Point2], mesh: &mut TriangleMesh) {
        let n = ring.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let bottom_i = lift(ring[i], 0.0);
            let bottom_j = lift(ring[j], 0.0);
            let top_i = lift(ring[i], self.height);
            let top_j = lift(ring[j], self.height);
            mesh.push_triangle(bottom_i, bottom_j, top_j);
            mesh.push_triangle(bottom_i, top_j, top_i);
        }
    }
}

fn lift(p: Point2, z: f64) -> Point3 {
    Point3::new(p.x, p.y, z)
}

fn recentered(ring: &[Point2], offset: Point2) -> Vec<Point2> {
    ring.iter()
        .map(|p| Point2::new(p.x - offset.x, p.y - offset.y))
        .collect()
}

/// Inserts a closed polygon as constraint edges into the CDT.
fn insert_constraint_loop(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    ring: &[Point2],
) -> Result<()> {
    if ring.len() < 3 {
        return Err(
            GeometryError::Triangulation("constraint loop needs at least 3 points".into()).into(),
        );
    }

    let mut handles = Vec::with_capacity(ring.len());
    for point in ring {
        let h = cdt
            .insert(SpadePoint2::new(point.x, point.y))
            .map_err(|e: InsertionError| {
                GeometryError::Triangulation(format!("CDT insert: {e}"))
            })?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to {
            cdt.add_constraint(from, to);
        }
    }

    Ok(())
}

/// Classifies which inner faces of the CDT are inside the region using
/// flood-fill.
///
/// Starts from faces adjacent to the outer (infinite) face at depth 0. Each
/// time a constraint edge is crossed, depth increments. Odd depth =
/// interior, so hole interiors (depth 2) are excluded.
fn classify_interior_faces(
    cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<spade::handles::InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    // Seed: inner faces adjacent to the outer face via directed edges.
    for edge in cdt.directed_edges() {
        if edge.face().fix() == outer_fix {
            let rev_face = edge.rev().face();
            if let Some(inner) = rev_face.as_inner() {
                let idx = inner.fix().index();
                if depth_map.contains_key(&idx) {
                    continue;
                }
                let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(idx, depth);
                if depth % 2 == 1 {
                    interior.insert(idx);
                }
                queue.push_back((inner.fix(), depth));
            }
        }
    }

    // BFS flood-fill.
    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            let neighbor = edge.rev().face();
            if let Some(inner_neighbor) = neighbor.as_inner() {
                let n_idx = inner_neighbor.fix().index();
                if depth_map.contains_key(&n_idx) {
                    continue;
                }
                let new_depth = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                    depth + 1
                } else {
                    depth
                };
                depth_map.insert(n_idx, new_depth);
                if new_depth % 2 == 1 {
                    interior.insert(n_idx);
                }
                queue.push_back((inner_neighbor.fix(), new_depth));
            }
        }
    }

    interior
}
