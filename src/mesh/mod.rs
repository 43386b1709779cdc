//! Indexed triangle meshes and their queries.

use crate::math::{Point3, Vector3, TOLERANCE};

/// A solid represented as an indexed triangle mesh.
///
/// Triangles are wound counter-clockwise as seen from outside the solid.
/// Vertices are not deduplicated; every triangle owns its three corners.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangle indices (each triple defines a triangle).
    pub triangles: Vec<[u32; 3]>,
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Returns the center point of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }
}

impl TriangleMesh {
    /// Returns true when the mesh contains no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of triangles in the mesh.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Appends a triangle, adding its three corners as new vertices.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_triangle(&mut self, a: Point3, b: Point3, c: Point3) {
        let base = self.vertices.len() as u32;
        self.vertices.push(a);
        self.vertices.push(b);
        self.vertices.push(c);
        self.triangles.push([base, base + 1, base + 2]);
    }

    /// Returns the corner positions of triangle `index`.
    #[must_use]
    pub fn triangle_vertices(&self, index: usize) -> [Point3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Computes the outward facet normal of triangle `index`.
    ///
    /// Degenerate triangles yield the zero vector.
    #[must_use]
    pub fn facet_normal(&self, index: usize) -> Vector3 {
        let [a, b, c] = self.triangle_vertices(index);
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len < TOLERANCE {
            Vector3::zeros()
        } else {
            n / len
        }
    }

    /// Computes the axis-aligned bounding box, or `None` for an empty mesh.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Aabb> {
        if self.vertices.is_empty() {
            return None;
        }
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &self.vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }
        Some(Aabb { min, max })
    }

    /// Returns a copy of the mesh translated by `displacement`.
    #[must_use]
    pub fn translated(&self, displacement: Vector3) -> Self {
        Self {
            vertices: self.vertices.iter().map(|v| v + displacement).collect(),
            triangles: self.triangles.clone(),
        }
    }

    /// Returns true when every coordinate is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite() && v.z.is_finite())
    }
}
