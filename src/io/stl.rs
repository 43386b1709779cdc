//! Binary STL interchange.
//!
//! Pure serialization: no geometric decisions happen here. The format is
//! the standard binary triangle soup — 80-byte header, 4-byte triangle
//! count, then 50 bytes per facet (normal + 3 vertices as 32-bit floats
//! plus a 2-byte attribute field) — which downstream 3D-printing tools
//! accept as-is. ASCII STL is deliberately not supported.

use std::io::Cursor;
use std::path::Path;

use stl_io::{Normal, Triangle, Vertex};

use crate::error::{ResourceError, Result};
use crate::math::Point3;
use crate::mesh::TriangleMesh;

/// Serializes a mesh to binary STL bytes.
///
/// # Errors
///
/// Returns [`ResourceError::Io`] if encoding fails (it cannot in practice
/// when writing to memory, but the writer interface is fallible).
#[allow(clippy::cast_possible_truncation)]
pub fn write_stl_bytes(mesh: &TriangleMesh) -> Result<Vec<u8>> {
    let mut facets = Vec::with_capacity(mesh.triangle_count());
    for i in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.triangle_vertices(i);
        let normal = mesh.facet_normal(i);
        facets.push(Triangle {
            normal: Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
            vertices: [to_vertex(a), to_vertex(b), to_vertex(c)],
        });
    }

    let mut cursor = Cursor::new(Vec::new());
    stl_io::write_stl(&mut cursor, facets.iter()).map_err(|source| ResourceError::Io {
        what: "STL output buffer",
        source,
    })?;
    Ok(cursor.into_inner())
}

/// Parses binary (or ASCII) STL bytes into a mesh.
///
/// # Errors
///
/// Returns [`ResourceError::Io`] for malformed data and
/// [`ResourceError::EmptyTargetBody`] when the file holds no triangles.
pub fn read_stl_bytes(bytes: &[u8]) -> Result<TriangleMesh> {
    let mut cursor = Cursor::new(bytes);
    let reader = stl_io::create_stl_reader(&mut cursor).map_err(|source| ResourceError::Io {
        what: "STL data",
        source,
    })?;

    let mut mesh = TriangleMesh::default();
    for facet in reader {
        let facet = facet.map_err(|source| ResourceError::Io {
            what: "STL facet",
            source,
        })?;
        mesh.push_triangle(
            from_vertex(&facet.vertices[0]),
            from_vertex(&facet.vertices[1]),
            from_vertex(&facet.vertices[2]),
        );
    }
    if mesh.is_empty() {
        return Err(ResourceError::EmptyTargetBody.into());
    }
    Ok(mesh)
}

/// Loads an STL file from disk.
///
/// # Errors
///
/// Returns [`ResourceError::Io`] when the file cannot be read or parsed.
pub fn load_stl(path: &Path) -> Result<TriangleMesh> {
    let bytes = std::fs::read(path).map_err(|source| ResourceError::Io {
        what: "STL file",
        source,
    })?;
    read_stl_bytes(&bytes)
}

#[allow(clippy::cast_possible_truncation)]
fn to_vertex(p: Point3) -> Vertex {
    Vertex::new([p.x as f32, p.y as f32, p.z as f32])
}

fn from_vertex(v: &Vertex) -> Point3 {
    Point3::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn sample_mesh() -> TriangleMesh {
        let mut mesh = TriangleMesh::default();
        mesh.push_triangle(p(0.0, 0.0, 0.0), p(4.0, 0.0, 0.0), p(0.0, 3.0, 0.0));
        mesh.push_triangle(p(0.0, 0.0, 2.0), p(4.0, 0.0, 2.0), p(0.0, 3.0, 2.0));
        mesh
    }

    #[test]
    fn binary_layout_matches_the_format() {
        let bytes = write_stl_bytes(&sample_mesh()).unwrap();
        // 80-byte header + 4-byte count + 50 bytes per facet.
        assert_eq!(bytes.len(), 80 + 4 + 2 * 50);
        let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]);
        assert_eq!(count, 2);
    }

    #[test]
    fn round_trip_preserves_counts_and_bounds() {
        let mesh = sample_mesh();
        let bytes = write_stl_bytes(&mesh).unwrap();
        let parsed = read_stl_bytes(&bytes).unwrap();

        assert_eq!(parsed.triangle_count(), mesh.triangle_count());
        let (a, b) = (
            mesh.bounding_box().unwrap(),
            parsed.bounding_box().unwrap(),
        );
        assert!((a.min - b.min).norm() < 1e-6);
        assert!((a.max - b.max).norm() < 1e-6);
    }

    #[test]
    fn export_is_deterministic() {
        let mesh = sample_mesh();
        assert_eq!(
            write_stl_bytes(&mesh).unwrap(),
            write_stl_bytes(&mesh).unwrap()
        );
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(read_stl_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn empty_solid_is_rejected() {
        let bytes = write_stl_bytes(&TriangleMesh::default()).unwrap();
        assert!(matches!(
            read_stl_bytes(&bytes),
            Err(crate::error::CapcarveError::Resource(
                ResourceError::EmptyTargetBody
            ))
        ));
    }
}
