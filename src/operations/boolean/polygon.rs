use super::plane::{Plane, BACK, COPLANAR, FRONT, SPANNING};
use crate::math::Point3;

/// A planar n-gon used inside the BSP backends.
///
/// Starts out as a mesh triangle and may gain vertices as splitting planes
/// cut it.
#[derive(Debug, Clone)]
pub(super) struct Polygon {
    pub vertices: Vec<Point3>,
    pub plane: Plane,
}

impl Polygon {
    /// Builds a polygon from a vertex loop; `None` when degenerate.
    pub fn new(vertices: Vec<Point3>) -> Option<Self> {
        let plane = Plane::from_points(&vertices)?;
        Some(Self { vertices, plane })
    }

    /// Reverses the polygon's orientation.
    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }

    /// Splits this polygon by `plane` into coplanar-front, coplanar-back,
    /// front and back parts (csg.js classification).
    ///
    /// Split parts inherit this polygon's plane: they remain coplanar with
    /// it, and re-deriving a plane from a sliver part would be less exact.
    pub fn split(
        &self,
        plane: &Plane,
        epsilon: f64,
    ) -> (Vec<Polygon>, Vec<Polygon>, Vec<Polygon>, Vec<Polygon>) {
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        let mut front = Vec::new();
        let mut back = Vec::new();

        let mut polygon_type = 0u8;
        let types: Vec<u8> = self
            .vertices
            .iter()
            .map(|v| {
                let t = plane.orient_point(v, epsilon);
                polygon_type |= t;
                t
            })
            .collect();

        match polygon_type {
            COPLANAR => {
                if plane.normal.dot(&self.plane.normal) > 0.0 {
                    coplanar_front.push(self.clone());
                } else {
                    coplanar_back.push(self.clone());
                }
            }
            FRONT => front.push(self.clone()),
            BACK => back.push(self.clone()),
            _ => {
                let n = self.vertices.len();
                let mut f: Vec<Point3> = Vec::with_capacity(n + 1);
                let mut b: Vec<Point3> = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let ti = types[i];
                    let tj = types[j];
                    let vi = self.vertices[i];
                    let vj = self.vertices[j];
                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if (ti | tj) == SPANNING {
                        let edge = vj - vi;
                        let denom = plane.normal.dot(&edge);
                        if denom.abs() > f64::EPSILON {
                            let t = (plane.w - plane.normal.dot(&vi.coords)) / denom;
                            let v = vi + edge * t;
                            f.push(v);
                            b.push(v);
                        }
                    }
                }
                if f.len() >= 3 {
                    front.push(Polygon {
                        vertices: f,
                        plane: self.plane,
                    });
                }
                if b.len() >= 3 {
                    back.push(Polygon {
                        vertices: b,
                        plane: self.plane,
                    });
                }
            }
        }

        (coplanar_front, coplanar_back, front, back)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::TOLERANCE;

    const EPS: f64 = 1e-5;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn unit_square(z: f64) -> Polygon {
        Polygon::new(vec![
            p(0.0, 0.0, z),
            p(1.0, 0.0, z),
            p(1.0, 1.0, z),
            p(0.0, 1.0, z),
        ])
        .unwrap()
    }

    fn xz_plane_at(x: f64) -> Plane {
        Plane::from_points(&[p(x, 0.0, 0.0), p(x, 1.0, 0.0), p(x, 0.0, 1.0)]).unwrap()
    }

    #[test]
    fn polygon_entirely_in_front() {
        let poly = unit_square(0.0);
        let plane = xz_plane_at(-1.0);
        let (cf, cb, f, b) = poly.split(&plane, EPS);
        assert!(cf.is_empty() && cb.is_empty() && b.is_empty());
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn spanning_polygon_is_split_in_two() {
        let poly = unit_square(0.0);
        let plane = xz_plane_at(0.5);
        let (cf, cb, f, b) = poly.split(&plane, EPS);
        assert!(cf.is_empty() && cb.is_empty());
        assert_eq!(f.len(), 1);
        assert_eq!(b.len(), 1);
        // Both halves keep the original plane.
        assert!((f[0].plane.normal.z - 1.0).abs() < TOLERANCE);
        assert_eq!(f[0].vertices.len(), 4);
        assert_eq!(b[0].vertices.len(), 4);
    }

    #[test]
    fn coplanar_polygon_sorted_by_normal() {
        let poly = unit_square(0.0);
        let plane = poly.plane;
        let (cf, cb, _, _) = poly.split(&plane, EPS);
        assert_eq!(cf.len(), 1);
        assert!(cb.is_empty());

        let mut flipped = unit_square(0.0);
        flipped.flip();
        let (cf, cb, _, _) = flipped.split(&plane, EPS);
        assert!(cf.is_empty());
        assert_eq!(cb.len(), 1);
    }

    #[test]
    fn flip_reverses_normal() {
        let mut poly = unit_square(0.0);
        poly.flip();
        assert!((poly.plane.normal.z + 1.0).abs() < TOLERANCE);
    }
}
