use crate::math::{Point3, Vector3, TOLERANCE};

/// Bitmask classification relative to a plane.
pub(super) const COPLANAR: u8 = 0;
pub(super) const FRONT: u8 = 1;
pub(super) const BACK: u8 = 2;
pub(super) const SPANNING: u8 = 3;

/// An oriented plane `normal · p = w`.
#[derive(Debug, Clone, Copy)]
pub(super) struct Plane {
    pub normal: Vector3,
    pub w: f64,
}

impl Plane {
    /// Computes a polygon's plane using Newell's method, which stays robust
    /// for slightly non-planar or near-degenerate loops.
    ///
    /// Returns `None` when the loop encloses no area.
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let n = points.len();
        if n < 3 {
            return None;
        }
        let mut normal = Vector3::zeros();
        for i in 0..n {
            let curr = &points[i];
            let next = &points[(i + 1) % n];
            normal.x += (curr.y - next.y) * (curr.z + next.z);
            normal.y += (curr.z - next.z) * (curr.x + next.x);
            normal.z += (curr.x - next.x) * (curr.y + next.y);
        }
        let len = normal.norm();
        if len < TOLERANCE {
            return None;
        }
        let normal = normal / len;
        Some(Self {
            w: normal.dot(&points[0].coords),
            normal,
        })
    }

    /// Reverses the plane's orientation.
    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Signed distance from `point` to the plane (positive in front).
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        self.normal.dot(&point.coords) - self.w
    }

    /// Classifies a point as [`FRONT`], [`BACK`] or [`COPLANAR`] within
    /// `epsilon`.
    pub fn orient_point(&self, point: &Point3, epsilon: f64) -> u8 {
        let dist = self.signed_distance(point);
        if dist > epsilon {
            FRONT
        } else if dist < -epsilon {
            BACK
        } else {
            COPLANAR
        }
    }
}
