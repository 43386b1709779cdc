use super::{Point2, TOLERANCE};

/// Computes the signed area of a closed polygon ring (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise. The ring is
/// implicitly closed: the last point connects back to the first.
#[must_use]
pub fn signed_area(ring: &[Point2]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += ring[i].x * ring[j].y - ring[j].x * ring[i].y;
    }
    sum * 0.5
}

/// Computes the area centroid of a closed polygon ring.
///
/// Falls back to the vertex mean for rings whose enclosed area is below
/// [`TOLERANCE`], where the area-weighted formula is numerically unusable.
#[must_use]
pub fn ring_centroid(ring: &[Point2]) -> Point2 {
    let area = signed_area(ring);
    if area.abs() < TOLERANCE {
        return vertex_mean(ring);
    }
    let n = ring.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let cross = ring[i].x * ring[j].y - ring[j].x * ring[i].y;
        cx += (ring[i].x + ring[j].x) * cross;
        cy += (ring[i].y + ring[j].y) * cross;
    }
    let inv = 1.0 / (6.0 * area);
    Point2::new(cx * inv, cy * inv)
}

/// Proper segment-segment crossing test in 2D.
///
/// Returns true only for transversal crossings; parallel or collinear
/// overlap is not reported.
#[must_use]
pub fn segments_cross(a0: Point2, a1: Point2, b0: Point2, b1: Point2) -> bool {
    let da = a1 - a0;
    let db = b1 - b0;
    let cross = da.x * db.y - da.y * db.x;
    if cross.abs() < TOLERANCE {
        return false;
    }
    let dx = b0.x - a0.x;
    let dy = b0.y - a0.y;
    let t = (dx * db.y - dy * db.x) / cross;
    let u = (dx * da.y - dy * da.x) / cross;
    let eps = TOLERANCE;
    t > eps && t < 1.0 - eps && u > eps && u < 1.0 - eps
}

/// Returns true when no two non-adjacent edges of a closed ring cross.
///
/// Used to reject glyph contours that self-intersect beyond repair before
/// they reach region resolution.
#[must_use]
pub fn ring_is_simple(ring: &[Point2]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        let a0 = ring[i];
        let a1 = ring[(i + 1) % n];
        for j in (i + 1)..n {
            // Edges sharing an endpoint cannot properly cross.
            if j == i || (j + 1) % n == i || (i + 1) % n == j {
                continue;
            }
            let b0 = ring[j];
            let b1 = ring[(j + 1) % n];
            if segments_cross(a0, a1, b0, b1) {
                return false;
            }
        }
    }
    true
}

/// Computes the arithmetic mean of a ring's vertices.
#[must_use]
pub fn vertex_mean(ring: &[Point2]) -> Point2 {
    if ring.is_empty() {
        return Point2::origin();
    }
    #[allow(clippy::cast_precision_loss)]
    let inv_n = 1.0 / ring.len() as f64;
    Point2::new(
        ring.iter().map(|p| p.x).sum::<f64>() * inv_n,
        ring.iter().map(|p| p.y).sum::<f64>() * inv_n,
    )
}
