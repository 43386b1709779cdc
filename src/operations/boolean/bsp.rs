use super::plane::{Plane, BACK, COPLANAR, FRONT, SPANNING};
use super::polygon::Polygon;
use super::{finish, mesh_to_polygons, BooleanBackend, Deadline};
use crate::error::BooleanError;
use crate::mesh::TriangleMesh;

/// Classification tolerance of the strict BSP pass.
const BSP_EPSILON: f64 = 1e-5;

/// Primary backend: csg.js-style subtraction on BSP trees.
///
/// Fast and exact on well-formed input; near-degenerate facets can make the
/// clipping unstable, which is what the more permissive backends behind it
/// in the chain are for.
#[derive(Debug, Clone, Copy)]
pub struct BspBackend {
    epsilon: f64,
}

impl Default for BspBackend {
    fn default() -> Self {
        Self {
            epsilon: BSP_EPSILON,
        }
    }
}

impl BspBackend {
    /// Creates a BSP backend with a custom classification tolerance.
    #[must_use]
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

impl BooleanBackend for BspBackend {
    fn name(&self) -> &'static str {
        "bsp"
    }

    fn subtract(
        &self,
        target: &TriangleMesh,
        cutter: &TriangleMesh,
        deadline: Deadline,
    ) -> Result<TriangleMesh, BooleanError> {
        bsp_difference(target, cutter, self.epsilon, self.name(), deadline)
    }
}

/// Computes `target - cutter` via BSP clipping.
///
/// Shared by the strict and welded backends, which differ only in input
/// conditioning and epsilon.
pub(super) fn bsp_difference(
    target: &TriangleMesh,
    cutter: &TriangleMesh,
    epsilon: f64,
    backend: &'static str,
    deadline: Deadline,
) -> Result<TriangleMesh, BooleanError> {
    let polys_a = mesh_to_polygons(target);
    let polys_b = mesh_to_polygons(cutter);
    if polys_a.is_empty() || polys_b.is_empty() {
        return Err(BooleanError::Unsupported {
            backend,
            reason: "one of the operands has no usable facets".into(),
        });
    }

    let mut a = BspNode::from_polygons(polys_a, epsilon, backend, deadline)?;
    let mut b = BspNode::from_polygons(polys_b, epsilon, backend, deadline)?;

    // A - B = ~(~A ∪ B): invert A, clip both against each other, drop B's
    // coplanar duplicates, then invert the combined surface back.
    a.invert();
    a.clip_to(&b, epsilon, backend, deadline)?;
    b.clip_to(&a, epsilon, backend, deadline)?;
    b.invert();
    b.clip_to(&a, epsilon, backend, deadline)?;
    b.invert();

    let mut result = a.all_polygons();
    result.extend(b.all_polygons());
    for poly in &mut result {
        poly.flip();
    }
    finish(backend, &result)
}

/// A BSP tree node: a splitting plane, coplanar polygons, and front/back
/// subtrees.
struct BspNode {
    plane: Option<Plane>,
    front: Option<Box<BspNode>>,
    back: Option<Box<BspNode>>,
    polygons: Vec<Polygon>,
}

impl BspNode {
    fn empty() -> Self {
        Self {
            plane: None,
            front: None,
            back: None,
            polygons: Vec::new(),
        }
    }

    fn from_polygons(
        polygons: Vec<Polygon>,
        epsilon: f64,
        backend: &'static str,
        deadline: Deadline,
    ) -> Result<Self, BooleanError> {
        let mut node = Self::empty();
        node.build(polygons, epsilon, backend, deadline)?;
        Ok(node)
    }

    fn build(
        &mut self,
        polygons: Vec<Polygon>,
        epsilon: f64,
        backend: &'static str,
        deadline: Deadline,
    ) -> Result<(), BooleanError> {
        if polygons.is_empty() {
            return Ok(());
        }
        deadline.check(backend)?;

        let plane = match self.plane {
            Some(p) => p,
            None => {
                let p = pick_splitting_plane(&polygons, epsilon);
                self.plane = Some(p);
                p
            }
        };

        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in &polygons {
            let (coplanar_front, coplanar_back, mut f, mut b) = polygon.split(&plane, epsilon);
            self.polygons.extend(coplanar_front);
            self.polygons.extend(coplanar_back);
            front.append(&mut f);
            back.append(&mut b);
        }

        if !front.is_empty() {
            self.front
                .get_or_insert_with(|| Box::new(Self::empty()))
                .build(front, epsilon, backend, deadline)?;
        }
        if !back.is_empty() {
            self.back
                .get_or_insert_with(|| Box::new(Self::empty()))
                .build(back, epsilon, backend, deadline)?;
        }
        Ok(())
    }

    /// Flips every polygon and swaps the half-spaces: the tree now
    /// represents the complement solid.
    fn invert(&mut self) {
        for polygon in &mut self.polygons {
            polygon.flip();
        }
        if let Some(plane) = &mut self.plane {
            plane.flip();
        }
        if let Some(front) = &mut self.front {
            front.invert();
        }
        if let Some(back) = &mut self.back {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Removes the parts of `polygons` inside the solid this tree
    /// represents.
    fn clip_polygons(
        &self,
        polygons: Vec<Polygon>,
        epsilon: f64,
        backend: &'static str,
        deadline: Deadline,
    ) -> Result<Vec<Polygon>, BooleanError> {
        let Some(plane) = self.plane else {
            return Ok(polygons);
        };
        deadline.check(backend)?;

        let mut front = Vec::with_capacity(polygons.len());
        let mut back = Vec::with_capacity(polygons.len());
        for polygon in &polygons {
            let (coplanar_front, coplanar_back, mut f, mut b) = polygon.split(&plane, epsilon);
            // Coplanar pieces follow the side their normal agrees with.
            for coplanar in coplanar_front.into_iter().chain(coplanar_back) {
                if plane.normal.dot(&coplanar.plane.normal) > 0.0 {
                    front.push(coplanar);
                } else {
                    back.push(coplanar);
                }
            }
            front.append(&mut f);
            back.append(&mut b);
        }

        let mut result = if let Some(node) = &self.front {
            node.clip_polygons(front, epsilon, backend, deadline)?
        } else {
            front
        };
        if let Some(node) = &self.back {
            result.extend(node.clip_polygons(back, epsilon, backend, deadline)?);
        }
        // Without a back subtree, back polygons are inside the solid and
        // are discarded.
        Ok(result)
    }

    /// Clips this tree's polygons against another tree.
    fn clip_to(
        &mut self,
        other: &BspNode,
        epsilon: f64,
        backend: &'static str,
        deadline: Deadline,
    ) -> Result<(), BooleanError> {
        self.polygons =
            other.clip_polygons(std::mem::take(&mut self.polygons), epsilon, backend, deadline)?;
        if let Some(front) = &mut self.front {
            front.clip_to(other, epsilon, backend, deadline)?;
        }
        if let Some(back) = &mut self.back {
            back.clip_to(other, epsilon, backend, deadline)?;
        }
        Ok(())
    }

    /// Collects every polygon in the tree, iteratively.
    fn all_polygons(&self) -> Vec<Polygon> {
        let mut result = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            result.extend(node.polygons.iter().cloned());
            if let Some(front) = &node.front {
                stack.push(front);
            }
            if let Some(back) = &node.back {
                stack.push(back);
            }
        }
        result
    }
}

/// Picks a splitting plane from a sample of candidate polygons, scoring by
/// how many polygons it would split and how unbalanced the halves are.
fn pick_splitting_plane(polygons: &[Polygon], epsilon: f64) -> Plane {
    const K_SPANS: f64 = 8.0;
    const K_BALANCE: f64 = 1.0;
    const SAMPLE: usize = 20;

    let mut best_plane = polygons[0].plane;
    let mut best_score = f64::MAX;

    for candidate in polygons.iter().take(SAMPLE) {
        let plane = &candidate.plane;
        let mut num_front: i64 = 0;
        let mut num_back: i64 = 0;
        let mut num_spanning: i64 = 0;

        for polygon in polygons {
            let mut mask = 0u8;
            for vertex in &polygon.vertices {
                mask |= plane.orient_point(vertex, epsilon);
            }
            match mask {
                COPLANAR => {}
                FRONT => num_front += 1,
                BACK => num_back += 1,
                SPANNING => num_spanning += 1,
                _ => num_spanning += 1,
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let score = K_SPANS * num_spanning as f64 + K_BALANCE * (num_front - num_back).abs() as f64;
        if score < best_score {
            best_score = score;
            best_plane = *plane;
        }
    }
    best_plane
}
