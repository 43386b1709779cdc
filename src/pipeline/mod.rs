//! Single-character engraving pipeline and batch orchestration.
//!
//! Control flow per character: extract outline → resolve region → extrude
//! cutter → position against the target → boolean subtraction → export.
//! Every geometric failure degrades to the unmodified target body; only
//! missing shared resources (font, target body) abort a batch.

use rayon::prelude::*;
use tracing::{debug, error, warn};

use crate::error::{BooleanError, CapcarveError, GeometryError, ResourceError, Result};
use crate::io::stl::write_stl_bytes;
use crate::mesh::{Aabb, TriangleMesh};
use crate::operations::boolean::SubtractChain;
use crate::operations::{ExtrudeRegion, PositionCutter};
use crate::outline::{mirror_contours, GlyphSource};
use crate::region::ResolveRegion;

/// Default text size in millimeters.
pub const DEFAULT_TEXT_SIZE: f64 = 12.0;

/// Default engraving depth in millimeters.
pub const DEFAULT_ENGRAVE_DEPTH: f64 = 0.8;

/// Extra cutter height past the engraving floor (mm), so the prism pierces
/// cleanly instead of ending exactly on the floor plane.
pub const CUTTER_CLEARANCE: f64 = 0.5;

/// Per-character engraving parameters.
#[derive(Debug, Clone)]
pub struct EngraveParams {
    /// Nominal glyph size in millimeters.
    pub text_size: f64,
    /// Engraving depth into the body in millimeters.
    pub engrave_depth: f64,
    /// Manual X centering correction in millimeters.
    pub offset_x: f64,
    /// Manual Y centering correction in millimeters.
    pub offset_y: f64,
    /// Mirror the glyph across the Y axis. On by default: engravings are
    /// cut into the bottom face and viewed from the underside.
    pub mirror_x: bool,
}

impl Default for EngraveParams {
    fn default() -> Self {
        Self {
            text_size: DEFAULT_TEXT_SIZE,
            engrave_depth: DEFAULT_ENGRAVE_DEPTH,
            offset_x: 0.0,
            offset_y: 0.0,
            mirror_x: true,
        }
    }
}

/// Why a character was left unengraved.
#[derive(Debug)]
pub enum DegradeReason {
    /// The character has no glyph outline (space, unmapped code point).
    NoOutline,
    /// Contour, region or extrusion construction failed.
    Geometry(GeometryError),
    /// Every boolean backend failed.
    Boolean(BooleanError),
}

/// Result of a single engraving job.
///
/// The degrade-to-identity policy is an explicit branch: the caller decides
/// what to do with an unmodified body, and tests can assert on the reason.
#[derive(Debug)]
pub enum EngraveOutcome {
    /// The target body with the character cut into it.
    Engraved(TriangleMesh),
    /// Engraving was skipped; the target body is delivered unmodified.
    Unmodified(DegradeReason),
}

/// One entry of a batch request.
#[derive(Debug, Clone)]
pub struct KeycapJob {
    /// Caller-supplied identifier, echoed in the artifact.
    pub id: u32,
    /// Character to engrave.
    pub character: char,
    /// Nominal glyph size in millimeters.
    pub text_size: f64,
    /// Engraving depth override; `None` uses the batch default.
    pub engrave_depth: Option<f64>,
    /// Manual X centering correction in millimeters.
    pub offset_x: f64,
    /// Manual Y centering correction in millimeters.
    pub offset_y: f64,
}

impl KeycapJob {
    /// Creates a job with default size, depth and centering.
    #[must_use]
    pub fn new(id: u32, character: char) -> Self {
        Self {
            id,
            character,
            text_size: DEFAULT_TEXT_SIZE,
            engrave_depth: None,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// A batch of engraving jobs sharing one font and one default depth.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Jobs to run; artifacts come back in the same order.
    pub jobs: Vec<KeycapJob>,
    /// Engraving depth for jobs that do not override it.
    pub engrave_depth: f64,
}

impl BatchRequest {
    /// Creates a batch with the default engraving depth.
    #[must_use]
    pub fn new(jobs: Vec<KeycapJob>) -> Self {
        Self {
            jobs,
            engrave_depth: DEFAULT_ENGRAVE_DEPTH,
        }
    }
}

/// One produced artifact of a batch.
#[derive(Debug, Clone)]
pub struct BatchArtifact {
    /// Identifier of the originating job.
    pub id: u32,
    /// Engraved character.
    pub character: char,
    /// Binary STL bytes: engraved solid, or the base body on degradation.
    pub stl: Vec<u8>,
    /// False when the artifact is the unmodified base body.
    pub engraved: bool,
}

/// Batch-processing context: the target body, its bounds (computed once),
/// and the boolean backend chain.
///
/// Shared resources are passed in explicitly; there is no ambient lookup.
/// The target mesh is read-only, so jobs parallelize without locking.
pub struct Engraver {
    target: TriangleMesh,
    bounds: Aabb,
    chain: SubtractChain,
}

impl Engraver {
    /// Creates an engraver with the default backend chain.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::EmptyTargetBody`] for a mesh without
    /// triangles.
    pub fn new(target: TriangleMesh) -> Result<Self> {
        Self::with_chain(target, SubtractChain::default())
    }

    /// Creates an engraver with an explicit backend chain.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::EmptyTargetBody`] for a mesh without
    /// triangles.
    pub fn with_chain(target: TriangleMesh, chain: SubtractChain) -> Result<Self> {
        let bounds = target
            .bounding_box()
            .ok_or(ResourceError::EmptyTargetBody)?;
        Ok(Self {
            target,
            bounds,
            chain,
        })
    }

    /// The target body this engraver cuts into.
    #[must_use]
    pub fn target(&self) -> &TriangleMesh {
        &self.target
    }

    /// Runs the full pipeline for one character.
    ///
    /// Geometric and boolean failures degrade to
    /// [`EngraveOutcome::Unmodified`]; only resource-class failures and
    /// invalid parameters surface as errors.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NonPositive`] for non-positive size or
    /// depth, and [`ResourceError`] when the glyph source is unusable.
    pub fn engrave(
        &self,
        source: &dyn GlyphSource,
        character: char,
        params: &EngraveParams,
    ) -> Result<EngraveOutcome> {
        validate_params(params)?;

        let mut contours = source.contours(character, params.text_size)?;
        if params.mirror_x {
            mirror_contours(&mut contours);
        }
        if contours.is_empty() {
            debug!(%character, "no outline, skipping engraving");
            return Ok(EngraveOutcome::Unmodified(DegradeReason::NoOutline));
        }

        let Some(region) = ResolveRegion::new(contours).execute() else {
            warn!(%character, "contours resolved to no fillable region");
            return Ok(EngraveOutcome::Unmodified(DegradeReason::Geometry(
                GeometryError::Degenerate("no fillable region in glyph contours".into()),
            )));
        };

        let height = params.engrave_depth + CUTTER_CLEARANCE;
        let cutter = match ExtrudeRegion::new(region, height).execute() {
            Ok(cutter) => cutter,
            Err(CapcarveError::Geometry(err)) => {
                warn!(%character, error = %err, "cutter extrusion failed");
                return Ok(EngraveOutcome::Unmodified(DegradeReason::Geometry(err)));
            }
            Err(other) => return Err(other),
        };

        let placed =
            PositionCutter::new(self.bounds, params.offset_x, params.offset_y).execute(&cutter);

        match self.chain.execute(&self.target, &placed) {
            Ok(solid) => Ok(EngraveOutcome::Engraved(solid)),
            Err(err) => {
                warn!(%character, error = %err, "boolean chain exhausted, returning unengraved body");
                Ok(EngraveOutcome::Unmodified(DegradeReason::Boolean(err)))
            }
        }
    }

    /// Runs the pipeline and serializes the result to binary STL bytes.
    ///
    /// The degraded path exports the target body through the same
    /// serializer, so it is byte-for-byte a direct export.
    ///
    /// # Errors
    ///
    /// Same as [`Engraver::engrave`].
    pub fn engrave_to_stl(
        &self,
        source: &dyn GlyphSource,
        character: char,
        params: &EngraveParams,
    ) -> Result<Vec<u8>> {
        match self.engrave(source, character, params)? {
            EngraveOutcome::Engraved(solid) => write_stl_bytes(&solid),
            EngraveOutcome::Unmodified(_) => write_stl_bytes(&self.target),
        }
    }

    /// Runs a batch of jobs in parallel.
    ///
    /// Jobs are independent: they share only the read-only target body and
    /// glyph source. Jobs that degrade still produce an artifact (the base
    /// body); jobs that error are logged and omitted.
    #[must_use]
    pub fn process_batch(
        &self,
        source: &dyn GlyphSource,
        request: &BatchRequest,
    ) -> Vec<BatchArtifact> {
        request
            .jobs
            .par_iter()
            .filter_map(|job| {
                let params = EngraveParams {
                    text_size: job.text_size,
                    engrave_depth: job.engrave_depth.unwrap_or(request.engrave_depth),
                    offset_x: job.offset_x,
                    offset_y: job.offset_y,
                    ..EngraveParams::default()
                };
                let outcome = match self.engrave(source, job.character, &params) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!(id = job.id, character = %job.character, error = %err, "keycap job failed");
                        return None;
                    }
                };
                let (mesh, engraved) = match &outcome {
                    EngraveOutcome::Engraved(solid) => (solid, true),
                    EngraveOutcome::Unmodified(_) => (&self.target, false),
                };
                match write_stl_bytes(mesh) {
                    Ok(stl) => Some(BatchArtifact {
                        id: job.id,
                        character: job.character,
                        stl,
                        engraved,
                    }),
                    Err(err) => {
                        error!(id = job.id, character = %job.character, error = %err, "artifact serialization failed");
                        None
                    }
                }
            })
            .collect()
    }
}

fn validate_params(params: &EngraveParams) -> Result<()> {
    if params.text_size <= 0.0 {
        return Err(GeometryError::NonPositive {
            parameter: "text_size",
            value: params.text_size,
        }
        .into());
    }
    if params.engrave_depth <= 0.0 {
        return Err(GeometryError::NonPositive {
            parameter: "engrave_depth",
            value: params.engrave_depth,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point2;
    use crate::operations::boolean::DEFAULT_BACKEND_BUDGET;
    use crate::outline::Contour;
    use std::collections::HashMap;

    /// Glyph source backed by hand-built contours in a unit em square.
    struct StencilSource {
        glyphs: HashMap<char, Vec<Contour>>,
    }

    impl StencilSource {
        fn new() -> Self {
            let mut glyphs = HashMap::new();
            // 'o': outer square with a concentric hole.
            glyphs.insert(
                'o',
                vec![
                    unit_ring(&[(0.1, 0.1), (0.9, 0.1), (0.9, 0.9), (0.1, 0.9)]),
                    unit_ring(&[(0.3, 0.3), (0.7, 0.3), (0.7, 0.7), (0.3, 0.7)]),
                ],
            );
            // '5': rectilinear S-shape, concave and X-asymmetric.
            glyphs.insert(
                '5',
                vec![unit_ring(&[
                    (0.1, 1.0),
                    (0.9, 1.0),
                    (0.9, 0.8),
                    (0.3, 0.8),
                    (0.3, 0.6),
                    (0.9, 0.6),
                    (0.9, 0.0),
                    (0.1, 0.0),
                    (0.1, 0.2),
                    (0.7, 0.2),
                    (0.7, 0.4),
                    (0.1, 0.4),
                ])],
            );
            // Space maps to no contours.
            glyphs.insert(' ', vec![]);
            Self { glyphs }
        }
    }

    fn unit_ring(points: &[(f64, f64)]) -> Contour {
        points.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    impl GlyphSource for StencilSource {
        fn contours(&self, character: char, nominal_size: f64) -> Result<Vec<Contour>> {
            Ok(self
                .glyphs
                .get(&character)
                .map(|contours| {
                    contours
                        .iter()
                        .map(|c| {
                            c.iter()
                                .map(|p| Point2::new(p.x * nominal_size, p.y * nominal_size))
                                .collect()
                        })
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    /// 18x18x10 mm rectangular prism with its bottom face at z = 0.
    fn keycap_body() -> TriangleMesh {
        let region = crate::region::GlyphRegion {
            exterior: vec![
                Point2::new(0.0, 0.0),
                Point2::new(18.0, 0.0),
                Point2::new(18.0, 18.0),
                Point2::new(0.0, 18.0),
            ],
            holes: vec![],
        };
        ExtrudeRegion::new(region, 10.0).execute().unwrap()
    }

    fn params() -> EngraveParams {
        EngraveParams {
            text_size: 10.0,
            engrave_depth: 0.8,
            ..EngraveParams::default()
        }
    }

    struct NoGlyphs;

    impl GlyphSource for NoGlyphs {
        fn contours(&self, _character: char, _nominal_size: f64) -> Result<Vec<Contour>> {
            Ok(Vec::new())
        }
    }

    // ── End-to-end ─────────────────────────────────────────────

    #[test]
    fn engraving_keeps_envelope_and_adds_geometry() {
        let engraver = Engraver::new(keycap_body()).unwrap();
        let source = StencilSource::new();

        let outcome = engraver.engrave(&source, '5', &params()).unwrap();
        let EngraveOutcome::Engraved(solid) = outcome else {
            panic!("expected an engraved solid, got {outcome:?}");
        };

        let body_bounds = engraver.target().bounding_box().unwrap();
        let bounds = solid.bounding_box().unwrap();
        assert!((bounds.min - body_bounds.min).norm() < 1e-6);
        assert!((bounds.max - body_bounds.max).norm() < 1e-6);
        assert!(solid.triangle_count() > engraver.target().triangle_count());
    }

    #[test]
    fn glyph_with_hole_engraves() {
        let engraver = Engraver::new(keycap_body()).unwrap();
        let source = StencilSource::new();
        let outcome = engraver.engrave(&source, 'o', &params()).unwrap();
        assert!(matches!(outcome, EngraveOutcome::Engraved(_)));
    }

    #[test]
    fn space_exports_the_body_byte_for_byte() {
        let engraver = Engraver::new(keycap_body()).unwrap();
        let source = StencilSource::new();

        let outcome = engraver.engrave(&source, ' ', &params()).unwrap();
        assert!(matches!(
            outcome,
            EngraveOutcome::Unmodified(DegradeReason::NoOutline)
        ));

        let exported = engraver.engrave_to_stl(&source, ' ', &params()).unwrap();
        let direct = write_stl_bytes(engraver.target()).unwrap();
        assert_eq!(exported, direct);
    }

    #[test]
    fn mirroring_changes_an_asymmetric_glyph() {
        let engraver = Engraver::new(keycap_body()).unwrap();
        let source = StencilSource::new();

        let mirrored = engraver.engrave_to_stl(&source, '5', &params()).unwrap();
        let unmirrored = engraver
            .engrave_to_stl(
                &source,
                '5',
                &EngraveParams {
                    mirror_x: false,
                    ..params()
                },
            )
            .unwrap();
        assert_ne!(mirrored, unmirrored);
    }

    // ── Degradation ────────────────────────────────────────────

    #[test]
    fn exhausted_chain_degrades_to_identity() {
        let engraver = Engraver::with_chain(
            keycap_body(),
            SubtractChain::new(vec![], DEFAULT_BACKEND_BUDGET),
        )
        .unwrap();
        let source = StencilSource::new();

        let outcome = engraver.engrave(&source, '5', &params()).unwrap();
        assert!(matches!(
            outcome,
            EngraveOutcome::Unmodified(DegradeReason::Boolean(_))
        ));

        // The delivered artifact is the body itself.
        let exported = engraver.engrave_to_stl(&source, '5', &params()).unwrap();
        assert_eq!(exported, write_stl_bytes(engraver.target()).unwrap());
    }

    #[test]
    fn degenerate_contours_degrade_to_identity() {
        struct Slivers;
        impl GlyphSource for Slivers {
            fn contours(&self, _c: char, _s: f64) -> Result<Vec<Contour>> {
                Ok(vec![vec![
                    Point2::new(0.0, 0.0),
                    Point2::new(1.0, 0.0),
                ]])
            }
        }
        let engraver = Engraver::new(keycap_body()).unwrap();
        let outcome = engraver.engrave(&Slivers, 'x', &params()).unwrap();
        assert!(matches!(
            outcome,
            EngraveOutcome::Unmodified(DegradeReason::Geometry(_))
        ));
    }

    // ── Parameters & resources ─────────────────────────────────

    #[test]
    fn non_positive_parameters_raise() {
        let engraver = Engraver::new(keycap_body()).unwrap();
        let bad_size = EngraveParams {
            text_size: 0.0,
            ..params()
        };
        assert!(engraver.engrave(&NoGlyphs, 'a', &bad_size).is_err());

        let bad_depth = EngraveParams {
            engrave_depth: -0.5,
            ..params()
        };
        assert!(engraver.engrave(&NoGlyphs, 'a', &bad_depth).is_err());
    }

    #[test]
    fn empty_target_body_is_rejected() {
        assert!(matches!(
            Engraver::new(TriangleMesh::default()),
            Err(CapcarveError::Resource(ResourceError::EmptyTargetBody))
        ));
    }

    // ── Batch ──────────────────────────────────────────────────

    #[test]
    fn batch_isolates_per_job_failures() {
        let engraver = Engraver::new(keycap_body()).unwrap();
        let source = StencilSource::new();

        // Job 2's character has no glyph: its artifact is the base body.
        let request = BatchRequest::new(vec![
            KeycapJob::new(1, 'o'),
            KeycapJob::new(2, '№'),
            KeycapJob::new(3, '5'),
        ]);
        let artifacts = engraver.process_batch(&source, &request);

        assert_eq!(artifacts.len(), 3);
        assert_eq!(artifacts[0].id, 1);
        assert_eq!(artifacts[1].id, 2);
        assert_eq!(artifacts[2].id, 3);
        assert!(artifacts[0].engraved);
        assert!(!artifacts[1].engraved);
        assert!(artifacts[2].engraved);

        let base = write_stl_bytes(engraver.target()).unwrap();
        assert_eq!(artifacts[1].stl, base);
        assert_ne!(artifacts[0].stl, base);
    }

    #[test]
    fn batch_depth_override_is_honored() {
        let engraver = Engraver::new(keycap_body()).unwrap();
        let source = StencilSource::new();

        let mut deep = KeycapJob::new(1, '5');
        deep.engrave_depth = Some(2.0);
        let shallow = KeycapJob::new(2, '5');
        let artifacts = engraver.process_batch(&source, &BatchRequest::new(vec![deep, shallow]));

        assert_eq!(artifacts.len(), 2);
        // Different depths cut different pockets.
        assert_ne!(artifacts[0].stl, artifacts[1].stl);
    }

    #[test]
    fn manual_offset_moves_the_engraving() {
        let engraver = Engraver::new(keycap_body()).unwrap();
        let source = StencilSource::new();

        let centered = engraver.engrave_to_stl(&source, 'o', &params()).unwrap();
        let shifted = engraver
            .engrave_to_stl(
                &source,
                'o',
                &EngraveParams {
                    offset_x: 2.0,
                    offset_y: -1.0,
                    ..params()
                },
            )
            .unwrap();
        assert_ne!(centered, shifted);

        // The offset moves the pocket, not the body envelope.
        let mesh = crate::io::stl::read_stl_bytes(&shifted).unwrap();
        let body = engraver.target().bounding_box().unwrap();
        let bounds = mesh.bounding_box().unwrap();
        assert!((bounds.min - body.min).norm() < 1e-4);
        assert!((bounds.max - body.max).norm() < 1e-4);
    }
}
