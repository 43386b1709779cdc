//! Glyph outline extraction.
//!
//! Turns a font resource plus a character into closed polygonal contours in
//! millimeters. Curves are flattened to line segments; the per-contour
//! structure of the font outline is preserved so the region resolver can
//! classify exteriors and holes.

use std::path::Path;

use ttf_parser::OutlineBuilder;

use crate::error::{ResourceError, Result};
use crate::math::{Point2, TOLERANCE};

/// How many line segments approximate each quadratic/cubic Bézier arc.
const CURVE_STEPS: usize = 8;

/// A closed glyph contour: an ordered loop of 2D points in millimeters.
/// The closing edge from the last point back to the first is implicit.
pub type Contour = Vec<Point2>;

/// Source of glyph contours for the engraving pipeline.
///
/// The production implementation is [`FontData`]; tests drive the pipeline
/// with synthetic providers. Implementations must be safe for concurrent
/// read: batch jobs extract in parallel.
pub trait GlyphSource: Sync {
    /// Returns the closed contours of `character`, scaled so the font's em
    /// square maps to `nominal_size` millimeters.
    ///
    /// An empty list means the character has nothing to engrave (space,
    /// unmapped code point, glyph without outline data) and is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] when the font resource itself is unusable.
    fn contours(&self, character: char, nominal_size: f64) -> Result<Vec<Contour>>;
}

/// A parsed font resource, owning its raw bytes.
///
/// Parsing is validated once at construction; extraction re-borrows a
/// zero-copy face per call, so a single `FontData` can be shared read-only
/// across batch workers without locking.
pub struct FontData {
    data: Vec<u8>,
}

impl FontData {
    /// Parses a TrueType/OpenType font from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidFont`] when the bytes are not a
    /// parseable font face.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        ttf_parser::Face::parse(&data, 0)
            .map_err(|e| ResourceError::InvalidFont(e.to_string()))?;
        Ok(Self { data })
    }

    /// Loads and parses a font file.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Io`] when the file cannot be read and
    /// [`ResourceError::InvalidFont`] when it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| ResourceError::Io {
            what: "font file",
            source,
        })?;
        Self::parse(data)
    }

    fn face(&self) -> Result<ttf_parser::Face<'_>> {
        // Validated in `parse`; re-parsing the same bytes cannot fail in
        // practice, but the error is propagated rather than swallowed.
        Ok(ttf_parser::Face::parse(&self.data, 0)
            .map_err(|e| ResourceError::InvalidFont(e.to_string()))?)
    }
}

impl GlyphSource for FontData {
    fn contours(&self, character: char, nominal_size: f64) -> Result<Vec<Contour>> {
        let face = self.face()?;
        let Some(glyph) = face.glyph_index(character) else {
            return Ok(Vec::new());
        };
        let scale = nominal_size / f64::from(face.units_per_em());
        let mut flattener = OutlineFlattener::new(scale);
        // `outline_glyph` only ever yields vector outline data; a glyph
        // without outlines (space, bitmap-only face) returns None and is
        // treated as "nothing to engrave".
        if face.outline_glyph(glyph, &mut flattener).is_none() {
            return Ok(Vec::new());
        }
        Ok(flattener.into_contours())
    }
}

/// Mirrors contours across the Y axis (`x → -x`).
///
/// Used for underside engraving, where text must read correctly when the
/// printed part is viewed from below. Mirroring happens on contours, before
/// resolution and extrusion: mirroring a finished closed solid would invert
/// its face winding.
pub fn mirror_contours(contours: &mut [Contour]) {
    for contour in contours.iter_mut() {
        for point in contour.iter_mut() {
            point.x = -point.x;
        }
    }
}

/// Receives `MoveTo`/`LineTo`/`QuadTo`/`CurveTo`/`Close` calls from
/// `ttf-parser` and accumulates flattened, closed contours.
///
/// A `move_to` while a subpath is still open discards the unterminated
/// subpath (open contours cannot be filled). Contours with fewer than 3
/// points after flattening are dropped.
struct OutlineFlattener {
    scale: f64,
    contours: Vec<Contour>,
    current: Contour,
    last: Point2,
}

impl OutlineFlattener {
    fn new(scale: f64) -> Self {
        Self {
            scale,
            contours: Vec::new(),
            current: Vec::new(),
            last: Point2::origin(),
        }
    }

    fn into_contours(self) -> Vec<Contour> {
        // Any still-open subpath is degenerate and discarded.
        self.contours
    }

    fn scaled(&self, x: f32, y: f32) -> Point2 {
        Point2::new(f64::from(x) * self.scale, f64::from(y) * self.scale)
    }

    /// Appends a point, skipping consecutive duplicates.
    fn push(&mut self, point: Point2) {
        let duplicate = self
            .current
            .last()
            .is_some_and(|prev| (prev - point).norm() < TOLERANCE);
        if !duplicate {
            self.current.push(point);
        }
        self.last = point;
    }

    fn sample_quad(&mut self, c: Point2, end: Point2) {
        let start = self.last;
        for i in 1..=CURVE_STEPS {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / CURVE_STEPS as f64;
            let mt = 1.0 - t;
            let x = mt * mt * start.x + 2.0 * mt * t * c.x + t * t * end.x;
            let y = mt * mt * start.y + 2.0 * mt * t * c.y + t * t * end.y;
            self.push(Point2::new(x, y));
        }
    }

    fn sample_cubic(&mut self, c1: Point2, c2: Point2, end: Point2) {
        let start = self.last;
        for i in 1..=CURVE_STEPS {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / CURVE_STEPS as f64;
            let mt = 1.0 - t;
            let mt2 = mt * mt;
            let t2 = t * t;
            let x = mt2 * mt * start.x
                + 3.0 * mt2 * t * c1.x
                + 3.0 * mt * t2 * c2.x
                + t2 * t * end.x;
            let y = mt2 * mt * start.y
                + 3.0 * mt2 * t * c1.y
                + 3.0 * mt * t2 * c2.y
                + t2 * t * end.y;
            self.push(Point2::new(x, y));
        }
    }
}

impl OutlineBuilder for OutlineFlattener {
    fn move_to(&mut self, x: f32, y: f32) {
        self.current.clear();
        let p = self.scaled(x, y);
        self.current.push(p);
        self.last = p;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.scaled(x, y);
        self.push(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let c = self.scaled(x1, y1);
        let end = self.scaled(x, y);
        self.sample_quad(c, end);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let c1 = self.scaled(x1, y1);
        let c2 = self.scaled(x2, y2);
        let end = self.scaled(x, y);
        self.sample_cubic(c1, c2, end);
    }

    fn close(&mut self) {
        // The closing edge is implicit; drop an explicit trailing duplicate
        // of the start point if the font emitted one.
        if self.current.len() >= 2 {
            let first = self.current[0];
            let last_idx = self.current.len() - 1;
            if (self.current[last_idx] - first).norm() < TOLERANCE {
                self.current.pop();
            }
        }
        if self.current.len() >= 3 {
            self.contours.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flattener_splits_contours_on_close() {
        let mut f = OutlineFlattener::new(1.0);
        f.move_to(0.0, 0.0);
        f.line_to(10.0, 0.0);
        f.line_to(10.0, 10.0);
        f.close();
        f.move_to(2.0, 2.0);
        f.line_to(8.0, 2.0);
        f.line_to(8.0, 8.0);
        f.line_to(2.0, 8.0);
        f.close();

        let contours = f.into_contours();
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].len(), 3);
        assert_eq!(contours[1].len(), 4);
    }

    #[test]
    fn flattener_drops_short_contours() {
        let mut f = OutlineFlattener::new(1.0);
        f.move_to(0.0, 0.0);
        f.line_to(1.0, 0.0);
        f.close();
        assert!(f.into_contours().is_empty());
    }

    #[test]
    fn flattener_discards_unterminated_subpath() {
        let mut f = OutlineFlattener::new(1.0);
        f.move_to(0.0, 0.0);
        f.line_to(1.0, 0.0);
        f.line_to(1.0, 1.0);
        // no close(): a new move_to abandons the open subpath
        f.move_to(5.0, 5.0);
        f.line_to(6.0, 5.0);
        f.line_to(6.0, 6.0);
        f.close();

        let contours = f.into_contours();
        assert_eq!(contours.len(), 1);
        assert!((contours[0][0].x - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn flattener_scales_coordinates() {
        let mut f = OutlineFlattener::new(0.5);
        f.move_to(0.0, 0.0);
        f.line_to(10.0, 0.0);
        f.line_to(10.0, 4.0);
        f.close();

        let contours = f.into_contours();
        assert!((contours[0][1].x - 5.0).abs() < TOLERANCE);
        assert!((contours[0][2].y - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn flattener_samples_quadratic_curves() {
        let mut f = OutlineFlattener::new(1.0);
        f.move_to(0.0, 0.0);
        f.quad_to(5.0, 10.0, 10.0, 0.0);
        f.line_to(5.0, -2.0);
        f.close();

        let contours = f.into_contours();
        // start + CURVE_STEPS curve samples + 1 line point
        assert_eq!(contours[0].len(), 2 + CURVE_STEPS);
        // curve midpoint of B(0.5) = (5, 5)
        let mid = contours[0][CURVE_STEPS / 2];
        assert!((mid.x - 5.0).abs() < TOLERANCE);
        assert!((mid.y - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn flattener_strips_explicit_closing_point() {
        let mut f = OutlineFlattener::new(1.0);
        f.move_to(0.0, 0.0);
        f.line_to(4.0, 0.0);
        f.line_to(4.0, 4.0);
        f.line_to(0.0, 0.0);
        f.close();

        let contours = f.into_contours();
        assert_eq!(contours[0].len(), 3);
    }

    #[test]
    fn mirror_negates_x_only() {
        let mut contours = vec![vec![
            Point2::new(1.0, 2.0),
            Point2::new(-3.0, 4.0),
            Point2::new(0.5, -1.0),
        ]];
        mirror_contours(&mut contours);
        assert!((contours[0][0].x + 1.0).abs() < TOLERANCE);
        assert!((contours[0][0].y - 2.0).abs() < TOLERANCE);
        assert!((contours[0][1].x - 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(FontData::parse(vec![0, 1, 2, 3]).is_err());
    }
}
