use thiserror::Error;

/// Top-level error type for the capcarve engraving kernel.
#[derive(Debug, Error)]
pub enum CapcarveError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Boolean(#[from] BooleanError),
}

/// Errors loading shared batch resources (font, target body).
///
/// These are fatal for a whole batch: without the font or the target body
/// there is nothing to engrave into. Per-character geometric failures never
/// surface through this type.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to read {what}: {source}")]
    Io {
        what: &'static str,
        source: std::io::Error,
    },

    #[error("font data is not a parseable TrueType/OpenType face: {0}")]
    InvalidFont(String),

    #[error("target body mesh contains no triangles")]
    EmptyTargetBody,
}

/// Errors in 2D/3D geometry construction. Recoverable per character.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} must be strictly positive")]
    NonPositive { parameter: &'static str, value: f64 },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("triangulation failed: {0}")]
    Triangulation(String),
}

/// Errors from a single boolean backend. Recoverable per character: the
/// subtraction chain advances to the next backend, and the pipeline falls
/// back to the unmodified target body once the chain is exhausted.
#[derive(Debug, Error)]
pub enum BooleanError {
    #[error("backend {backend} cannot handle this input: {reason}")]
    Unsupported {
        backend: &'static str,
        reason: String,
    },

    #[error("backend {backend} exceeded its time budget")]
    Timeout { backend: &'static str },

    #[error("backend {backend} produced an empty or non-finite result")]
    InvalidResult { backend: &'static str },

    #[error("all boolean backends failed; last error: {last}")]
    Exhausted { last: String },
}

/// Convenience type alias for results using [`CapcarveError`].
pub type Result<T> = std::result::Result<T, CapcarveError>;
