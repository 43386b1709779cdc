pub mod boolean;
mod extrude;
mod position;

pub use extrude::ExtrudeRegion;
pub use position::{PositionCutter, CUTTER_OVERLAP};
