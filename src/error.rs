use crate::{Float, Vec3};
use thiserror::Error;

/// Reasons a field integral or drift query could not be evaluated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriftError {
    #[error("column (r={r}, phi={phi}), index ({r_index},{phi_index}), is outside the region of interest")]
    ColumnOutOfBounds {
        r: Float,
        phi: Float,
        r_index: isize,
        phi_index: isize,
    },

    #[error("z span {start_z} to {end_z}, index {start_index} to {end_index}, is outside the region of interest")]
    DepthOutOfBounds {
        start_z: Float,
        end_z: Float,
        start_index: isize,
        end_index: isize,
    },

    #[error("start position {0:?} is outside the region of interest")]
    StartOutsideRoi(Vec3),

    #[error("average longitudinal field along the path vanishes")]
    VanishingField,

    #[error("field map is stale; rerun populate_fieldmap")]
    StaleFieldmap,

    #[error("unit field lookup has not been populated")]
    LookupNotPopulated,

    #[error("drift stopped at step {step} of {steps}, position {position:?}")]
    Stopped {
        step: u32,
        steps: u32,
        position: Vec3,
        #[source]
        cause: Box<DriftError>,
    },
}
