use crate::{shape::Edge, Float};

/// Errors surfaced by triangulation operations. All of them are reported
/// synchronously to the caller of the failing operation; there is no
/// retry and no partially constrained mesh on hard errors.
#[derive(thiserror::Error, Debug)]
pub enum TriError {
    #[error("need at least 3 input points, got {0}")]
    TooFewPoints(usize),

    #[error("input point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    #[error("point index {0} is out of range")]
    InvalidPointIndex(usize),

    #[error("constraint edge {constraint:?} crosses constrained edge {crossed:?}")]
    ConstraintsCross { constraint: Edge, crossed: Edge },

    #[error("edge {0:?} is not present in the triangulation")]
    EdgeNotFound(Edge),

    #[error("edge {0:?} cannot be flipped")]
    FlipRejected(Edge),

    #[error("hole seed ({x}, {y}) lies outside the triangulated region")]
    HoleSeedOutside { x: Float, y: Float },

    #[error("hole seed ({x}, {y}) coincides with a mesh vertex or edge")]
    HoleSeedDegenerate { x: Float, y: Float },

    #[error("iteration cap exceeded during {operation}")]
    IterationCapExceeded { operation: &'static str },

    #[error("mesh invariant violated: {detail}")]
    CorruptMesh { detail: &'static str },
}
