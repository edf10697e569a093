use thiserror::Error;

/// Geometry kernel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    #[error("Empty polygon intersection")]
    EmptyIntersection,

    #[error("Infeasible projection program: {0}")]
    Infeasible(String),

    #[error("LP solver failure: {0}")]
    Solver(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
