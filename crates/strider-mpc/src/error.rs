//! Error types for tube construction, predictive control and preview
//! buffering.

use std::fmt;

use strider_contact::ContactError;

/// Stage of the tube computation, named after its timing key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TubeStage {
    PrimalVrep,
    PrimalHrep,
    DualVrep,
    DualHrep,
}

impl TubeStage {
    /// Key under which the stage duration is reported.
    pub const fn metric_name(self) -> &'static str {
        match self {
            Self::PrimalVrep => "tube_primal_vrep",
            Self::PrimalHrep => "tube_primal_hrep",
            Self::DualVrep => "tube_dual_vrep",
            Self::DualHrep => "tube_dual_hrep",
        }
    }
}

impl fmt::Display for TubeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric_name())
    }
}

/// Errors of the tube builder and the predictive controller.
#[derive(Debug, thiserror::Error)]
pub enum MpcError {
    #[error("Invalid preview horizon: {0} s (must be > 0)")]
    InvalidHorizon(f64),

    #[error("Invalid number of preview steps: {0} (must be >= 1)")]
    InvalidSteps(usize),

    /// A tube stage was queried before it was computed.
    #[error("Tube stage {0} has not been computed")]
    TubeNotReady(TubeStage),

    #[error("Tube stage {stage} failed: {source}")]
    Tube {
        stage: TubeStage,
        source: ContactError,
    },

    /// The constraint set admits no control sequence.
    #[error("QP infeasible: {0}")]
    Infeasible(String),

    #[error("QP solver failure: {0}")]
    Solver(String),

    #[error(transparent)]
    Preview(#[from] PreviewError),
}

impl MpcError {
    pub(crate) fn tube(stage: TubeStage, source: impl Into<ContactError>) -> Self {
        Self::Tube {
            stage,
            source: source.into(),
        }
    }
}

/// Errors of the preview buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    #[error("Preview length mismatch: {controls} controls for {durations} durations")]
    LengthMismatch { controls: usize, durations: usize },

    #[error("Switch step {switch_step} outside preview of {len} steps")]
    SwitchStepOutOfRange { switch_step: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_geometry::GeometryError;

    #[test]
    fn stage_names_match_metric_keys() {
        assert_eq!(TubeStage::PrimalVrep.to_string(), "tube_primal_vrep");
        assert_eq!(TubeStage::DualHrep.metric_name(), "tube_dual_hrep");
    }

    #[test]
    fn tube_error_wraps_geometry_failures() {
        let err = MpcError::tube(
            TubeStage::PrimalHrep,
            GeometryError::Degenerate("vertices are coplanar".into()),
        );
        assert!(matches!(
            err,
            MpcError::Tube {
                stage: TubeStage::PrimalHrep,
                ..
            }
        ));
        assert!(err.to_string().contains("coplanar"));
    }

    #[test]
    fn preview_errors_convert() {
        let err: MpcError = PreviewError::LengthMismatch {
            controls: 3,
            durations: 2,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Preview length mismatch: 3 controls for 2 durations"
        );
    }
}
