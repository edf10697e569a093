//! Error types for contacts and stance sequences.

use std::path::PathBuf;

use strider_geometry::GeometryError;

use crate::stance::{FootSlot, StanceLabel};

/// Errors raised while building contacts, stances and stance sequences.
#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    /// Rectangle half-extents must be positive and finite.
    #[error("Invalid contact shape: half-extents ({0}, {1}) must be > 0")]
    InvalidShape(f64, f64),

    #[error("Invalid friction coefficient: {0} (must be > 0)")]
    InvalidFriction(f64),

    #[error("Invalid contact pose: {0}")]
    InvalidPose(String),

    /// The label requires a contact in this slot.
    #[error("Stance {label} requires a {slot} foot contact")]
    MissingContact { label: StanceLabel, slot: FootSlot },

    /// The label forbids a contact in this slot.
    #[error("Stance {label} cannot have a {slot} foot contact")]
    UnexpectedContact { label: StanceLabel, slot: FootSlot },

    #[error("Invalid stance duration: {0} (must be > 0)")]
    InvalidDuration(f64),

    #[error("Unknown stance label: {0:?}")]
    UnknownLabel(String),

    #[error("Non-finite CoM target")]
    InvalidCom,

    #[error("Stance sequence is empty")]
    EmptySequence,

    /// Support-region computation failed for one stance.
    #[error("Stance {index} ({label}): {source}")]
    Support {
        index: usize,
        label: StanceLabel,
        source: GeometryError,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Stance JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            ContactError::InvalidFriction(-0.1).to_string(),
            "Invalid friction coefficient: -0.1 (must be > 0)"
        );
        assert_eq!(
            ContactError::MissingContact {
                label: StanceLabel::DsL,
                slot: FootSlot::Right
            }
            .to_string(),
            "Stance DS-L requires a right foot contact"
        );
        assert_eq!(
            ContactError::UnknownLabel("TS-X".into()).to_string(),
            "Unknown stance label: \"TS-X\""
        );
    }

    #[test]
    fn geometry_errors_convert() {
        let err: ContactError = GeometryError::EmptyIntersection.into();
        assert!(matches!(err, ContactError::Geometry(_)));
    }
}
