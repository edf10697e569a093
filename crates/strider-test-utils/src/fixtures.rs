//! Synthetic stances on flat ground.
//!
//! Feet are axis-aligned rectangles at `y = ±STEP_WIDTH`, so support
//! polygons and pendular cones have closed-form shapes.

use std::sync::Arc;

use nalgebra::Vector3;
use strider_contact::{Contact, Stance, StanceLabel, StanceSequence};
use strider_geometry::ProjectionSettings;

/// Foot half-length and half-width (m).
pub const FOOT_SHAPE: [f64; 2] = [0.1, 0.05];
pub const FRICTION: f64 = 0.7;
/// Lateral offset of each foot from the walking line (m).
pub const STEP_WIDTH: f64 = 0.1;
pub const COM_HEIGHT: f64 = 0.9;
pub const DS_DURATION: f64 = 0.7;
pub const SS_DURATION: f64 = 1.0;

/// Flat, axis-aligned foot contact at `(x, y, 0)`.
///
/// # Panics
/// Never for the fixture shape and friction.
pub fn flat_foot(x: f64, y: f64) -> Arc<Contact> {
    Arc::new(
        Contact::from_rpy(Vector3::new(x, y, 0.0), Vector3::zeros(), FOOT_SHAPE, FRICTION)
            .expect("fixture contact is valid"),
    )
}

fn com_between(a: &Contact, b: &Contact) -> Vector3<f64> {
    let mid = 0.5 * (a.p() + b.p());
    Vector3::new(mid.x, mid.y, COM_HEIGHT)
}

fn com_above(foot: &Contact) -> Vector3<f64> {
    let p = foot.p();
    Vector3::new(p.x, p.y, COM_HEIGHT)
}

/// Straight walk along +x: `nb_cycles` repetitions of
/// `DS-R, SS-R, DS-L, SS-L`, each foot stepping `step_length` past the
/// other. Both feet start side by side at the origin.
///
/// # Panics
/// If `nb_cycles` is zero.
pub fn flat_walk(nb_cycles: usize, step_length: f64) -> StanceSequence {
    assert!(nb_cycles > 0, "a walk needs at least one cycle");
    let mut left = flat_foot(0.0, STEP_WIDTH);
    let mut right = flat_foot(0.0, -STEP_WIDTH);
    let mut stances = Vec::with_capacity(4 * nb_cycles);
    for _ in 0..nb_cycles {
        stances.push(stance(StanceLabel::DsR, com_between(&left, &right), Some(&left), Some(&right)));
        stances.push(stance(StanceLabel::SsR, com_above(&right), None, Some(&right)));
        left = flat_foot(right.p().x + step_length, STEP_WIDTH);
        stances.push(stance(StanceLabel::DsL, com_between(&left, &right), Some(&left), Some(&right)));
        stances.push(stance(StanceLabel::SsL, com_above(&left), Some(&left), None));
        right = flat_foot(left.p().x + step_length, -STEP_WIDTH);
    }
    StanceSequence::new(stances, &ProjectionSettings::default()).expect("fixture walk is valid")
}

fn stance(
    label: StanceLabel,
    com: Vector3<f64>,
    left: Option<&Arc<Contact>>,
    right: Option<&Arc<Contact>>,
) -> Stance {
    let duration = if label.is_double_support() {
        DS_DURATION
    } else {
        SS_DURATION
    };
    Stance::new(label, com, duration, left.cloned(), right.cloned()).expect("fixture stance is valid")
}
