//! Support regions of synthetic stances with known analytic shapes.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::{Vector2, Vector3};
use strider_contact::{Contact, Stance, StanceLabel, StanceSequence};
use strider_geometry::ProjectionSettings;

fn foot_at(x: f64, y: f64, yaw: f64) -> Arc<Contact> {
    Arc::new(
        Contact::from_rpy(
            Vector3::new(x, y, 0.0),
            Vector3::new(0.0, 0.0, yaw),
            [0.1, 0.05],
            0.7,
        )
        .unwrap(),
    )
}

#[test]
fn rotated_foot_swaps_cone_extents() {
    let com = Vector3::new(0.0, 0.0, 1.0);
    let stance = Stance::new(StanceLabel::SsL, com, 1.0, Some(foot_at(0.0, 0.0, FRAC_PI_2)), None)
        .unwrap();
    let cone = stance
        .compute_reduced_pendular_cone(&[com], &ProjectionSettings::default())
        .unwrap();
    let (min, max) = cone.bounds();
    assert_relative_eq!(min, Vector2::new(-0.05, -0.1), epsilon = 1e-5);
    assert_relative_eq!(max, Vector2::new(0.05, 0.1), epsilon = 1e-5);
}

#[test]
fn pendular_cone_scales_with_com_height() {
    // Lines through the CoM and the sole: (a, b) = -cop / z.
    let com = Vector3::new(0.0, 0.0, 2.0);
    let stance = Stance::new(StanceLabel::SsR, com, 1.0, None, Some(foot_at(0.0, 0.0, 0.0)))
        .unwrap();
    let cone = stance
        .compute_reduced_pendular_cone(&[com], &ProjectionSettings::default())
        .unwrap();
    assert_relative_eq!(cone.area(), 0.02 / 4.0, epsilon = 1e-6);
}

#[test]
fn accel_cone_contains_static_equilibrium() {
    let com = Vector3::new(0.0, 0.0, 0.9);
    let stance = Stance::new(
        StanceLabel::DsL,
        com,
        0.7,
        Some(foot_at(0.0, 0.1, 0.0)),
        Some(foot_at(0.0, -0.1, 0.0)),
    )
    .unwrap();
    let cone = stance
        .compute_pendular_accel_cone(&[com], 9.81, &ProjectionSettings::default())
        .unwrap();
    assert_relative_eq!(cone[0], Vector3::new(0.0, 0.0, -9.81));
    let halfspaces = strider_geometry::compute_polytope_halfspaces(&cone).unwrap();
    // Zero acceleration (standing still) is strictly feasible.
    assert!(halfspaces.max_violation(&Vector3::zeros()) < -1e-3);
    assert!(!halfspaces.contains(&Vector3::new(0.0, 0.0, -12.0), 1e-9));
}

#[test]
fn guard_distance_is_positive_over_support() {
    let com = Vector3::new(0.0, 0.0, 0.9);
    let ds = Stance::new(
        StanceLabel::DsR,
        com,
        0.7,
        Some(foot_at(0.0, 0.1, 0.0)),
        Some(foot_at(0.0, -0.1, 0.0)),
    )
    .unwrap();
    let ss = Stance::new(StanceLabel::SsR, com, 1.0, None, Some(foot_at(0.0, -0.1, 0.0))).unwrap();
    let seq = StanceSequence::new(vec![ds, ss], &ProjectionSettings::default()).unwrap();
    // Centered CoM sits 5 cm beside the right sole.
    assert_relative_eq!(seq[1].dist_to_sep_edge(&com).unwrap(), -0.05, epsilon = 1e-5);
    assert!(seq[0].dist_to_sep_edge(&com).unwrap() > 0.0);
}
