//! Swing foot trajectory.
//!
//! The free foot travels from its lift-off pose to its touchdown pose through
//! a mid pose: the interpolated halfway pose lifted by `swing_height` along
//! its own normal. Both halves interpolate position linearly and orientation
//! by slerp.

use nalgebra::{Isometry3, Translation3, Vector3};

/// Pose-interpolated swing foot.
#[derive(Clone, Debug)]
pub struct SwingFoot {
    start: Isometry3<f64>,
    mid: Isometry3<f64>,
    end: Isometry3<f64>,
    pose: Isometry3<f64>,
    swing_height: f64,
}

/// Interpolate between two poses: lerp on translation, slerp on rotation.
fn interpolate_pose(a: &Isometry3<f64>, b: &Isometry3<f64>, s: f64) -> Isometry3<f64> {
    let p = a.translation.vector.lerp(&b.translation.vector, s);
    let q = a.rotation.slerp(&b.rotation, s);
    Isometry3::from_parts(Translation3::from(p), q)
}

impl SwingFoot {
    /// Swing foot resting at `pose`.
    pub fn new(pose: Isometry3<f64>, swing_height: f64) -> Self {
        let mut foot = Self {
            start: pose,
            mid: pose,
            end: pose,
            pose,
            swing_height,
        };
        foot.reset(pose, pose);
        foot
    }

    /// Start a new swing from `start` to `end`. The current pose jumps to
    /// `start`.
    pub fn reset(&mut self, start: Isometry3<f64>, end: Isometry3<f64>) {
        let mut mid = interpolate_pose(&start, &end, 0.5);
        let normal: Vector3<f64> = mid.rotation * Vector3::z();
        mid.translation.vector += self.swing_height * normal;
        self.start = start;
        self.mid = mid;
        self.end = end;
        self.pose = start;
    }

    /// Move the foot to progress `s` of the swing. Progress at or past 1 is
    /// ignored.
    pub fn update_pose(&mut self, s: f64) {
        if s >= 1.0 {
            return;
        }
        self.pose = if s <= 0.5 {
            interpolate_pose(&self.start, &self.mid, 2.0 * s)
        } else {
            interpolate_pose(&self.mid, &self.end, 2.0 * s - 1.0)
        };
    }

    pub const fn pose(&self) -> &Isometry3<f64> {
        &self.pose
    }

    pub const fn start(&self) -> &Isometry3<f64> {
        &self.start
    }

    pub const fn mid(&self) -> &Isometry3<f64> {
        &self.mid
    }

    pub const fn end(&self) -> &Isometry3<f64> {
        &self.end
    }

    pub const fn swing_height(&self) -> f64 {
        self.swing_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn pose(x: f64, y: f64, z: f64, yaw: f64) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
        )
    }

    #[test]
    fn mid_pose_is_lifted_along_normal() {
        let foot = {
            let mut f = SwingFoot::new(pose(0.0, 0.0, 0.0, 0.0), 0.2);
            f.reset(pose(0.0, 0.0, 0.0, 0.0), pose(0.4, 0.0, 0.1, 0.0));
            f
        };
        assert_relative_eq!(
            foot.mid().translation.vector,
            Vector3::new(0.2, 0.0, 0.25),
            epsilon = 1e-12
        );
        assert_relative_eq!(foot.pose().translation.vector, Vector3::zeros());
    }

    #[test]
    fn update_follows_both_halves() {
        let mut foot = SwingFoot::new(pose(0.0, 0.0, 0.0, 0.0), 0.1);
        foot.reset(pose(0.0, 0.0, 0.0, 0.0), pose(0.4, 0.0, 0.0, 0.8));

        foot.update_pose(0.25);
        assert_relative_eq!(
            foot.pose().translation.vector,
            Vector3::new(0.1, 0.0, 0.05),
            epsilon = 1e-12
        );

        foot.update_pose(0.5);
        assert_relative_eq!(
            foot.pose().translation.vector,
            foot.mid().translation.vector,
            epsilon = 1e-12
        );
        assert_relative_eq!(foot.pose().rotation.angle(), 0.4, epsilon = 1e-9);

        foot.update_pose(0.999_999);
        assert_relative_eq!(
            foot.pose().translation.vector,
            Vector3::new(0.4, 0.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn completed_swing_keeps_last_pose() {
        let mut foot = SwingFoot::new(pose(0.0, 0.0, 0.0, 0.0), 0.1);
        foot.reset(pose(0.0, 0.0, 0.0, 0.0), pose(0.4, 0.0, 0.0, 0.0));
        foot.update_pose(0.75);
        let before = *foot.pose();
        foot.update_pose(1.0);
        foot.update_pose(1.5);
        assert_relative_eq!(before.translation.vector, foot.pose().translation.vector);
    }
}
