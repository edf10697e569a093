//! Core types shared by the walking pipeline.

use nalgebra::Vector3;

/// Point-mass model of the center of mass.
#[derive(Clone, Debug, PartialEq)]
pub struct PointMass {
    /// Position in world frame (meters).
    pub p: Vector3<f64>,
    /// Velocity in world frame (m/s).
    pub pd: Vector3<f64>,
    /// Last applied acceleration (m/s²).
    pub pdd: Vector3<f64>,
}

impl PointMass {
    /// Point mass at rest at `p`.
    pub fn new(p: Vector3<f64>) -> Self {
        Self {
            p,
            pd: Vector3::zeros(),
            pdd: Vector3::zeros(),
        }
    }

    /// Integrate a constant acceleration over `dt` seconds.
    pub fn integrate_constant_accel(&mut self, pdd: &Vector3<f64>, dt: f64) {
        self.p += self.pd * dt + pdd * (0.5 * dt * dt);
        self.pd += pdd * dt;
        self.pdd = *pdd;
    }

    /// Stacked state `[p; pd]`.
    pub fn state(&self) -> nalgebra::Vector6<f64> {
        nalgebra::Vector6::new(self.p.x, self.p.y, self.p.z, self.pd.x, self.pd.y, self.pd.z)
    }
}

/// Targets handed by the state machine to the predictive controller.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewTargets {
    /// Time left in the current stance, where the contact switch happens.
    pub switch_time: f64,
    /// Duration of the preview window.
    pub horizon: f64,
    /// CoM position to reach at the end of the window.
    pub target_com: Vector3<f64>,
    /// CoM velocity to reach at the end of the window.
    pub target_comd: Vector3<f64>,
}
