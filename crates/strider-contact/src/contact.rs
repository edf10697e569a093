//! Rectangular surface contacts with linearized Coulomb friction.

use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::error::ContactError;

/// Rigid rectangular contact between a foot sole and the environment.
///
/// The contact frame is given by the columns `(t, b, n)` of the pose
/// rotation: `t` along the rectangle length, `b` along its width and `n` the
/// outward surface normal. Contacts are immutable once built and are shared
/// between stances behind an `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct Contact {
    pose: Isometry3<f64>,
    half_length: f64,
    half_width: f64,
    friction: f64,
}

impl Contact {
    /// Create a contact from its pose, half-extents `[X, Y]` and friction
    /// coefficient.
    pub fn new(pose: Isometry3<f64>, shape: [f64; 2], friction: f64) -> Result<Self, ContactError> {
        let [half_length, half_width] = shape;
        if !(half_length > 0.0 && half_width > 0.0 && half_length.is_finite() && half_width.is_finite())
        {
            return Err(ContactError::InvalidShape(half_length, half_width));
        }
        if !(friction > 0.0 && friction.is_finite()) {
            return Err(ContactError::InvalidFriction(friction));
        }
        let t = pose.translation.vector;
        let q = pose.rotation.coords;
        if t.iter().chain(q.iter()).any(|c| !c.is_finite()) {
            return Err(ContactError::InvalidPose("non-finite pose".into()));
        }
        Ok(Self {
            pose,
            half_length,
            half_width,
            friction,
        })
    }

    /// Create a contact from a position and roll-pitch-yaw angles.
    pub fn from_rpy(
        position: Vector3<f64>,
        rpy: Vector3<f64>,
        shape: [f64; 2],
        friction: f64,
    ) -> Result<Self, ContactError> {
        let rotation = UnitQuaternion::from_euler_angles(rpy.x, rpy.y, rpy.z);
        Self::new(
            Isometry3::from_parts(Translation3::from(position), rotation),
            shape,
            friction,
        )
    }

    pub const fn pose(&self) -> &Isometry3<f64> {
        &self.pose
    }

    /// Position of the contact center.
    pub fn p(&self) -> Vector3<f64> {
        self.pose.translation.vector
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        Rotation3::from(self.pose.rotation).into_inner()
    }

    /// Tangent along the rectangle length.
    pub fn t(&self) -> Vector3<f64> {
        self.rotation_matrix().column(0).into_owned()
    }

    /// Binormal along the rectangle width.
    pub fn b(&self) -> Vector3<f64> {
        self.rotation_matrix().column(1).into_owned()
    }

    /// Outward surface normal.
    pub fn n(&self) -> Vector3<f64> {
        self.rotation_matrix().column(2).into_owned()
    }

    /// Half-extents `[X, Y]`.
    pub const fn shape(&self) -> [f64; 2] {
        [self.half_length, self.half_width]
    }

    pub const fn friction(&self) -> f64 {
        self.friction
    }

    /// Corners `p ± X t ± Y b`.
    pub fn vertices(&self) -> [Vector3<f64>; 4] {
        let (p, t, b) = (self.p(), self.t(), self.b());
        let (x, y) = (self.half_length, self.half_width);
        [
            p + x * t + y * b,
            p + x * t - y * b,
            p - x * t + y * b,
            p - x * t - y * b,
        ]
    }

    /// Edges of the inner linearized friction pyramid.
    ///
    /// The pyramid is inscribed in the friction cone, hence uses the reduced
    /// coefficient `μ / √2`.
    pub fn force_rays(&self) -> [Vector3<f64>; 4] {
        let mu = self.friction / std::f64::consts::SQRT_2;
        let (t, b, n) = (self.t(), self.b(), self.n());
        [
            n + mu * t + mu * b,
            n + mu * t - mu * b,
            n - mu * t + mu * b,
            n - mu * t - mu * b,
        ]
    }

    /// Point forces `(application point, force ray)` generating the contact
    /// wrench cone: every friction ray at every corner.
    pub fn force_generators(&self) -> Vec<(Vector3<f64>, Vector3<f64>)> {
        let rays = self.force_rays();
        self.vertices()
            .into_iter()
            .flat_map(|p| rays.into_iter().map(move |f| (p, f)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat(shape: [f64; 2]) -> Contact {
        Contact::from_rpy(Vector3::zeros(), Vector3::zeros(), shape, 0.7).unwrap()
    }

    #[test]
    fn flat_contact_frame_is_world_frame() {
        let c = flat([0.1, 0.05]);
        assert_relative_eq!(c.t(), Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(c.b(), Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(c.n(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn yaw_rotates_tangent() {
        let c = Contact::from_rpy(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
            [0.1, 0.05],
            0.7,
        )
        .unwrap();
        assert_relative_eq!(c.t(), Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(c.b(), -Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(c.p(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn vertices_span_the_rectangle() {
        let c = flat([0.12, 0.06]);
        let v = c.vertices();
        for corner in &v {
            assert_relative_eq!(corner.x.abs(), 0.12, epsilon = 1e-12);
            assert_relative_eq!(corner.y.abs(), 0.06, epsilon = 1e-12);
            assert_relative_eq!(corner.z, 0.0);
        }
        let sum: Vector3<f64> = v.iter().sum();
        assert_relative_eq!(sum, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn force_rays_lie_in_friction_cone() {
        let c = flat([0.1, 0.05]);
        for f in c.force_rays() {
            let tangential = f.x.hypot(f.y);
            assert_relative_eq!(f.z, 1.0);
            assert_relative_eq!(tangential, 0.7, epsilon = 1e-12);
        }
        assert_eq!(c.force_generators().len(), 16);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let pose = Isometry3::identity();
        assert!(matches!(
            Contact::new(pose, [0.0, 0.05], 0.7),
            Err(ContactError::InvalidShape(..))
        ));
        assert!(matches!(
            Contact::new(pose, [0.1, 0.05], -1.0),
            Err(ContactError::InvalidFriction(_))
        ));
        assert!(matches!(
            Contact::from_rpy(Vector3::new(f64::NAN, 0.0, 0.0), Vector3::zeros(), [0.1, 0.1], 0.5),
            Err(ContactError::InvalidPose(_))
        ));
    }
}
