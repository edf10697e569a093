use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_dt() -> f64 {
    0.03
}
const fn default_radius() -> f64 {
    1.4
}
const fn default_angular_step() -> f64 {
    0.5
}
const fn default_height() -> f64 {
    1.2
}
const fn default_roughness() -> f64 {
    0.5
}
const fn default_friction() -> f64 {
    0.7
}
const fn default_ds_duration() -> f64 {
    0.7
}
const fn default_ss_duration() -> f64 {
    1.0
}
const fn default_leg_length() -> f64 {
    0.85
}
const fn default_contact_shape() -> [f64; 2] {
    [0.12, 0.06]
}
const fn default_seed() -> u64 {
    42
}
const fn default_swing_height() -> f64 {
    0.15
}
const fn default_true() -> bool {
    true
}
const fn default_nb_steps() -> usize {
    20
}
const fn default_tube_radius() -> f64 {
    0.01
}
const fn default_tube_margin() -> f64 {
    0.01
}
const fn default_wxt() -> f64 {
    1000.0
}
const fn default_wu() -> f64 {
    1.0
}
const fn default_gravity() -> f64 {
    9.80665
}
const fn default_max_solver_iters() -> u32 {
    200
}

// ---------------------------------------------------------------------------
// SimSettings
// ---------------------------------------------------------------------------

/// Simulation loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    /// Tick duration in seconds (default: 0.03).
    #[serde(default = "default_dt")]
    pub dt: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self { dt: default_dt() }
    }
}

// ---------------------------------------------------------------------------
// StaircaseConfig
// ---------------------------------------------------------------------------

/// Parameters of the circular slanted staircase generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaircaseConfig {
    /// Staircase radius in meters.
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// Angle between two consecutive left footholds in radians.
    #[serde(default = "default_angular_step")]
    pub angular_step: f64,
    /// Altitude variation over one revolution in meters.
    #[serde(default = "default_height")]
    pub height: f64,
    /// Amplitude of random roll, pitch and yaw perturbations in radians.
    #[serde(default = "default_roughness")]
    pub roughness: f64,
    /// Friction coefficient between feet and steps.
    #[serde(default = "default_friction")]
    pub friction: f64,
    /// Double-support phase duration in seconds.
    #[serde(default = "default_ds_duration")]
    pub ds_duration: f64,
    /// Single-support phase duration in seconds.
    #[serde(default = "default_ss_duration")]
    pub ss_duration: f64,
    /// Offset added to the CoM target of the first stance.
    #[serde(default)]
    pub init_com_offset: [f64; 3],
    /// Height of the CoM target above the stance foot.
    #[serde(default = "default_leg_length")]
    pub leg_length: f64,
    /// Foot half-length and half-width in meters.
    #[serde(default = "default_contact_shape")]
    pub contact_shape: [f64; 2],
    /// Seed of the roughness RNG.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for StaircaseConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            angular_step: default_angular_step(),
            height: default_height(),
            roughness: default_roughness(),
            friction: default_friction(),
            ds_duration: default_ds_duration(),
            ss_duration: default_ss_duration(),
            init_com_offset: [0.0; 3],
            leg_length: default_leg_length(),
            contact_shape: default_contact_shape(),
            seed: default_seed(),
        }
    }
}

/// Finite and strictly positive. NaN fails.
fn positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// Finite and non-negative. NaN fails.
fn non_negative(x: f64) -> bool {
    x.is_finite() && x >= 0.0
}

impl StaircaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.radius) {
            return Err(ConfigError::invalid("staircase.radius", "must be > 0"));
        }
        if !positive(self.angular_step) || self.angular_step >= std::f64::consts::TAU {
            return Err(ConfigError::invalid(
                "staircase.angular_step",
                "must lie in (0, 2π)",
            ));
        }
        if !positive(self.friction) {
            return Err(ConfigError::invalid("staircase.friction", "must be > 0"));
        }
        if !positive(self.ds_duration) || !positive(self.ss_duration) {
            return Err(ConfigError::invalid(
                "staircase.durations",
                "phase durations must be > 0",
            ));
        }
        if !self.contact_shape.iter().all(|&h| positive(h)) {
            return Err(ConfigError::invalid(
                "staircase.contact_shape",
                "half-extents must be > 0",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FsmConfig
// ---------------------------------------------------------------------------

/// Walking state machine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsmConfig {
    /// Apex height of swing foot trajectories, along the mid-pose normal.
    #[serde(default = "default_swing_height")]
    pub swing_height: f64,
    /// Whether the first stance succeeds the last one.
    #[serde(default = "default_true")]
    pub cycle: bool,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            swing_height: default_swing_height(),
            cycle: true,
        }
    }
}

// ---------------------------------------------------------------------------
// MpcSettings
// ---------------------------------------------------------------------------

/// Tube and predictive-control settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpcSettings {
    /// Number of discretization steps in the preview window.
    #[serde(default = "default_nb_steps")]
    pub nb_steps: usize,
    /// Half-width of the tube cross-section in meters.
    #[serde(default = "default_tube_radius")]
    pub tube_radius: f64,
    /// Safety margin around tube end points in meters.
    #[serde(default = "default_tube_margin")]
    pub tube_margin: f64,
    /// Weight on terminal state tracking error.
    #[serde(default = "default_wxt")]
    pub wxt: f64,
    /// Weight on control effort.
    #[serde(default = "default_wu")]
    pub wu: f64,
    /// Also constrain preview CoM positions to the primal tube.
    #[serde(default)]
    pub state_constraints: bool,
    /// Gravity constant (positive) in m/s².
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    /// Maximum interior-point iterations per QP.
    #[serde(default = "default_max_solver_iters")]
    pub max_solver_iters: u32,
}

impl Default for MpcSettings {
    fn default() -> Self {
        Self {
            nb_steps: default_nb_steps(),
            tube_radius: default_tube_radius(),
            tube_margin: default_tube_margin(),
            wxt: default_wxt(),
            wu: default_wu(),
            state_constraints: false,
            gravity: default_gravity(),
            max_solver_iters: default_max_solver_iters(),
        }
    }
}

impl MpcSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nb_steps < 2 {
            return Err(ConfigError::invalid("mpc.nb_steps", "must be >= 2"));
        }
        if !non_negative(self.tube_radius) || !non_negative(self.tube_margin) {
            return Err(ConfigError::invalid(
                "mpc.tube_radius",
                "radius and margin must be non-negative",
            ));
        }
        if !positive(self.wxt) || !positive(self.wu) {
            return Err(ConfigError::invalid("mpc.weights", "wxt and wu must be > 0"));
        }
        if !positive(self.gravity) {
            return Err(ConfigError::invalid("mpc.gravity", "must be > 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WalkingConfig
// ---------------------------------------------------------------------------

/// Complete configuration of a walking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkingConfig {
    #[serde(default)]
    pub sim: SimSettings,
    #[serde(default)]
    pub staircase: StaircaseConfig,
    #[serde(default)]
    pub fsm: FsmConfig,
    #[serde(default)]
    pub mpc: MpcSettings,
}

impl WalkingConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.sim.dt) {
            return Err(ConfigError::InvalidDt(self.sim.dt));
        }
        self.staircase.validate()?;
        self.mpc.validate()?;
        if !non_negative(self.fsm.swing_height) {
            return Err(ConfigError::invalid("fsm.swing_height", "must be >= 0"));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded walking config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walking_config_default_values() {
        let cfg = WalkingConfig::default();
        assert!((cfg.sim.dt - 0.03).abs() < f64::EPSILON);
        assert_eq!(cfg.mpc.nb_steps, 20);
        assert!((cfg.mpc.wxt - 1000.0).abs() < f64::EPSILON);
        assert!((cfg.mpc.wu - 1.0).abs() < f64::EPSILON);
        assert!(cfg.fsm.cycle);
        assert!(!cfg.mpc.state_constraints);
        assert_eq!(cfg.staircase.seed, 42);
    }

    #[test]
    fn walking_config_validate_ok() {
        assert!(WalkingConfig::default().validate().is_ok());
    }

    #[test]
    fn walking_config_validate_invalid_dt() {
        let cfg = WalkingConfig {
            sim: SimSettings { dt: 0.0 },
            ..WalkingConfig::default()
        };
        assert!(matches!(cfg.validate().unwrap_err(), ConfigError::InvalidDt(_)));
    }

    #[test]
    fn walking_config_validate_nb_steps() {
        let mut cfg = WalkingConfig::default();
        cfg.mpc.nb_steps = 1;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("mpc.nb_steps"));
    }

    #[test]
    fn walking_config_validate_friction() {
        let mut cfg = WalkingConfig::default();
        cfg.staircase.friction = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn walking_config_validate_rejects_nan() {
        let mut cfg = WalkingConfig::default();
        cfg.sim.dt = f64::NAN;
        assert!(matches!(cfg.validate().unwrap_err(), ConfigError::InvalidDt(_)));

        let mut cfg = WalkingConfig::default();
        cfg.mpc.wu = f64::NAN;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "mpc.weights"));

        let setters: [fn(&mut WalkingConfig); 6] = [
            |c| c.mpc.tube_radius = f64::NAN,
            |c| c.mpc.gravity = f64::NAN,
            |c| c.staircase.friction = f64::NAN,
            |c| c.staircase.ss_duration = f64::NAN,
            |c| c.staircase.contact_shape[0] = f64::NAN,
            |c| c.fsm.swing_height = f64::NAN,
        ];
        for set_nan in setters {
            let mut cfg = WalkingConfig::default();
            set_nan(&mut cfg);
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn walking_config_validate_rejects_infinite_dt() {
        let mut cfg = WalkingConfig::default();
        cfg.sim.dt = f64::INFINITY;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn walking_config_partial_toml_uses_defaults() {
        let cfg = WalkingConfig::from_toml_str(
            r"
            [sim]
            dt = 0.01

            [mpc]
            nb_steps = 10
            state_constraints = true
            ",
        )
        .unwrap();
        assert!((cfg.sim.dt - 0.01).abs() < f64::EPSILON);
        assert_eq!(cfg.mpc.nb_steps, 10);
        assert!(cfg.mpc.state_constraints);
        assert!((cfg.mpc.tube_radius - 0.01).abs() < f64::EPSILON);
        assert_eq!(cfg.staircase, StaircaseConfig::default());
    }

    #[test]
    fn walking_config_toml_rejects_invalid_values() {
        let err = WalkingConfig::from_toml_str("[staircase]\nds_duration = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn walking_config_toml_parse_error() {
        let err = WalkingConfig::from_toml_str("[sim\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn walking_config_roundtrips_through_toml() {
        let cfg = WalkingConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        assert_eq!(WalkingConfig::from_toml_str(&text).unwrap(), cfg);
    }
}
