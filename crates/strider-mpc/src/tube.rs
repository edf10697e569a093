//! CoM tube: position polytopes and acceleration cones over one contact
//! switch.
//!
//! The primal tube is a box swept from the current CoM to the preview target
//! with a square cross-section. It is split into one or two sub-phases
//! depending on where the switch falls. Each sub-phase gets a dual cone of
//! feasible CoM accelerations computed from the pendular cone of the stance
//! active during that sub-phase. When two sub-phases exist, the
//! single-support cone is intersected with the double-support one so that
//! the acceleration applied at the switch is valid on both sides.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::Vector3;
use strider_contact::{ContactError, Stance, expand_reduced_pendular_cone};
use strider_core::{MetricsSink, MpcSettings};
use strider_geometry::{Halfspaces, Polygon, ProjectionSettings, compute_polytope_halfspaces};
use tracing::trace;

use crate::error::{MpcError, TubeStage};

/// Below this length the tube direction defaults to the world x-axis.
const MIN_DIRECTION_NORM: f64 = 1e-6;

/// Per-coordinate tolerance under which the target counts as the current
/// stance's own CoM reference.
const SAME_TARGET_TOL: f64 = 1e-3;

/// Geometric parameters of a tube.
#[derive(Clone, Debug)]
pub struct TubeSettings {
    /// Half-side of the square cross-section (m).
    pub radius: f64,
    /// Extension of the tube beyond its end points (m).
    pub margin: f64,
    /// Gravity constant, positive (m/s²).
    pub gravity: f64,
    pub projection: ProjectionSettings,
}

impl Default for TubeSettings {
    fn default() -> Self {
        Self::from(&MpcSettings::default())
    }
}

impl From<&MpcSettings> for TubeSettings {
    fn from(settings: &MpcSettings) -> Self {
        Self {
            radius: settings.tube_radius,
            margin: settings.tube_margin,
            gravity: settings.gravity,
            projection: ProjectionSettings {
                max_solver_iters: settings.max_solver_iters,
                ..ProjectionSettings::default()
            },
        }
    }
}

/// Orthonormal frame `(n, t, b)` of the tube axis.
fn tube_frame(start: &Vector3<f64>, target: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let delta = target - start;
    let n = if delta.norm() < MIN_DIRECTION_NORM {
        Vector3::x()
    } else {
        delta.normalize()
    };
    let up = Vector3::z();
    let t_raw = up - up.dot(&n) * n;
    let t = if t_raw.norm() < MIN_DIRECTION_NORM {
        let x = Vector3::x();
        (x - x.dot(&n) * n).normalize()
    } else {
        t_raw.normalize()
    };
    let b = n.cross(&t);
    (n, t, b)
}

/// Tube between two CoM positions across one contact switch.
#[derive(Clone, Debug)]
pub struct ComTube {
    start_com: Vector3<f64>,
    target_com: Vector3<f64>,
    start_stance: Arc<Stance>,
    next_stance: Arc<Stance>,
    settings: TubeSettings,
    full_vrep: Vec<Vector3<f64>>,
    primal_vrep: Vec<Vec<Vector3<f64>>>,
    full_hrep: Option<Halfspaces>,
    reduced_duals: Vec<Polygon>,
    dual_vrep: Vec<Vec<Vector3<f64>>>,
    dual_hrep: Vec<Halfspaces>,
}

impl ComTube {
    /// Tube with no stage computed yet.
    pub fn new(
        start_com: Vector3<f64>,
        target_com: Vector3<f64>,
        start_stance: Arc<Stance>,
        next_stance: Arc<Stance>,
        settings: TubeSettings,
    ) -> Self {
        Self {
            start_com,
            target_com,
            start_stance,
            next_stance,
            settings,
            full_vrep: Vec::new(),
            primal_vrep: Vec::new(),
            full_hrep: None,
            reduced_duals: Vec::new(),
            dual_vrep: Vec::new(),
            dual_hrep: Vec::new(),
        }
    }

    /// Compute all four stages, reporting each duration to `metrics`.
    pub fn build(
        start_com: Vector3<f64>,
        target_com: Vector3<f64>,
        start_stance: Arc<Stance>,
        next_stance: Arc<Stance>,
        settings: TubeSettings,
        metrics: &mut dyn MetricsSink,
    ) -> Result<Self, MpcError> {
        let mut tube = Self::new(start_com, target_com, start_stance, next_stance, settings);

        let t0 = Instant::now();
        tube.compute_primal_vrep();
        metrics.log_duration(TubeStage::PrimalVrep.metric_name(), t0.elapsed());

        let t0 = Instant::now();
        tube.compute_primal_hrep()?;
        metrics.log_duration(TubeStage::PrimalHrep.metric_name(), t0.elapsed());

        let t0 = Instant::now();
        tube.compute_dual_vrep()?;
        metrics.log_duration(TubeStage::DualVrep.metric_name(), t0.elapsed());

        let t0 = Instant::now();
        tube.compute_dual_hrep()?;
        metrics.log_duration(TubeStage::DualHrep.metric_name(), t0.elapsed());

        Ok(tube)
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    /// Swept box vertices and their split into sub-phases.
    pub fn compute_primal_vrep(&mut self) {
        let (n, t, b) = tube_frame(&self.start_com, &self.target_com);
        let (r, m) = (self.settings.radius, self.settings.margin);
        let ends = [self.start_com - m * n, self.target_com + m * n];
        self.full_vrep = ends
            .iter()
            .flat_map(|s| {
                [(r, r), (r, -r), (-r, r), (-r, -r)]
                    .into_iter()
                    .map(move |(dt, db)| s + dt * t + db * b)
            })
            .collect();

        self.primal_vrep = if self.start_stance.is_single_support() {
            let stance_com = self.start_stance.com();
            let at_reference = (stance_com - self.target_com)
                .iter()
                .all(|d| d.abs() < SAME_TARGET_TOL);
            if at_reference {
                vec![self.full_vrep.clone()]
            } else {
                vec![vec![self.start_com], self.full_vrep.clone()]
            }
        } else {
            vec![self.full_vrep.clone(), vec![self.target_com]]
        };
        trace!(sub_phases = self.primal_vrep.len(), "tube primal vertices");
    }

    /// Halfspaces of the swept box.
    pub fn compute_primal_hrep(&mut self) -> Result<(), MpcError> {
        let hrep = compute_polytope_halfspaces(&self.full_vrep)
            .map_err(|e| MpcError::tube(TubeStage::PrimalHrep, e))?;
        self.full_hrep = Some(hrep);
        Ok(())
    }

    /// Acceleration cone vertices per sub-phase.
    pub fn compute_dual_vrep(&mut self) -> Result<(), MpcError> {
        let stage = TubeStage::DualVrep;
        let projection = &self.settings.projection;
        let reduced = match self.primal_vrep.as_slice() {
            [] => return Err(MpcError::TubeNotReady(TubeStage::PrimalVrep)),
            [single] => vec![
                self.start_stance
                    .compute_reduced_pendular_cone(single, projection)
                    .map_err(|e| MpcError::tube(stage, e))?,
            ],
            _ => {
                let (ds_cone, ss_cone, ss_first) = if self.start_stance.is_double_support() {
                    let ds = self
                        .start_stance
                        .compute_reduced_pendular_cone(&self.full_vrep, projection);
                    let ss = self
                        .next_stance
                        .compute_reduced_pendular_cone(&[self.target_com], projection);
                    (ds, ss, false)
                } else {
                    let ss = self
                        .start_stance
                        .compute_reduced_pendular_cone(&[self.start_com], projection);
                    let ds = self
                        .next_stance
                        .compute_reduced_pendular_cone(&self.full_vrep, projection);
                    (ds, ss, true)
                };
                let ds_cone = ds_cone.map_err(|e| MpcError::tube(stage, e))?;
                let ss_cone = ss_cone
                    .and_then(|ss| ds_cone.intersect(&ss).map_err(ContactError::from))
                    .map_err(|e| MpcError::tube(stage, e))?;
                if ss_first {
                    vec![ss_cone, ds_cone]
                } else {
                    vec![ds_cone, ss_cone]
                }
            }
        };
        self.dual_vrep = reduced
            .iter()
            .map(|poly| expand_reduced_pendular_cone(poly, self.settings.gravity, None))
            .collect();
        self.reduced_duals = reduced;
        Ok(())
    }

    /// Halfspaces `B a <= c` of each acceleration cone.
    pub fn compute_dual_hrep(&mut self) -> Result<(), MpcError> {
        if self.dual_vrep.is_empty() {
            return Err(MpcError::TubeNotReady(TubeStage::DualVrep));
        }
        self.dual_hrep = self
            .dual_vrep
            .iter()
            .map(|cone| compute_polytope_halfspaces(cone))
            .collect::<Result<_, _>>()
            .map_err(|e| MpcError::tube(TubeStage::DualHrep, e))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub const fn start_com(&self) -> &Vector3<f64> {
        &self.start_com
    }

    pub const fn target_com(&self) -> &Vector3<f64> {
        &self.target_com
    }

    pub fn start_stance(&self) -> &Arc<Stance> {
        &self.start_stance
    }

    pub fn next_stance(&self) -> &Arc<Stance> {
        &self.next_stance
    }

    /// The 8 vertices of the swept box.
    pub fn full_vrep(&self) -> &[Vector3<f64>] {
        &self.full_vrep
    }

    /// CoM vertices of each sub-phase.
    pub fn primal_vrep(&self) -> &[Vec<Vector3<f64>>] {
        &self.primal_vrep
    }

    pub const fn full_hrep(&self) -> Option<&Halfspaces> {
        self.full_hrep.as_ref()
    }

    /// Reduced 2D cones, one per sub-phase.
    pub fn reduced_duals(&self) -> &[Polygon] {
        &self.reduced_duals
    }

    pub fn dual_vrep(&self) -> &[Vec<Vector3<f64>>] {
        &self.dual_vrep
    }

    pub fn dual_hrep(&self) -> &[Halfspaces] {
        &self.dual_hrep
    }

    pub fn nb_sub_phases(&self) -> usize {
        self.primal_vrep.len()
    }
}
