//! Tube predictive controller process.
//!
//! Each tick: read preview targets from the state machine, build the CoM
//! tube between the current CoM and the target, solve the predictive
//! control problem over it and hand the result to the preview buffer. A
//! failure at any stage is logged and the previous preview stays in place.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::Vector6;
use strider_core::{MetricsSink, MpcSettings, SimContext, Shared, Tickable, lock, shared};
use tracing::{trace, warn};

use crate::error::MpcError;
use crate::fsm::WalkingFsm;
use crate::preview::PreviewBuffer;
use crate::solver::{LinearPredictiveControl, MpcSolution, compute_switch_step};
use crate::tube::{ComTube, TubeSettings};
use crate::types::PointMass;

/// Plans a new preview at every tick.
pub struct TubePredictiveControl {
    fsm: Shared<WalkingFsm>,
    com: Shared<PointMass>,
    buffer: Arc<PreviewBuffer>,
    settings: MpcSettings,
    tube_settings: TubeSettings,
    latest_tube: Shared<Option<ComTube>>,
    nb_failures: u64,
}

impl TubePredictiveControl {
    pub fn new(
        fsm: Shared<WalkingFsm>,
        com: Shared<PointMass>,
        buffer: Arc<PreviewBuffer>,
        settings: MpcSettings,
    ) -> Self {
        let tube_settings = TubeSettings::from(&settings);
        Self {
            fsm,
            com,
            buffer,
            settings,
            tube_settings,
            latest_tube: shared(None),
            nb_failures: 0,
        }
    }

    /// Handle on the last successfully built tube.
    pub fn latest_tube(&self) -> Shared<Option<ComTube>> {
        Arc::clone(&self.latest_tube)
    }

    pub fn buffer(&self) -> &Arc<PreviewBuffer> {
        &self.buffer
    }

    /// Number of ticks on which planning failed.
    pub const fn nb_failures(&self) -> u64 {
        self.nb_failures
    }

    /// Plan once and update the preview buffer.
    ///
    /// Returns `Ok(None)` when the walk is over. On error the buffer is
    /// left untouched.
    pub fn plan(&mut self, metrics: &mut dyn MetricsSink) -> Result<Option<MpcSolution>, MpcError> {
        // Hold the state machine only long enough to copy what planning needs.
        let (targets, cur_stance, next_stance) = {
            let fsm = lock(&self.fsm);
            if fsm.is_over() {
                return Ok(None);
            }
            (
                fsm.get_preview_targets(),
                Arc::clone(fsm.cur_stance()),
                Arc::clone(fsm.next_stance()),
            )
        };
        let (p, x_init) = {
            let com = lock(&self.com);
            (com.p, com.state())
        };

        let tube = ComTube::build(
            p,
            targets.target_com,
            cur_stance,
            next_stance,
            self.tube_settings.clone(),
            metrics,
        )?;

        let t0 = Instant::now();
        let (g, gd) = (targets.target_com, targets.target_comd);
        let x_goal = Vector6::new(g.x, g.y, g.z, gd.x, gd.y, gd.z);
        let mut lpc = LinearPredictiveControl::new(
            x_init,
            x_goal,
            targets.horizon,
            self.settings.nb_steps,
            self.settings.wxt,
            self.settings.wu,
        )?
        .with_max_solver_iters(self.settings.max_solver_iters);
        let switch_step = compute_switch_step(
            targets.switch_time,
            lpc.timestep(),
            self.settings.nb_steps,
            tube.dual_hrep().len(),
        );
        lpc.set_acceleration_cones(tube.dual_hrep(), switch_step);
        if self.settings.state_constraints {
            if let Some(hrep) = tube.full_hrep() {
                lpc.set_state_constraints(hrep.clone());
            }
        }
        let solution = lpc.solve()?;
        metrics.log_duration("qp_build", solution.build_time);
        metrics.log_duration("qp_solve", solution.solve_time);
        metrics.log_duration("qp_solve_and_build", t0.elapsed());

        self.buffer
            .update(solution.controls.clone(), solution.durations(), switch_step)?;
        trace!(
            horizon = targets.horizon,
            ?switch_step,
            iterations = solution.iterations,
            "preview updated"
        );
        *lock(&self.latest_tube) = Some(tube);
        Ok(Some(solution))
    }
}

impl std::fmt::Debug for TubePredictiveControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TubePredictiveControl")
            .field("settings", &self.settings)
            .field("nb_failures", &self.nb_failures)
            .finish_non_exhaustive()
    }
}

impl Tickable for TubePredictiveControl {
    fn on_tick(&mut self, ctx: &mut SimContext<'_>) {
        if let Err(err) = self.plan(ctx.metrics) {
            self.nb_failures += 1;
            warn!(time = %ctx.time, %err, "preview planning failed, keeping previous preview");
        }
    }

    fn name(&self) -> &str {
        "tube_predictive_control"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ik::{IkSolver, TaskRegistry};
    use crate::swing::SwingFoot;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Vector3};
    use std::sync::Mutex;
    use strider_core::{CompTimes, WalkTime};
    use strider_test_utils::flat_walk;

    fn controller(com: PointMass) -> TubePredictiveControl {
        controller_with(com, MpcSettings::default())
    }

    fn controller_with(com: PointMass, settings: MpcSettings) -> TubePredictiveControl {
        let stances = flat_walk(1, 0.2);
        let com = shared(com);
        let ik: Arc<Mutex<dyn IkSolver>> = shared(TaskRegistry::new());
        let swing = shared(SwingFoot::new(Isometry3::identity(), 0.15));
        let fsm = shared(WalkingFsm::new(stances, Arc::clone(&com), ik, swing, true));
        TubePredictiveControl::new(fsm, com, Arc::new(PreviewBuffer::new()), settings)
    }

    #[test]
    fn plans_preview_from_double_support() {
        let mut ctrl = controller(PointMass::new(Vector3::new(0.0, 0.0, 0.9)));
        let mut metrics = CompTimes::new();
        let solution = ctrl.plan(&mut metrics).unwrap().unwrap();
        assert_eq!(solution.controls.len(), 20);
        assert_eq!(ctrl.buffer().remaining(), 20);
        assert!(lock(&ctrl.latest_tube()).is_some());
        for key in ["tube_dual_hrep", "qp_build", "qp_solve", "qp_solve_and_build"] {
            assert_eq!(metrics.get(key).map(|e| e.count()), Some(1), "{key}");
        }
        // Preview pushes the CoM forward along the feet.
        let last = solution.states.last().unwrap();
        assert!(last[3] > 0.0);
        assert_relative_eq!(solution.dt, 1.2 / 20.0, epsilon = 1e-12);
    }

    #[test]
    fn failure_keeps_previous_preview() {
        let mut ctrl = controller(PointMass::new(Vector3::new(0.0, 0.0, 0.9)));
        let mut metrics = CompTimes::new();
        ctrl.plan(&mut metrics).unwrap();
        let before = ctrl.buffer().snapshot();

        // A CoM far outside every support area has no feasible acceleration.
        lock(&ctrl.com).p = Vector3::new(3.0, 3.0, 0.9);
        let mut ctx = SimContext::new(0.03, WalkTime::ZERO, &mut metrics);
        ctrl.on_tick(&mut ctx);
        assert_eq!(ctrl.nb_failures(), 1);
        assert_eq!(ctrl.buffer().snapshot(), before);
    }

    #[test]
    fn unreachable_tube_makes_qp_infeasible() {
        let settings = MpcSettings {
            state_constraints: true,
            ..MpcSettings::default()
        };
        let mut ctrl = controller_with(PointMass::new(Vector3::new(0.0, 0.0, 0.9)), settings);
        let mut metrics = CompTimes::new();
        ctrl.plan(&mut metrics).unwrap();
        let before = ctrl.buffer().snapshot();

        // Same tube, but the CoM shoots upward faster than gravity can
        // bring it back inside.
        lock(&ctrl.com).pd = Vector3::new(0.0, 0.0, 5.0);
        let err = ctrl.plan(&mut metrics).unwrap_err();
        assert!(matches!(err, MpcError::Infeasible(_)), "{err}");
        assert_eq!(ctrl.buffer().snapshot(), before);

        let mut ctx = SimContext::new(0.03, WalkTime::ZERO, &mut metrics);
        ctrl.on_tick(&mut ctx);
        assert_eq!(ctrl.nb_failures(), 1);
        assert_eq!(ctrl.buffer().snapshot(), before);
    }
}
