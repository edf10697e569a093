//! Walking state machine.
//!
//! Walks a [`StanceSequence`] one stance at a time. A stance lasts its
//! nominal duration; a double-support stance is only left once the CoM is
//! close enough to the static-equilibrium polygon of the single-support
//! stance that follows. During single support the free foot follows a
//! [`SwingFoot`] trajectory and the IK collaborator receives the new task
//! set at every transition.

use std::sync::{Arc, Mutex};

use nalgebra::Vector3;
use strider_contact::{FootSlot, Stance, StanceLabel, StanceSequence};
use strider_core::{SimContext, Shared, Tickable, lock};
use tracing::{debug, info};

use crate::ik::{DEFAULT_CONTACT_WEIGHT, IkSolver, IkTask, foot_task_name};
use crate::swing::SwingFoot;
use crate::types::{PointMass, PreviewTargets};

/// Minimum signed distance (m) from the CoM to the next support polygon
/// before leaving double support.
const GUARD_MIN_SEP_DISTANCE: f64 = -0.15;

/// Outcome of one state-machine tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FsmEvent {
    /// Time remained in the current stance.
    Running,
    /// Double-support guard failed; `distance` is the CoM distance to the
    /// next support polygon, when known.
    Hold { distance: Option<f64> },
    /// Moved from one stance index to the next.
    Transition { from: usize, to: usize },
    /// End of a non-cyclic sequence.
    Over,
}

/// Stance sequencing, swing-foot motion and IK task management.
pub struct WalkingFsm {
    stances: StanceSequence,
    com: Shared<PointMass>,
    ik: Arc<Mutex<dyn IkSolver>>,
    swing_foot: Shared<SwingFoot>,
    cycle: bool,
    cur_index: usize,
    rem_time: f64,
    is_over: bool,
}

impl WalkingFsm {
    /// State machine at the start of the first stance. The IK collaborator
    /// receives the first stance's foot tasks.
    pub fn new(
        stances: StanceSequence,
        com: Shared<PointMass>,
        ik: Arc<Mutex<dyn IkSolver>>,
        swing_foot: Shared<SwingFoot>,
        cycle: bool,
    ) -> Self {
        let rem_time = stances[0].duration();
        let fsm = Self {
            stances,
            com,
            ik,
            swing_foot,
            cycle,
            cur_index: 0,
            rem_time,
            is_over: false,
        };
        fsm.update_ik();
        fsm
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub const fn cur_index(&self) -> usize {
        self.cur_index
    }

    pub const fn rem_time(&self) -> f64 {
        self.rem_time
    }

    pub const fn is_over(&self) -> bool {
        self.is_over
    }

    pub const fn cycle(&self) -> bool {
        self.cycle
    }

    pub const fn stances(&self) -> &StanceSequence {
        &self.stances
    }

    pub fn com(&self) -> &Shared<PointMass> {
        &self.com
    }

    pub fn swing_foot(&self) -> &Shared<SwingFoot> {
        &self.swing_foot
    }

    pub fn cur_stance(&self) -> &Arc<Stance> {
        &self.stances[self.cur_index]
    }

    fn next_index(&self) -> usize {
        let n = self.stances.len();
        if self.cycle {
            (self.cur_index + 1) % n
        } else {
            (self.cur_index + 1).min(n - 1)
        }
    }

    /// Stance after the current one. Clamps to the current stance at the end
    /// of a non-cyclic sequence.
    pub fn next_stance(&self) -> &Arc<Stance> {
        &self.stances[self.next_index()]
    }

    /// Stance two steps ahead. Clamps to the last stance of a non-cyclic
    /// sequence.
    pub fn next_next_stance(&self) -> &Arc<Stance> {
        let n = self.stances.len();
        let index = if self.cycle {
            (self.cur_index + 2) % n
        } else {
            (self.cur_index + 2).min(n - 1)
        };
        &self.stances[index]
    }

    // -----------------------------------------------------------------------
    // Preview targets
    // -----------------------------------------------------------------------

    /// Switch time, horizon and terminal CoM state for the next preview.
    pub fn get_preview_targets(&self) -> PreviewTargets {
        let stance = self.cur_stance();
        let forward = 0.4 * stance.stance_foot().t();
        if stance.is_single_support() && self.rem_time < 0.5 * stance.duration() {
            let next = self.next_stance();
            let horizon =
                self.rem_time + next.duration() + 0.5 * self.next_next_stance().duration();
            let target_com = *next.com();
            PreviewTargets {
                switch_time: self.rem_time,
                horizon,
                target_com,
                target_comd: (target_com - stance.com()) / horizon,
            }
        } else if stance.is_double_support() {
            PreviewTargets {
                switch_time: self.rem_time,
                horizon: self.rem_time + 0.5 * self.next_stance().duration(),
                target_com: *stance.com(),
                target_comd: forward,
            }
        } else {
            PreviewTargets {
                switch_time: self.rem_time,
                horizon: self.rem_time,
                target_com: *stance.com(),
                target_comd: forward,
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the state machine by `dt` seconds.
    pub fn step(&mut self, dt: f64) -> FsmEvent {
        if self.is_over {
            return FsmEvent::Over;
        }
        if self.rem_time > 0.0 {
            let stance = self.cur_stance();
            if stance.is_single_support() {
                let progress = 1.0 - self.rem_time / stance.duration();
                lock(&self.swing_foot).update_pose(progress);
            }
            self.rem_time -= dt;
            return FsmEvent::Running;
        }
        if self.cur_stance().is_double_support() {
            let com: Vector3<f64> = lock(&self.com).p;
            let distance = self.next_stance().dist_to_sep_edge(&com);
            if !distance.is_some_and(|d| d > GUARD_MIN_SEP_DISTANCE) {
                info!(
                    index = self.cur_index,
                    ?distance,
                    "waiting for CoM to reach next support area"
                );
                return FsmEvent::Hold { distance };
            }
        }
        if !self.cycle && self.cur_index + 1 == self.stances.len() {
            self.is_over = true;
            debug!(index = self.cur_index, "stance sequence over");
            return FsmEvent::Over;
        }
        self.reset_swing_foot();
        let from = self.cur_index;
        self.cur_index = self.next_index();
        self.rem_time = self.cur_stance().duration();
        self.update_ik();
        debug!(
            from,
            to = self.cur_index,
            label = %self.cur_stance().label(),
            "stance transition"
        );
        FsmEvent::Transition {
            from,
            to: self.cur_index,
        }
    }

    /// Before leaving double support, start the swing of the foot that
    /// lifts during the coming single support.
    fn reset_swing_foot(&self) {
        let slot = match (self.cur_stance().label(), self.next_next_stance().label()) {
            (StanceLabel::DsR, StanceLabel::DsL) => FootSlot::Left,
            (StanceLabel::DsL, StanceLabel::DsR) => FootSlot::Right,
            _ => return,
        };
        if let (Some(start), Some(end)) = (
            self.cur_stance().foot(slot),
            self.next_next_stance().foot(slot),
        ) {
            lock(&self.swing_foot).reset(*start.pose(), *end.pose());
        }
    }

    /// Contact tasks for feet on the ground, swing task for the free foot.
    fn update_ik(&self) {
        let mut ik = lock(&self.ik);
        let weight = [FootSlot::Left, FootSlot::Right]
            .into_iter()
            .filter_map(|slot| ik.task_weight(foot_task_name(slot)))
            .reduce(f64::max)
            .unwrap_or(DEFAULT_CONTACT_WEIGHT);
        let stance = Arc::clone(self.cur_stance());
        for slot in [FootSlot::Left, FootSlot::Right] {
            ik.remove_task(foot_task_name(slot));
            let task = match stance.foot(slot) {
                Some(contact) => IkTask::contact(slot, Arc::clone(contact), weight),
                None => IkTask::swing(slot, Arc::clone(&self.swing_foot)),
            };
            ik.add_task(task);
        }
    }
}

impl std::fmt::Debug for WalkingFsm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkingFsm")
            .field("cur_index", &self.cur_index)
            .field("rem_time", &self.rem_time)
            .field("cycle", &self.cycle)
            .field("is_over", &self.is_over)
            .finish_non_exhaustive()
    }
}

impl Tickable for WalkingFsm {
    fn on_tick(&mut self, ctx: &mut SimContext<'_>) {
        self.step(ctx.dt);
    }

    fn name(&self) -> &str {
        "walking_fsm"
    }
}
