//! Process scheduling.
//!
//! [`Process`] closes the set of things the simulation ticks: the state
//! machine, the predictive controller, the preview consumer and the
//! drawers. [`Simulation`] ticks its scheduled processes in order, then the
//! extra ones (drawers), and accumulates computation times.

use std::time::Instant;

use strider_core::{CompTimes, Shared, SimContext, Tickable, WalkTime, lock};
use tracing::trace;

use crate::controller::TubePredictiveControl;
use crate::draw::Drawer;
use crate::fsm::WalkingFsm;
use crate::preview::PreviewConsumer;

/// A tick-driven process of the walking pipeline.
pub enum Process {
    Fsm(Shared<WalkingFsm>),
    Controller(TubePredictiveControl),
    Preview(PreviewConsumer),
    Drawer(Drawer),
}

impl Tickable for Process {
    fn on_tick(&mut self, ctx: &mut SimContext<'_>) {
        match self {
            Self::Fsm(fsm) => lock(fsm).on_tick(ctx),
            Self::Controller(controller) => controller.on_tick(ctx),
            Self::Preview(consumer) => consumer.on_tick(ctx),
            Self::Drawer(drawer) => drawer.on_tick(ctx),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Fsm(_) => "walking_fsm",
            Self::Controller(controller) => controller.name(),
            Self::Preview(consumer) => consumer.name(),
            Self::Drawer(drawer) => drawer.name(),
        }
    }
}

impl From<TubePredictiveControl> for Process {
    fn from(controller: TubePredictiveControl) -> Self {
        Self::Controller(controller)
    }
}

impl From<PreviewConsumer> for Process {
    fn from(consumer: PreviewConsumer) -> Self {
        Self::Preview(consumer)
    }
}

impl From<Drawer> for Process {
    fn from(drawer: Drawer) -> Self {
        Self::Drawer(drawer)
    }
}

/// Fixed-step simulation loop.
pub struct Simulation {
    dt: f64,
    time: WalkTime,
    nb_ticks: u64,
    processes: Vec<Process>,
    extras: Vec<Process>,
    comp_times: CompTimes,
}

impl Simulation {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            time: WalkTime::ZERO,
            nb_ticks: 0,
            processes: Vec::new(),
            extras: Vec::new(),
            comp_times: CompTimes::new(),
        }
    }

    /// Schedule a process, ticked in insertion order.
    pub fn schedule(&mut self, process: impl Into<Process>) {
        self.processes.push(process.into());
    }

    /// Schedule a process ticked after all regular ones.
    pub fn schedule_extra(&mut self, process: impl Into<Process>) {
        self.extras.push(process.into());
    }

    /// Tick every process once and advance time by `dt`.
    pub fn step(&mut self) {
        let time = self.time;
        for process in self.processes.iter_mut().chain(self.extras.iter_mut()) {
            let t0 = Instant::now();
            let mut ctx = SimContext::new(self.dt, time, &mut self.comp_times);
            process.on_tick(&mut ctx);
            trace!(process = process.name(), elapsed = ?t0.elapsed(), "tick");
        }
        self.time.tick(self.dt);
        self.nb_ticks += 1;
    }

    /// Run for `duration` seconds of simulated time.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn run_for(&mut self, duration: f64) {
        let ticks = (duration / self.dt).round().max(0.0) as u64;
        self.run_steps(ticks);
    }

    pub fn run_steps(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    pub const fn time(&self) -> WalkTime {
        self.time
    }

    pub const fn nb_ticks(&self) -> u64 {
        self.nb_ticks
    }

    pub const fn comp_times(&self) -> &CompTimes {
        &self.comp_times
    }

    /// Names of the scheduled processes, regular ones first.
    pub fn process_names(&self) -> Vec<&str> {
        self.processes
            .iter()
            .chain(&self.extras)
            .map(Tickable::name)
            .collect()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("dt", &self.dt)
            .field("time", &self.time)
            .field("processes", &self.process_names())
            .finish_non_exhaustive()
    }
}
