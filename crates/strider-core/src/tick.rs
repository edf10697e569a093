//! Tick-driven process contract.

use crate::metrics::MetricsSink;
use crate::time::WalkTime;

/// Per-tick view of the simulation handed to every process.
pub struct SimContext<'a> {
    /// Tick duration in seconds.
    pub dt: f64,
    /// Simulation time at the start of the tick.
    pub time: WalkTime,
    /// Sink for computation-time samples.
    pub metrics: &'a mut dyn MetricsSink,
}

impl<'a> SimContext<'a> {
    pub fn new(dt: f64, time: WalkTime, metrics: &'a mut dyn MetricsSink) -> Self {
        Self { dt, time, metrics }
    }
}

/// A process scheduled once per simulation tick.
///
/// Implementations return promptly; failures are handled inside the tick
/// (logged and skipped) rather than propagated to the loop.
pub trait Tickable {
    fn on_tick(&mut self, ctx: &mut SimContext<'_>);

    /// Human-readable name for this process.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
