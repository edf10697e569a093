//! Preview buffer between the planner and the integration loop.
//!
//! The planner replaces the whole preview at once; the consumer pops one
//! control at a time and holds it for its duration. Both sides share the
//! buffer through an `Arc`, and all state lives behind a single mutex so
//! an update can never interleave with a pop.

use std::sync::{Arc, Mutex};

use nalgebra::Vector3;
use strider_core::{SimContext, Shared, Tickable, lock};

use crate::error::PreviewError;
use crate::types::PointMass;

/// Duration of the zero control returned once the preview is exhausted.
pub const DEFAULT_CONTROL_DURATION: f64 = 0.1;

#[derive(Debug, Default)]
struct PreviewState {
    controls: Vec<Vector3<f64>>,
    durations: Vec<f64>,
    cursor: usize,
    switch_step: Option<usize>,
    current: Option<Vector3<f64>>,
    rem_time: f64,
}

impl PreviewState {
    fn pop(&mut self) -> (Vector3<f64>, f64) {
        if self.cursor < self.controls.len() {
            let k = self.cursor;
            self.cursor += 1;
            (self.controls[k], self.durations[k])
        } else {
            (Vector3::zeros(), DEFAULT_CONTROL_DURATION)
        }
    }
}

/// Copy of the buffer contents, for drawing and inspection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreviewSnapshot {
    pub controls: Vec<Vector3<f64>>,
    pub durations: Vec<f64>,
    /// Index of the next control to be consumed.
    pub cursor: usize,
    pub switch_step: Option<usize>,
}

/// Lock-guarded queue of upcoming CoM accelerations.
#[derive(Debug, Default)]
pub struct PreviewBuffer {
    state: Mutex<PreviewState>,
}

impl PreviewBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the preview and restart consumption from its first control.
    ///
    /// The control held by [`advance`](Self::advance) is dropped with the old
    /// preview: [`current_control`](Self::current_control) returns `None`
    /// until the next `advance`, which starts on the new first control.
    pub fn update(
        &self,
        controls: Vec<Vector3<f64>>,
        durations: Vec<f64>,
        switch_step: Option<usize>,
    ) -> Result<(), PreviewError> {
        if controls.len() != durations.len() {
            return Err(PreviewError::LengthMismatch {
                controls: controls.len(),
                durations: durations.len(),
            });
        }
        if let Some(s) = switch_step.filter(|&s| s >= controls.len()) {
            return Err(PreviewError::SwitchStepOutOfRange {
                switch_step: s,
                len: controls.len(),
            });
        }
        *lock(&self.state) = PreviewState {
            controls,
            durations,
            switch_step,
            ..PreviewState::default()
        };
        Ok(())
    }

    /// Drop the preview. Consumers fall back to the default control.
    pub fn reset(&self) {
        *lock(&self.state) = PreviewState::default();
    }

    /// Pop the next `(control, duration)`, or `(0, 0.1 s)` when empty.
    pub fn next_control(&self) -> (Vector3<f64>, f64) {
        lock(&self.state).pop()
    }

    /// Control to apply over the next `tick_dt` seconds.
    ///
    /// The current control is kept until less than one tick of its
    /// duration remains, then the next one is popped.
    pub fn advance(&self, tick_dt: f64) -> Vector3<f64> {
        let mut state = lock(&self.state);
        let current = match state.current {
            Some(u) if state.rem_time >= tick_dt => u,
            _ => {
                let (u, duration) = state.pop();
                state.current = Some(u);
                state.rem_time = duration;
                u
            }
        };
        state.rem_time -= tick_dt;
        current
    }

    pub fn snapshot(&self) -> PreviewSnapshot {
        let state = lock(&self.state);
        PreviewSnapshot {
            controls: state.controls.clone(),
            durations: state.durations.clone(),
            cursor: state.cursor,
            switch_step: state.switch_step,
        }
    }

    /// Control currently held by the consumer. `None` before the first
    /// [`advance`](Self::advance) after an update or reset.
    pub fn current_control(&self) -> Option<Vector3<f64>> {
        lock(&self.state).current
    }

    pub fn switch_step(&self) -> Option<usize> {
        lock(&self.state).switch_step
    }

    /// Number of controls not yet consumed.
    pub fn remaining(&self) -> usize {
        let state = lock(&self.state);
        state.controls.len().saturating_sub(state.cursor)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

// ---------------------------------------------------------------------------
// PreviewConsumer
// ---------------------------------------------------------------------------

/// Callback receiving the applied control and the tick duration.
pub type ControlCallback = Box<dyn FnMut(&Vector3<f64>, f64) + Send>;

/// Process applying buffered controls at tick rate.
pub struct PreviewConsumer {
    buffer: Arc<PreviewBuffer>,
    callback: ControlCallback,
}

impl PreviewConsumer {
    pub fn new(buffer: Arc<PreviewBuffer>, callback: ControlCallback) -> Self {
        Self { buffer, callback }
    }

    /// Consumer integrating each control into the CoM point mass.
    pub fn integrating(buffer: Arc<PreviewBuffer>, com: Shared<PointMass>) -> Self {
        Self::new(
            buffer,
            Box::new(move |u: &Vector3<f64>, dt: f64| {
                lock(&com).integrate_constant_accel(u, dt);
            }),
        )
    }

    pub fn buffer(&self) -> &Arc<PreviewBuffer> {
        &self.buffer
    }
}

impl std::fmt::Debug for PreviewConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewConsumer")
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl Tickable for PreviewConsumer {
    fn on_tick(&mut self, ctx: &mut SimContext<'_>) {
        let u = self.buffer.advance(ctx.dt);
        (self.callback)(&u, ctx.dt);
    }

    fn name(&self) -> &str {
        "preview_consumer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strider_core::{CompTimes, WalkTime, shared};

    #[allow(clippy::cast_precision_loss)]
    fn controls(n: usize) -> Vec<Vector3<f64>> {
        (0..n).map(|k| Vector3::new(k as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn pops_in_order_then_default() {
        let buffer = PreviewBuffer::new();
        buffer.update(controls(3), vec![0.1, 0.2, 0.3], None).unwrap();
        for k in 0..3 {
            let (u, dt) = buffer.next_control();
            #[allow(clippy::cast_precision_loss)]
            let expected = k as f64;
            assert_relative_eq!(u.x, expected);
            assert_relative_eq!(dt, 0.1 * (expected + 1.0), epsilon = 1e-12);
        }
        assert!(buffer.is_empty());
        let (u, dt) = buffer.next_control();
        assert_relative_eq!(u, Vector3::zeros());
        assert_relative_eq!(dt, DEFAULT_CONTROL_DURATION);
    }

    #[test]
    fn update_restarts_and_reset_clears() {
        let buffer = PreviewBuffer::new();
        buffer.update(controls(4), vec![0.1; 4], Some(1)).unwrap();
        buffer.next_control();
        buffer.next_control();
        assert_eq!(buffer.remaining(), 2);

        buffer.update(controls(5), vec![0.1; 5], Some(2)).unwrap();
        let snap = buffer.snapshot();
        assert_eq!(snap.cursor, 0);
        assert_eq!(snap.controls.len(), 5);
        assert_eq!(snap.switch_step, Some(2));

        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.snapshot(), PreviewSnapshot::default());
        assert_eq!(buffer.current_control(), None);
    }

    #[test]
    fn update_drops_held_control() {
        let buffer = PreviewBuffer::new();
        buffer.update(controls(2), vec![0.1, 0.1], None).unwrap();
        buffer.advance(0.1);
        assert_relative_eq!(buffer.advance(0.1).x, 1.0);
        assert_eq!(buffer.current_control(), Some(Vector3::new(1.0, 0.0, 0.0)));

        buffer.update(controls(3), vec![0.1; 3], None).unwrap();
        assert_eq!(buffer.current_control(), None);
        assert_relative_eq!(buffer.advance(0.1).x, 0.0);
        assert_eq!(buffer.current_control(), Some(Vector3::zeros()));
        assert_eq!(buffer.remaining(), 2);
    }

    #[test]
    fn invalid_updates_leave_buffer_untouched() {
        let buffer = PreviewBuffer::new();
        buffer.update(controls(2), vec![0.1; 2], None).unwrap();
        assert_eq!(
            buffer.update(controls(3), vec![0.1; 2], None),
            Err(PreviewError::LengthMismatch {
                controls: 3,
                durations: 2
            })
        );
        assert!(matches!(
            buffer.update(controls(3), vec![0.1; 3], Some(3)),
            Err(PreviewError::SwitchStepOutOfRange { .. })
        ));
        assert_eq!(buffer.remaining(), 2);
    }

    #[test]
    fn advance_holds_each_control_for_its_duration() {
        let buffer = PreviewBuffer::new();
        buffer.update(controls(2), vec![0.1, 0.1], None).unwrap();
        let applied: Vec<f64> = (0..7).map(|_| buffer.advance(0.03).x).collect();
        // 0.1 s per control at 0.03 s ticks: three ticks each, then default.
        assert_eq!(applied, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn consumer_integrates_com() {
        let buffer = Arc::new(PreviewBuffer::new());
        let com = shared(PointMass::new(Vector3::zeros()));
        buffer
            .update(vec![Vector3::new(1.0, 0.0, 0.0)], vec![2.0], None)
            .unwrap();
        let mut consumer = PreviewConsumer::integrating(Arc::clone(&buffer), Arc::clone(&com));
        let mut metrics = CompTimes::new();
        for _ in 0..10 {
            let mut ctx = SimContext::new(0.1, WalkTime::ZERO, &mut metrics);
            consumer.on_tick(&mut ctx);
        }
        let com = lock(&com);
        assert_relative_eq!(com.pd.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(com.p.x, 0.5, epsilon = 1e-9);
        assert_eq!(buffer.current_control(), Some(Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn buffer_is_shared_across_threads() {
        let buffer = Arc::new(PreviewBuffer::new());
        let writer = Arc::clone(&buffer);
        std::thread::spawn(move || {
            writer.update(controls(3), vec![0.1; 3], Some(1)).unwrap();
        })
        .join()
        .unwrap();
        assert_eq!(buffer.remaining(), 3);
    }
}
