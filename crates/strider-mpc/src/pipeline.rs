//! Builder wiring a complete walking pipeline.
//!
//! [`WalkingBuilder`] turns a [`WalkingConfig`] into a ready-to-run
//! [`Simulation`]: state machine, tube predictive controller and preview
//! consumer, plus optional drawers. Handles on the shared state come back
//! with the simulation in a [`WalkingPipeline`].
//!
//! ```no_run
//! use strider_core::WalkingConfig;
//! use strider_mpc::WalkingBuilder;
//!
//! let mut pipeline = WalkingBuilder::new(WalkingConfig::default()).build().unwrap();
//! pipeline.sim.run_for(2.0);
//! ```

use std::sync::{Arc, Mutex};

use strider_contact::{StanceSequence, generate_staircase};
use strider_core::{Shared, StriderError, WalkingConfig, shared};
use tracing::info;

use crate::controller::TubePredictiveControl;
use crate::draw::{Drawer, PreviewDrawer, SharedSink, TrajectoryDrawer, TubeDrawer};
use crate::fsm::WalkingFsm;
use crate::ik::{IkSolver, TaskRegistry};
use crate::preview::{PreviewBuffer, PreviewConsumer};
use crate::process::{Process, Simulation};
use crate::swing::SwingFoot;
use crate::tube::{ComTube, TubeSettings};
use crate::types::PointMass;

// ---------------------------------------------------------------------------
// WalkingPipeline
// ---------------------------------------------------------------------------

/// A scheduled simulation and handles on the state its processes share.
pub struct WalkingPipeline {
    pub sim: Simulation,
    pub fsm: Shared<WalkingFsm>,
    pub com: Shared<PointMass>,
    pub buffer: Arc<PreviewBuffer>,
    /// Last tube built by the controller.
    pub latest_tube: Shared<Option<ComTube>>,
    pub ik: Shared<TaskRegistry>,
}

impl std::fmt::Debug for WalkingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkingPipeline")
            .field("sim", &self.sim)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// WalkingBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for a [`WalkingPipeline`].
///
/// Without an explicit stance sequence, the staircase described by the
/// configuration is generated.
pub struct WalkingBuilder {
    config: WalkingConfig,
    stances: Option<StanceSequence>,
    draw_sink: Option<SharedSink>,
}

impl WalkingBuilder {
    #[must_use]
    pub fn new(config: WalkingConfig) -> Self {
        Self {
            config,
            stances: None,
            draw_sink: None,
        }
    }

    /// Walk the given sequence instead of a generated staircase.
    #[must_use]
    pub fn with_stances(mut self, stances: StanceSequence) -> Self {
        self.stances = Some(stances);
        self
    }

    /// Schedule preview, tube and trajectory drawers on `sink`.
    #[must_use]
    pub fn with_draw_sink(mut self, sink: SharedSink) -> Self {
        self.draw_sink = Some(sink);
        self
    }

    /// Validate the configuration and assemble the pipeline.
    ///
    /// The CoM starts at rest on the target of the first stance. A generated
    /// staircase uses the same projection settings as the controller's tubes.
    pub fn build(self) -> Result<WalkingPipeline, StriderError> {
        self.config.validate()?;
        let stances = match self.stances {
            Some(stances) => stances,
            None => generate_staircase(
                &self.config.staircase,
                &TubeSettings::from(&self.config.mpc).projection,
            )
            .map_err(|err| StriderError::Stances(err.to_string()))?,
        };
        let first = Arc::clone(&stances[0]);

        let com = shared(PointMass::new(*first.com()));
        let swing_foot = shared(SwingFoot::new(
            *first.stance_foot().pose(),
            self.config.fsm.swing_height,
        ));
        let ik = shared(TaskRegistry::new());
        let ik_solver: Arc<Mutex<dyn IkSolver>> = ik.clone();
        let nb_stances = stances.len();
        let fsm = shared(WalkingFsm::new(
            stances,
            Arc::clone(&com),
            ik_solver,
            swing_foot,
            self.config.fsm.cycle,
        ));

        let buffer = Arc::new(PreviewBuffer::new());
        let controller = TubePredictiveControl::new(
            Arc::clone(&fsm),
            Arc::clone(&com),
            Arc::clone(&buffer),
            self.config.mpc.clone(),
        );
        let latest_tube = controller.latest_tube();

        let mut sim = Simulation::new(self.config.sim.dt);
        sim.schedule(Process::Fsm(Arc::clone(&fsm)));
        sim.schedule(controller);
        sim.schedule(PreviewConsumer::integrating(
            Arc::clone(&buffer),
            Arc::clone(&com),
        ));

        if let Some(sink) = self.draw_sink {
            sim.schedule_extra(Drawer::Preview(PreviewDrawer::new(
                Arc::clone(&buffer),
                Arc::clone(&com),
                Arc::clone(&sink),
            )));
            sim.schedule_extra(Drawer::Tube(TubeDrawer::new(
                Arc::clone(&latest_tube),
                Arc::clone(&com),
                Arc::clone(&sink),
            )));
            sim.schedule_extra(Drawer::Trajectory(TrajectoryDrawer::new(
                Arc::clone(&com),
                sink,
            )));
        }

        info!(
            nb_stances,
            dt = self.config.sim.dt,
            nb_steps = self.config.mpc.nb_steps,
            "walking pipeline ready"
        );
        Ok(WalkingPipeline {
            sim,
            fsm,
            com,
            buffer,
            latest_tube,
            ik,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
