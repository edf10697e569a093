//! Multi-contact walking with CoM tube preview control.
//!
//! Each simulation tick runs the same pipeline:
//!
//! 1. **Walking FSM** ([`WalkingFsm`]): sequences double- and single-support
//!    stances, moves the swing foot and derives preview targets
//! 2. **CoM tube** ([`ComTube`]): polytope of CoM positions between the
//!    current CoM and the target, with the acceleration cones it admits
//! 3. **Linear predictive control** ([`LinearPredictiveControl`]): QP over a
//!    double integrator whose accelerations stay in the tube cones
//! 4. **Preview buffer** ([`PreviewBuffer`]): hands planned accelerations to
//!    the CoM integrator one control at a time
//!
//! [`WalkingBuilder`] assembles all of it into a [`Simulation`].

pub mod controller;
pub mod draw;
pub mod error;
pub mod fsm;
pub mod ik;
pub mod pipeline;
pub mod preview;
pub mod process;
pub mod solver;
pub mod swing;
pub mod tube;
pub mod types;

pub use controller::TubePredictiveControl;
pub use draw::{
    Color, DrawHandle, DrawSink, Drawer, NullDrawSink, PreviewDrawer, Primitive,
    RecordingDrawSink, SharedSink, TrajectoryDrawer, TubeDrawer,
};
pub use error::{MpcError, PreviewError, TubeStage};
pub use fsm::{FsmEvent, WalkingFsm};
pub use ik::{IkSolver, IkTarget, IkTask, TaskRegistry, foot_task_name};
pub use pipeline::{WalkingBuilder, WalkingPipeline};
pub use preview::{ControlCallback, PreviewBuffer, PreviewConsumer, PreviewSnapshot};
pub use process::{Process, Simulation};
pub use solver::{LinearPredictiveControl, MpcSolution, compute_switch_step, double_integrator};
pub use swing::SwingFoot;
pub use tube::{ComTube, TubeSettings};
pub use types::{PointMass, PreviewTargets};
