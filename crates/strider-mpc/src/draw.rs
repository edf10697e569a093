//! Drawing collaborator and the drawer processes.
//!
//! Drawers never render anything themselves. They hand [`Primitive`]s to a
//! [`DrawSink`] and keep the returned [`DrawHandle`]s so they can erase
//! their previous frame before drawing the next one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use nalgebra::Vector3;
use strider_core::{SimContext, Shared, Tickable, lock};

use crate::preview::PreviewBuffer;
use crate::solver::double_integrator;
use crate::tube::ComTube;
use crate::types::PointMass;

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Opaque handle of a drawn primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Black,
    Blue,
    Green,
    Red,
    Yellow,
}

/// Something a viewer can draw.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Point {
        pos: Vector3<f64>,
        color: Color,
    },
    Line {
        from: Vector3<f64>,
        to: Vector3<f64>,
        color: Color,
    },
    /// Convex hull of the vertices.
    Polytope {
        vertices: Vec<Vector3<f64>>,
        color: Color,
    },
}

/// Viewer collaborator.
pub trait DrawSink: Send {
    fn draw(&mut self, primitive: Primitive) -> DrawHandle;

    fn erase(&mut self, handle: DrawHandle);
}

/// Sink that draws nothing.
#[derive(Debug, Default)]
pub struct NullDrawSink {
    next: u64,
}

impl DrawSink for NullDrawSink {
    fn draw(&mut self, _primitive: Primitive) -> DrawHandle {
        self.next += 1;
        DrawHandle(self.next)
    }

    fn erase(&mut self, _handle: DrawHandle) {}
}

/// Sink keeping every live primitive in memory.
#[derive(Debug, Default)]
pub struct RecordingDrawSink {
    next: u64,
    live: BTreeMap<DrawHandle, Primitive>,
    total_drawn: u64,
}

impl RecordingDrawSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitives drawn and not yet erased.
    pub fn live(&self) -> impl Iterator<Item = &Primitive> {
        self.live.values()
    }

    pub fn nb_live(&self) -> usize {
        self.live.len()
    }

    pub const fn total_drawn(&self) -> u64 {
        self.total_drawn
    }
}

impl DrawSink for RecordingDrawSink {
    fn draw(&mut self, primitive: Primitive) -> DrawHandle {
        self.next += 1;
        self.total_drawn += 1;
        let handle = DrawHandle(self.next);
        self.live.insert(handle, primitive);
        handle
    }

    fn erase(&mut self, handle: DrawHandle) {
        self.live.remove(&handle);
    }
}

/// Shared handle on a sink.
pub type SharedSink = Arc<Mutex<dyn DrawSink>>;

fn erase_all(sink: &mut dyn DrawSink, handles: &mut Vec<DrawHandle>) {
    for handle in handles.drain(..) {
        sink.erase(handle);
    }
}

// ---------------------------------------------------------------------------
// PreviewDrawer
// ---------------------------------------------------------------------------

/// Draws the CoM path predicted by the buffered preview, blue before the
/// contact switch and yellow after it.
pub struct PreviewDrawer {
    buffer: Arc<PreviewBuffer>,
    com: Shared<PointMass>,
    sink: SharedSink,
    handles: Vec<DrawHandle>,
}

impl PreviewDrawer {
    pub fn new(buffer: Arc<PreviewBuffer>, com: Shared<PointMass>, sink: SharedSink) -> Self {
        Self {
            buffer,
            com,
            sink,
            handles: Vec::new(),
        }
    }

    /// Integrate the remaining preview from the current CoM state.
    fn predicted_path(&self) -> Vec<(Vector3<f64>, Color)> {
        let snapshot = self.buffer.snapshot();
        let com = lock(&self.com).clone();
        let mut x = com.state();
        let mut path = Vec::with_capacity(snapshot.controls.len());
        for k in snapshot.cursor..snapshot.controls.len() {
            let (a, b) = double_integrator(snapshot.durations[k]);
            x = a * x + b * snapshot.controls[k];
            let color = match snapshot.switch_step {
                Some(s) if k > s => Color::Yellow,
                _ => Color::Blue,
            };
            path.push((Vector3::new(x[0], x[1], x[2]), color));
        }
        path
    }
}

impl Tickable for PreviewDrawer {
    fn on_tick(&mut self, _ctx: &mut SimContext<'_>) {
        let path = self.predicted_path();
        let start = lock(&self.com).p;
        let mut sink = lock(&self.sink);
        erase_all(&mut *sink, &mut self.handles);
        let mut from = start;
        for (to, color) in path {
            self.handles.push(sink.draw(Primitive::Line { from, to, color }));
            from = to;
        }
    }

    fn name(&self) -> &str {
        "preview_drawer"
    }
}

// ---------------------------------------------------------------------------
// TubeDrawer
// ---------------------------------------------------------------------------

/// Scale from accelerations (m/s²) to drawn lengths (m).
pub const ACC_SCALE: f64 = 0.1;

/// Draws the latest tube: primal polytopes, dual cones around the CoM
/// target and the current CoM acceleration.
pub struct TubeDrawer {
    tube: Shared<Option<ComTube>>,
    com: Shared<PointMass>,
    sink: SharedSink,
    handles: Vec<DrawHandle>,
}

impl TubeDrawer {
    pub fn new(tube: Shared<Option<ComTube>>, com: Shared<PointMass>, sink: SharedSink) -> Self {
        Self {
            tube,
            com,
            sink,
            handles: Vec::new(),
        }
    }

    fn primitives(&self) -> Vec<Primitive> {
        let guard = lock(&self.tube);
        let Some(tube) = guard.as_ref() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (i, vertices) in tube.primal_vrep().iter().enumerate() {
            let color = if i == 0 { Color::Blue } else { Color::Yellow };
            match vertices.as_slice() {
                [pos] => out.push(Primitive::Point { pos: *pos, color }),
                _ => out.push(Primitive::Polytope {
                    vertices: vertices.clone(),
                    color,
                }),
            }
        }
        let center = tube.target_com();
        for (i, cone) in tube.dual_vrep().iter().enumerate() {
            let color = if i == 0 { Color::Blue } else { Color::Yellow };
            out.push(Primitive::Polytope {
                vertices: cone.iter().map(|v| center + ACC_SCALE * v).collect(),
                color,
            });
        }
        let com = lock(&self.com);
        out.push(Primitive::Line {
            from: com.p,
            to: com.p + ACC_SCALE * com.pdd,
            color: Color::Red,
        });
        out
    }
}

impl Tickable for TubeDrawer {
    fn on_tick(&mut self, _ctx: &mut SimContext<'_>) {
        let primitives = self.primitives();
        let mut sink = lock(&self.sink);
        erase_all(&mut *sink, &mut self.handles);
        self.handles
            .extend(primitives.into_iter().map(|p| sink.draw(p)));
    }

    fn name(&self) -> &str {
        "tube_drawer"
    }
}

// ---------------------------------------------------------------------------
// TrajectoryDrawer
// ---------------------------------------------------------------------------

/// Traces the CoM path as a growing polyline.
pub struct TrajectoryDrawer {
    com: Shared<PointMass>,
    sink: SharedSink,
    color: Color,
    last: Option<Vector3<f64>>,
    handles: Vec<DrawHandle>,
}

impl TrajectoryDrawer {
    pub fn new(com: Shared<PointMass>, sink: SharedSink) -> Self {
        Self {
            com,
            sink,
            color: Color::Black,
            last: None,
            handles: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Erase the whole trace.
    pub fn clear(&mut self) {
        erase_all(&mut *lock(&self.sink), &mut self.handles);
        self.last = None;
    }
}

impl Tickable for TrajectoryDrawer {
    fn on_tick(&mut self, _ctx: &mut SimContext<'_>) {
        let pos = lock(&self.com).p;
        if let Some(from) = self.last {
            let handle = lock(&self.sink).draw(Primitive::Line {
                from,
                to: pos,
                color: self.color,
            });
            self.handles.push(handle);
        }
        self.last = Some(pos);
    }

    fn name(&self) -> &str {
        "trajectory_drawer"
    }
}

// ---------------------------------------------------------------------------
// Drawer
// ---------------------------------------------------------------------------

/// Closed set of drawer processes.
pub enum Drawer {
    Preview(PreviewDrawer),
    Tube(TubeDrawer),
    Trajectory(TrajectoryDrawer),
}

impl Tickable for Drawer {
    fn on_tick(&mut self, ctx: &mut SimContext<'_>) {
        match self {
            Self::Preview(d) => d.on_tick(ctx),
            Self::Tube(d) => d.on_tick(ctx),
            Self::Trajectory(d) => d.on_tick(ctx),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Preview(d) => d.name(),
            Self::Tube(d) => d.name(),
            Self::Trajectory(d) => d.name(),
        }
    }
}
