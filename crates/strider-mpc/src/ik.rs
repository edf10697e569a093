//! Inverse-kinematics collaborator.
//!
//! The walking state machine does not solve IK itself. It tells an
//! [`IkSolver`] which foot tasks are active: a contact task for every foot
//! on the ground and a pose task tracking the swing foot for the free one.

use std::collections::BTreeMap;
use std::sync::Arc;

use nalgebra::Isometry3;
use strider_contact::{Contact, FootSlot};
use strider_core::{Shared, lock};

use crate::swing::SwingFoot;

/// Weight of swing-foot pose tasks.
pub const SWING_TASK_WEIGHT: f64 = 0.1;

/// Weight of contact tasks when no previous weight is known.
pub const DEFAULT_CONTACT_WEIGHT: f64 = 1.0;

/// What a foot task tracks.
#[derive(Clone, Debug)]
pub enum IkTarget {
    /// Fixed contact pose.
    Contact(Arc<Contact>),
    /// Moving swing-foot pose.
    Swing(Shared<SwingFoot>),
}

impl IkTarget {
    /// Current target pose.
    pub fn pose(&self) -> Isometry3<f64> {
        match self {
            Self::Contact(contact) => *contact.pose(),
            Self::Swing(foot) => *lock(foot).pose(),
        }
    }

    pub const fn is_contact(&self) -> bool {
        matches!(self, Self::Contact(_))
    }
}

/// Named, weighted IK task.
#[derive(Clone, Debug)]
pub struct IkTask {
    pub name: String,
    pub target: IkTarget,
    pub weight: f64,
}

impl IkTask {
    pub fn contact(slot: FootSlot, contact: Arc<Contact>, weight: f64) -> Self {
        Self {
            name: foot_task_name(slot).to_owned(),
            target: IkTarget::Contact(contact),
            weight,
        }
    }

    pub fn swing(slot: FootSlot, foot: Shared<SwingFoot>) -> Self {
        Self {
            name: foot_task_name(slot).to_owned(),
            target: IkTarget::Swing(foot),
            weight: SWING_TASK_WEIGHT,
        }
    }
}

/// Task name of a foot.
pub const fn foot_task_name(slot: FootSlot) -> &'static str {
    match slot {
        FootSlot::Left => "left_foot",
        FootSlot::Right => "right_foot",
    }
}

/// Receiver of foot task updates.
pub trait IkSolver: Send {
    /// Add a task, replacing any task with the same name.
    fn add_task(&mut self, task: IkTask);

    fn remove_task(&mut self, name: &str) -> Option<IkTask>;

    fn task_weight(&self, name: &str) -> Option<f64>;
}

/// IK solver stand-in that records the active task set.
#[derive(Clone, Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, IkTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&IkTask> {
        self.tasks.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &IkTask> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl IkSolver for TaskRegistry {
    fn add_task(&mut self, task: IkTask) {
        self.tasks.insert(task.name.clone(), task);
    }

    fn remove_task(&mut self, name: &str) -> Option<IkTask> {
        self.tasks.remove(name)
    }

    fn task_weight(&self, name: &str) -> Option<f64> {
        self.tasks.get(name).map(|t| t.weight)
    }
}
