//! Contacts and stances for multi-contact walking.
//!
//! - [`Contact`]: rectangular foot contact with an inner friction pyramid
//! - [`Stance`]: labeled set of contacts with a CoM target, its
//!   static-equilibrium polygon and pendular acceleration cones
//! - [`StanceSequence`]: validated sequence walked by the state machine
//! - [`generate_staircase`]: seeded circular staircase
//!
//! Sequences load from and save to JSON through [`StanceFile`].

pub mod cone;
pub mod contact;
pub mod error;
pub mod io;
pub mod staircase;
pub mod stance;

pub use cone::{expand_reduced_pendular_cone, reduced_pendular_cone, static_equilibrium_polygon};
pub use contact::Contact;
pub use error::ContactError;
pub use io::{ContactRecord, StanceFile, StanceRecord};
pub use staircase::generate_staircase;
pub use stance::{FootSlot, Stance, StanceLabel, StanceSequence};
