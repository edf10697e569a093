//! Convex geometry kernel for contact-stability computations.
//!
//! - [`Polygon`]: 2D convex polygons (hull, intersection, signed distance)
//! - [`compute_polytope_halfspaces`]: 3D vertex set to `A x <= b`
//! - [`ProjectionProblem`]: projection of an LP feasible set onto its first
//!   two coordinates, by iterative ray shooting with Clarabel

pub mod error;
pub mod polygon;
pub mod polytope;
pub mod projection;
pub mod sparse;

pub use error::GeometryError;
pub use polygon::Polygon;
pub use polytope::{Halfspaces, compute_polytope_halfspaces};
pub use projection::{ProjectionProblem, ProjectionSettings};
pub use sparse::{csc_constraints, csc_cost};
