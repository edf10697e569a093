//! Support regions derived from the contact wrench cone.
//!
//! Each region is the projection of a linear feasibility program over the
//! non-negative weights `λ` of the contact force generators `(p_j, f_j)`:
//!
//! - static-equilibrium polygon: CoM positions `(x, y)` with
//!   `Σ λ_j f_j = (0, 0, 1)` and `Σ λ_j p_j × f_j = (y, -x, 0)`;
//! - reduced pendular cone: points `(a, b)` such that, for every CoM vertex
//!   `c_i`, some `λ^i` gives `Σ λ^i_j f_j = (a, b, 1)` and
//!   `Σ λ^i_j (p_j - c_i) × f_j = 0`.
//!
//! A reduced point `(a, b)` maps to the CoM acceleration
//! `((g + z̈) a, (g + z̈) b, z̈)`.

use nalgebra::{DMatrix, DVector, Vector3};
use strider_geometry::{GeometryError, Polygon, ProjectionProblem, ProjectionSettings};

/// Force generator: application point and force ray.
pub type Generator = (Vector3<f64>, Vector3<f64>);

/// Projection bound on reduced coordinates. Friction keeps them below `μ`.
const REDUCED_BOUND: f64 = 1e2;

/// Compute the static-equilibrium polygon of a set of force generators.
pub fn static_equilibrium_polygon(
    generators: &[Generator],
    settings: &ProjectionSettings,
) -> Result<Polygon, GeometryError> {
    let n = generators.len();
    if n == 0 {
        return Err(GeometryError::Degenerate("no contact force generator".into()));
    }
    let dim = ProjectionProblem::DIM;
    let mut eq = DMatrix::zeros(6, dim + n);
    let mut rhs = DVector::zeros(6);
    for (j, (p, f)) in generators.iter().enumerate() {
        let tau = p.cross(f);
        for r in 0..3 {
            eq[(r, dim + j)] = f[r];
            eq[(3 + r, dim + j)] = tau[r];
        }
    }
    rhs[2] = 1.0;
    // Σ λ τ_x - y = 0 and Σ λ τ_y + x = 0
    eq[(3, 1)] = -1.0;
    eq[(4, 0)] = 1.0;

    let bound = generators
        .iter()
        .map(|(p, _)| p.x.abs().max(p.y.abs()))
        .fold(1.0, f64::max);
    ProjectionProblem::new(eq, rhs)?
        .with_bound(10.0 * bound)
        .compute_polygon(settings)
}

/// Compute the reduced pendular acceleration cone over a set of CoM
/// vertices.
///
/// The result is the intersection over all vertices of the single-vertex
/// cones, obtained from one joint program with one weight vector per vertex.
pub fn reduced_pendular_cone(
    generators: &[Generator],
    com_vertices: &[Vector3<f64>],
    settings: &ProjectionSettings,
) -> Result<Polygon, GeometryError> {
    let n = generators.len();
    if n == 0 {
        return Err(GeometryError::Degenerate("no contact force generator".into()));
    }
    if com_vertices.is_empty() {
        return Err(GeometryError::Degenerate("no CoM vertex".into()));
    }
    let dim = ProjectionProblem::DIM;
    let k = com_vertices.len();
    let mut eq = DMatrix::zeros(6 * k, dim + n * k);
    let mut rhs = DVector::zeros(6 * k);
    for (i, c) in com_vertices.iter().enumerate() {
        let row = 6 * i;
        let col = dim + n * i;
        for (j, (p, f)) in generators.iter().enumerate() {
            let tau = (p - c).cross(f);
            for r in 0..3 {
                eq[(row + r, col + j)] = f[r];
                eq[(row + 3 + r, col + j)] = tau[r];
            }
        }
        eq[(row, 0)] = -1.0;
        eq[(row + 1, 1)] = -1.0;
        rhs[row + 2] = 1.0;
    }
    ProjectionProblem::new(eq, rhs)?
        .with_bound(REDUCED_BOUND)
        .compute_polygon(settings)
}

/// Expand a reduced pendular cone to 3D acceleration vertices.
///
/// The cone is described by its apex at gravity `(0, 0, -g)` and its
/// section at `z̈ = zdd_max`, which defaults to `g`.
pub fn expand_reduced_pendular_cone(
    reduced: &Polygon,
    gravity: f64,
    zdd_max: Option<f64>,
) -> Vec<Vector3<f64>> {
    let zdd = zdd_max.unwrap_or(gravity);
    let scale = gravity + zdd;
    std::iter::once(Vector3::new(0.0, 0.0, -gravity))
        .chain(
            reduced
                .vertices()
                .iter()
                .map(|v| Vector3::new(scale * v.x, scale * v.y, zdd)),
        )
        .collect()
}
