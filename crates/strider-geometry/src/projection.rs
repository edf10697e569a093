//! Projection of a polyhedral set onto the plane by ray shooting.
//!
//! The set is the feasible region of
//!
//! ```text
//!     M [x; λ] = h,   λ >= 0,   |x_i| <= bound
//! ```
//!
//! with `x ∈ R²`. Its projection onto `x` is a convex polygon, recovered by
//! the iterative inner-approximation scheme of Bretl and Lall: start from
//! three support points, then repeatedly shoot along the outward normal of
//! every inner edge and insert the support point whenever it lies beyond the
//! edge. Each support point is one LP solved with Clarabel.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{NonnegativeConeT, ZeroConeT},
};
use nalgebra::{DMatrix, DVector, Vector2};
use tracing::trace;

use crate::error::GeometryError;
use crate::polygon::Polygon;
use crate::sparse::csc_constraints;

/// Settings of the ray-shooting loop.
#[derive(Clone, Debug)]
pub struct ProjectionSettings {
    /// Maximum number of LPs per polygon (including the three seeds).
    pub max_lps: usize,
    /// Minimum outward gain for a new support point to be inserted.
    pub tolerance: f64,
    /// Maximum interior-point iterations per LP.
    pub max_solver_iters: u32,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            max_lps: 48,
            tolerance: 1e-5,
            max_solver_iters: 100,
        }
    }
}

/// Linear feasibility problem projected onto its first two variables.
#[derive(Clone, Debug)]
pub struct ProjectionProblem {
    /// Equality matrix over `[x; λ]`.
    eq: DMatrix<f64>,
    /// Equality right-hand side.
    rhs: DVector<f64>,
    /// Box bound on both projected coordinates.
    bound: f64,
}

impl ProjectionProblem {
    /// Number of projected coordinates.
    pub const DIM: usize = 2;

    pub fn new(eq: DMatrix<f64>, rhs: DVector<f64>) -> Result<Self, GeometryError> {
        if eq.nrows() != rhs.len() {
            return Err(GeometryError::DimensionMismatch {
                expected: eq.nrows(),
                got: rhs.len(),
            });
        }
        if eq.ncols() <= Self::DIM {
            return Err(GeometryError::DimensionMismatch {
                expected: Self::DIM + 1,
                got: eq.ncols(),
            });
        }
        Ok(Self {
            eq,
            rhs,
            bound: 1e3,
        })
    }

    /// Replace the box bound keeping unbounded projections finite.
    #[must_use]
    pub const fn with_bound(mut self, bound: f64) -> Self {
        self.bound = bound;
        self
    }

    pub fn n_lambda(&self) -> usize {
        self.eq.ncols() - Self::DIM
    }

    /// Maximize `direction · x` over the feasible set.
    pub fn support(
        &self,
        direction: &Vector2<f64>,
        settings: &ProjectionSettings,
    ) -> Result<Vector2<f64>, GeometryError> {
        let n_z = self.eq.ncols();
        let n_eq = self.eq.nrows();
        let n_lambda = self.n_lambda();
        let n_ineq = n_lambda + 2 * Self::DIM;

        let mut a_all = DMatrix::zeros(n_eq + n_ineq, n_z);
        let mut b_all = DVector::zeros(n_eq + n_ineq);
        a_all.rows_mut(0, n_eq).copy_from(&self.eq);
        b_all.rows_mut(0, n_eq).copy_from(&self.rhs);

        // -λ <= 0
        let mut row = n_eq;
        for j in 0..n_lambda {
            a_all[(row, Self::DIM + j)] = -1.0;
            row += 1;
        }
        // |x_i| <= bound
        for i in 0..Self::DIM {
            a_all[(row, i)] = 1.0;
            b_all[row] = self.bound;
            a_all[(row + 1, i)] = -1.0;
            b_all[row + 1] = self.bound;
            row += 2;
        }

        let p_csc = CscMatrix::zeros((n_z, n_z));
        let a_csc = csc_constraints(&a_all);
        let mut q = vec![0.0; n_z];
        q[0] = -direction.x;
        q[1] = -direction.y;
        let b: Vec<f64> = b_all.iter().copied().collect();
        let cones = vec![ZeroConeT(n_eq), NonnegativeConeT(n_ineq)];

        let lp_settings = DefaultSettingsBuilder::default()
            .max_iter(settings.max_solver_iters)
            .verbose(false)
            .build()
            .map_err(|e| GeometryError::Solver(format!("{e:?}")))?;

        let mut solver = DefaultSolver::new(&p_csc, &q, &a_csc, &b, &cones, lp_settings)
            .map_err(|e| GeometryError::Solver(format!("{e:?}")))?;
        solver.solve();
        let sol = &solver.solution;
        match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                Ok(Vector2::new(sol.x[0], sol.x[1]))
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => Err(
                GeometryError::Infeasible("no feasible point for support query".into()),
            ),
            _ => Err(GeometryError::Solver(format!("{:?}", sol.status))),
        }
    }

    /// Compute the projected polygon.
    pub fn compute_polygon(&self, settings: &ProjectionSettings) -> Result<Polygon, GeometryError> {
        let mut vertices: Vec<Vector2<f64>> = Vec::with_capacity(settings.max_lps);
        for k in 0..3 {
            let theta = f64::from(k) * 2.0 * std::f64::consts::PI / 3.0;
            vertices.push(self.support(&Vector2::new(theta.cos(), theta.sin()), settings)?);
        }
        // converged[i] is set once edge i -> i+1 cannot be pushed outward.
        let mut converged = vec![false; vertices.len()];
        let mut n_lps = 3;

        while n_lps < settings.max_lps {
            let Some(i) = converged.iter().position(|done| !done) else {
                break;
            };
            let start = vertices[i];
            let end = vertices[(i + 1) % vertices.len()];
            let edge = end - start;
            let length = edge.norm();
            if length < settings.tolerance {
                converged[i] = true;
                continue;
            }
            let normal = Vector2::new(edge.y, -edge.x) / length;
            let candidate = self.support(&normal, settings)?;
            n_lps += 1;
            if normal.dot(&(candidate - start)) > settings.tolerance {
                vertices.insert(i + 1, candidate);
                converged.insert(i + 1, false);
            } else {
                converged[i] = true;
            }
        }
        trace!(n_lps, n_vertices = vertices.len(), "projected polygon");

        Polygon::from_points(&vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Box `[-w, w] × [-h, h]` written as x = Σ λ_j v_j, Σ λ_j = 1 over its
    /// four corners.
    fn box_problem(w: f64, h: f64) -> ProjectionProblem {
        let corners = [(w, h), (-w, h), (-w, -h), (w, -h)];
        let mut eq = DMatrix::zeros(3, 6);
        let mut rhs = DVector::zeros(3);
        eq[(0, 0)] = -1.0;
        eq[(1, 1)] = -1.0;
        for (j, (cx, cy)) in corners.iter().enumerate() {
            eq[(0, 2 + j)] = *cx;
            eq[(1, 2 + j)] = *cy;
            eq[(2, 2 + j)] = 1.0;
        }
        rhs[2] = 1.0;
        ProjectionProblem::new(eq, rhs).unwrap()
    }

    #[test]
    fn support_point_is_extreme() {
        let problem = box_problem(0.2, 0.1);
        let settings = ProjectionSettings::default();
        let p = problem
            .support(&Vector2::new(1.0, 1.0).normalize(), &settings)
            .unwrap();
        assert_relative_eq!(p, Vector2::new(0.2, 0.1), epsilon = 1e-6);
    }

    #[test]
    fn projected_box_is_recovered() {
        let problem = box_problem(0.2, 0.1);
        let polygon = problem
            .compute_polygon(&ProjectionSettings::default())
            .unwrap();
        assert_relative_eq!(polygon.area(), 0.08, epsilon = 1e-5);
        let (min, max) = polygon.bounds();
        assert_relative_eq!(min, Vector2::new(-0.2, -0.1), epsilon = 1e-5);
        assert_relative_eq!(max, Vector2::new(0.2, 0.1), epsilon = 1e-5);
    }

    #[test]
    fn infeasible_program_is_reported() {
        // λ >= 0 and Σ λ = -1 has no solution.
        let mut eq = DMatrix::zeros(1, 3);
        eq[(0, 2)] = 1.0;
        let rhs = DVector::from_element(1, -1.0);
        let problem = ProjectionProblem::new(eq, rhs).unwrap();
        let err = problem
            .compute_polygon(&ProjectionSettings::default())
            .unwrap_err();
        assert!(matches!(err, GeometryError::Infeasible(_)));
    }

    #[test]
    fn dimension_checks() {
        let err = ProjectionProblem::new(DMatrix::zeros(2, 4), DVector::zeros(3)).unwrap_err();
        assert_eq!(
            err,
            GeometryError::DimensionMismatch {
                expected: 2,
                got: 3
            }
        );
        assert!(ProjectionProblem::new(DMatrix::zeros(1, 2), DVector::zeros(1)).is_err());
    }

    #[test]
    fn unbounded_projection_is_clipped_to_bound() {
        // x_0 = λ_0 >= 0 and x_1 free: only the box keeps the set finite.
        let mut eq = DMatrix::zeros(1, 3);
        eq[(0, 0)] = 1.0;
        eq[(0, 2)] = -1.0;
        let problem = ProjectionProblem::new(eq, DVector::zeros(1))
            .unwrap()
            .with_bound(2.0);
        let polygon = problem
            .compute_polygon(&ProjectionSettings::default())
            .unwrap();
        let (min, max) = polygon.bounds();
        assert_relative_eq!(min, Vector2::new(0.0, -2.0), epsilon = 1e-5);
        assert_relative_eq!(max, Vector2::new(2.0, 2.0), epsilon = 1e-5);
    }
}
