//! Linear predictive control of the CoM point mass.
//!
//! Uses Clarabel (pure Rust interior-point solver) to find the sequence of
//! CoM accelerations that steers the point mass to a goal state at the end
//! of the preview window while staying in the tube's acceleration cones.
//!
//! # QP Formulation
//!
//! Decision variables: z = [x_1, ..., x_N, u_0, ..., u_{N-1}]
//! where x_k = [p_k; v_k] is the 6D state and u_k the 3D acceleration.
//!
//! Cost: wxt ||x_N - x_goal||² + wu Σ ||u_k||²
//!
//! Subject to:
//! - Dynamics: x_{k+1} = A x_k + B u_k, with x_0 = x_init (equality)
//! - Acceleration cones: D_k u_k <= e_k (inequality)
//! - Optional position polytope: E p_k <= f for k = 1..N (inequality)

use std::time::{Duration, Instant};

use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{NonnegativeConeT, ZeroConeT},
};
use nalgebra::{DMatrix, DVector, Matrix3, Matrix6, Matrix6x3, Vector3, Vector6};
use strider_geometry::{Halfspaces, csc_constraints, csc_cost};

use crate::error::MpcError;

pub const STATE_DIM: usize = 6;
pub const CONTROL_DIM: usize = 3;

/// Double-integrator matrices `(A, B)` for a step of `dt` seconds.
pub fn double_integrator(dt: f64) -> (Matrix6<f64>, Matrix6x3<f64>) {
    let eye = Matrix3::identity();
    let mut a = Matrix6::identity();
    a.fixed_view_mut::<3, 3>(0, 3).copy_from(&(eye * dt));
    let mut b = Matrix6x3::zeros();
    b.fixed_view_mut::<3, 3>(0, 0).copy_from(&(eye * (0.5 * dt * dt)));
    b.fixed_view_mut::<3, 3>(3, 0).copy_from(&(eye * dt));
    (a, b)
}

/// Step index up to which the first acceleration cone applies.
///
/// `None` when there is a single cone or when the switch falls outside
/// `[0, nb_steps - 1)`; all steps then use the first cone.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn compute_switch_step(switch_time: f64, dt: f64, nb_steps: usize, nb_sets: usize) -> Option<usize> {
    if nb_sets != 2 || dt.is_nan() || dt <= 0.0 {
        return None;
    }
    let raw = (switch_time / dt).floor();
    if raw.is_finite() && raw >= 0.0 && raw < (nb_steps as f64) - 1.0 {
        Some(raw as usize)
    } else {
        None
    }
}

/// Solution of one predictive control problem.
#[derive(Clone, Debug)]
pub struct MpcSolution {
    /// Accelerations `u_0..u_{N-1}`.
    pub controls: Vec<Vector3<f64>>,
    /// Predicted states `x_1..x_N`.
    pub states: Vec<Vector6<f64>>,
    /// Duration of each control step.
    pub dt: f64,
    pub build_time: Duration,
    pub solve_time: Duration,
    pub iterations: u32,
}

impl MpcSolution {
    /// Predicted CoM positions `p_1..p_N`.
    pub fn com_positions(&self) -> Vec<Vector3<f64>> {
        self.states
            .iter()
            .map(|x| Vector3::new(x[0], x[1], x[2]))
            .collect()
    }

    pub fn durations(&self) -> Vec<f64> {
        vec![self.dt; self.controls.len()]
    }
}

/// Predictive control problem over a uniform preview window.
#[derive(Clone, Debug)]
pub struct LinearPredictiveControl {
    x_init: Vector6<f64>,
    x_goal: Vector6<f64>,
    nb_steps: usize,
    dt: f64,
    wxt: f64,
    wu: f64,
    /// `(D_k, e_k)` for each step.
    u_constraints: Vec<(DMatrix<f64>, DVector<f64>)>,
    x_constraints: Option<Halfspaces>,
    max_solver_iters: u32,
}

impl LinearPredictiveControl {
    /// Unconstrained problem over `horizon` seconds split in `nb_steps`.
    pub fn new(
        x_init: Vector6<f64>,
        x_goal: Vector6<f64>,
        horizon: f64,
        nb_steps: usize,
        wxt: f64,
        wu: f64,
    ) -> Result<Self, MpcError> {
        if !(horizon.is_finite() && horizon > 0.0) {
            return Err(MpcError::InvalidHorizon(horizon));
        }
        if nb_steps == 0 {
            return Err(MpcError::InvalidSteps(nb_steps));
        }
        #[allow(clippy::cast_precision_loss)]
        let dt = horizon / nb_steps as f64;
        Ok(Self {
            x_init,
            x_goal,
            nb_steps,
            dt,
            wxt,
            wu,
            u_constraints: vec![(DMatrix::zeros(0, CONTROL_DIM), DVector::zeros(0)); nb_steps],
            x_constraints: None,
            max_solver_iters: 200,
        })
    }

    #[must_use]
    pub const fn with_max_solver_iters(mut self, iters: u32) -> Self {
        self.max_solver_iters = iters;
        self
    }

    /// Constrain controls with one cone per sub-phase. Steps up to
    /// `switch_step` use the first cone, later steps the second.
    pub fn set_acceleration_cones(&mut self, cones: &[Halfspaces], switch_step: Option<usize>) {
        let Some(first) = cones.first() else {
            return;
        };
        let second = cones.get(1).unwrap_or(first);
        for (k, slot) in self.u_constraints.iter_mut().enumerate() {
            let set = match switch_step {
                Some(s) if k > s => second,
                _ => first,
            };
            *slot = (set.a.clone(), set.b.clone());
        }
    }

    /// Constrain predicted CoM positions to a polytope.
    pub fn set_state_constraints(&mut self, polytope: Halfspaces) {
        self.x_constraints = Some(polytope);
    }

    pub const fn nb_steps(&self) -> usize {
        self.nb_steps
    }

    pub const fn timestep(&self) -> f64 {
        self.dt
    }

    /// Build and solve the QP.
    pub fn solve(&self) -> Result<MpcSolution, MpcError> {
        let build_start = Instant::now();

        let n = self.nb_steps;
        let n_x = STATE_DIM * n;
        let n_u = CONTROL_DIM * n;
        let n_z = n_x + n_u;
        let (a_d, b_d) = double_integrator(self.dt);

        // 1. Cost: 0.5 z^T P z + q^T z
        let mut p = DMatrix::zeros(n_z, n_z);
        let mut q = DVector::zeros(n_z);
        let xn = n_x - STATE_DIM;
        for i in 0..STATE_DIM {
            p[(xn + i, xn + i)] = 2.0 * self.wxt;
            q[xn + i] = -2.0 * self.wxt * self.x_goal[i];
        }
        for j in 0..n_u {
            p[(n_x + j, n_x + j)] = 2.0 * self.wu;
        }

        // 2. Constraints, equalities first
        let n_eq = n_x;
        let n_u_ineq: usize = self.u_constraints.iter().map(|(d, _)| d.nrows()).sum();
        let n_x_ineq = self.x_constraints.as_ref().map_or(0, |h| h.nrows() * n);
        let n_ineq = n_u_ineq + n_x_ineq;
        let mut a_all = DMatrix::zeros(n_eq + n_ineq, n_z);
        let mut b_all = DVector::zeros(n_eq + n_ineq);

        // x_{k+1} - A x_k - B u_k = 0, with A x_0 moved to the right
        for k in 0..n {
            let row = STATE_DIM * k;
            let u_col = n_x + CONTROL_DIM * k;
            for i in 0..STATE_DIM {
                a_all[(row + i, row + i)] = 1.0;
            }
            if k == 0 {
                let ax0 = a_d * self.x_init;
                b_all.rows_mut(row, STATE_DIM).copy_from(&ax0);
            } else {
                let x_col = STATE_DIM * (k - 1);
                a_all
                    .view_mut((row, x_col), (STATE_DIM, STATE_DIM))
                    .copy_from(&(-a_d));
            }
            a_all
                .view_mut((row, u_col), (STATE_DIM, CONTROL_DIM))
                .copy_from(&(-b_d));
        }

        let mut row = n_eq;
        for (k, (d, e)) in self.u_constraints.iter().enumerate() {
            let m = d.nrows();
            if m == 0 {
                continue;
            }
            let u_col = n_x + CONTROL_DIM * k;
            a_all.view_mut((row, u_col), (m, CONTROL_DIM)).copy_from(d);
            b_all.rows_mut(row, m).copy_from(e);
            row += m;
        }
        if let Some(hrep) = &self.x_constraints {
            let m = hrep.nrows();
            for k in 0..n {
                let x_col = STATE_DIM * k;
                a_all.view_mut((row, x_col), (m, 3)).copy_from(&hrep.a);
                b_all.rows_mut(row, m).copy_from(&hrep.b);
                row += m;
            }
        }

        // 3. Convert to Clarabel format
        let p_csc = csc_cost(&p);
        let a_csc = csc_constraints(&a_all);
        let q_slice: Vec<f64> = q.iter().copied().collect();
        let b_slice: Vec<f64> = b_all.iter().copied().collect();
        let mut cones = vec![ZeroConeT(n_eq)];
        if n_ineq > 0 {
            cones.push(NonnegativeConeT(n_ineq));
        }

        let settings = DefaultSettingsBuilder::default()
            .max_iter(self.max_solver_iters)
            .verbose(false)
            .tol_gap_abs(1e-6)
            .tol_gap_rel(1e-6)
            .tol_feas(1e-6)
            .build()
            .map_err(|e| MpcError::Solver(format!("{e:?}")))?;

        let mut solver = DefaultSolver::new(&p_csc, &q_slice, &a_csc, &b_slice, &cones, settings)
            .map_err(|e| MpcError::Solver(format!("{e:?}")))?;
        let build_time = build_start.elapsed();

        // 4. Solve
        let solve_start = Instant::now();
        solver.solve();
        let solve_time = solve_start.elapsed();
        let sol = &solver.solution;

        match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {}
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                return Err(MpcError::Infeasible(format!(
                    "no control sequence satisfies the {n_ineq} inequality constraints"
                )));
            }
            _ => return Err(MpcError::Solver(format!("{:?}", sol.status))),
        }

        let states = (0..n)
            .map(|k| Vector6::from_column_slice(&sol.x[STATE_DIM * k..STATE_DIM * (k + 1)]))
            .collect();
        let controls = (0..n)
            .map(|k| {
                let base = n_x + CONTROL_DIM * k;
                Vector3::new(sol.x[base], sol.x[base + 1], sol.x[base + 2])
            })
            .collect();

        Ok(MpcSolution {
            controls,
            states,
            dt: self.dt,
            build_time,
            solve_time,
            iterations: sol.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at_rest(p: Vector3<f64>) -> Vector6<f64> {
        Vector6::new(p.x, p.y, p.z, 0.0, 0.0, 0.0)
    }

    /// `|u_i| <= bound` on every axis.
    fn box_constraint(bound: f64) -> Halfspaces {
        let mut a = DMatrix::zeros(6, 3);
        let mut b = DVector::zeros(6);
        for i in 0..3 {
            a[(2 * i, i)] = 1.0;
            a[(2 * i + 1, i)] = -1.0;
            b[2 * i] = bound;
            b[2 * i + 1] = bound;
        }
        Halfspaces::new(a, b).unwrap()
    }

    #[test]
    fn double_integrator_matches_constant_acceleration() {
        let (a, b) = double_integrator(0.1);
        let x = Vector6::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        let u = Vector3::new(0.0, 2.0, 0.0);
        let next = a * x + b * u;
        assert_relative_eq!(next, Vector6::new(0.1, 0.01, 0.0, 1.0, 0.2, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn switch_step_bounds() {
        assert_eq!(compute_switch_step(0.25, 0.1, 10, 2), Some(2));
        assert_eq!(compute_switch_step(0.0, 0.1, 10, 2), Some(0));
        assert_eq!(compute_switch_step(0.85, 0.1, 10, 2), Some(8));
        assert_eq!(compute_switch_step(0.95, 0.1, 10, 2), None);
        assert_eq!(compute_switch_step(-0.01, 0.1, 10, 2), None);
        assert_eq!(compute_switch_step(0.25, 0.1, 10, 1), None);
        assert_eq!(compute_switch_step(f64::NAN, 0.1, 10, 2), None);
    }

    #[test]
    fn switch_step_within_one_step_before_start_is_dropped() {
        assert_eq!(compute_switch_step(-0.02, 0.05, 20, 2), None);
        assert_eq!(compute_switch_step(-0.05, 0.05, 20, 2), None);
        assert_eq!(compute_switch_step(0.02, 0.05, 20, 2), Some(0));
        assert_eq!(compute_switch_step(0.07, 0.05, 20, 2), Some(1));
    }

    #[test]
    fn rejects_invalid_windows() {
        let x = at_rest(Vector3::zeros());
        assert!(matches!(
            LinearPredictiveControl::new(x, x, 0.0, 10, 1.0, 1.0),
            Err(MpcError::InvalidHorizon(_))
        ));
        assert!(matches!(
            LinearPredictiveControl::new(x, x, 1.0, 0, 1.0, 1.0),
            Err(MpcError::InvalidSteps(0))
        ));
    }

    #[test]
    fn goal_at_rest_needs_no_acceleration() {
        let x = at_rest(Vector3::new(0.0, 0.0, 0.9));
        let mut lpc = LinearPredictiveControl::new(x, x, 1.0, 20, 1000.0, 1.0).unwrap();
        lpc.set_acceleration_cones(&[box_constraint(5.0)], None);
        let sol = lpc.solve().unwrap();
        assert_eq!(sol.controls.len(), 20);
        assert_eq!(sol.states.len(), 20);
        assert_relative_eq!(sol.dt, 0.05, epsilon = 1e-12);
        for u in &sol.controls {
            assert!(u.norm() < 1e-4, "unexpected control {u:?}");
        }
    }

    #[test]
    fn predicted_states_follow_dynamics() {
        let x0 = at_rest(Vector3::zeros());
        let goal = at_rest(Vector3::new(0.2, 0.0, 0.0));
        let lpc = LinearPredictiveControl::new(x0, goal, 1.0, 10, 1000.0, 1.0).unwrap();
        let sol = lpc.solve().unwrap();
        let (a, b) = double_integrator(sol.dt);
        let mut x = x0;
        for (u, predicted) in sol.controls.iter().zip(&sol.states) {
            x = a * x + b * u;
            assert_relative_eq!(x, *predicted, epsilon = 1e-5);
        }
        // Tracking pulls the terminal CoM toward the goal.
        let last = sol.com_positions()[9];
        assert!((last.x - 0.2).abs() < 0.05, "terminal x = {}", last.x);
    }

    #[test]
    fn cones_switch_after_switch_step() {
        let x0 = at_rest(Vector3::zeros());
        let goal = at_rest(Vector3::new(1.0, 0.0, 0.0));
        let mut lpc = LinearPredictiveControl::new(x0, goal, 1.0, 10, 1000.0, 1.0).unwrap();
        lpc.set_acceleration_cones(&[box_constraint(0.1), box_constraint(2.0)], Some(3));
        let sol = lpc.solve().unwrap();
        for (k, u) in sol.controls.iter().enumerate() {
            let bound = if k <= 3 { 0.1 } else { 2.0 };
            assert!(u.amax() <= bound + 1e-5, "step {k}: {u:?}");
        }
        assert!(sol.controls[5].x > 0.1);
    }

    #[test]
    fn state_constraints_keep_positions_inside() {
        let x0 = at_rest(Vector3::zeros());
        let goal = at_rest(Vector3::new(1.0, 0.0, 0.0));
        let mut lpc = LinearPredictiveControl::new(x0, goal, 1.0, 10, 1000.0, 1.0).unwrap();
        lpc.set_state_constraints(box_constraint(0.3));
        let sol = lpc.solve().unwrap();
        for p in sol.com_positions() {
            assert!(p.x <= 0.3 + 1e-5);
        }
    }

    #[test]
    fn contradictory_cone_is_infeasible() {
        let x = at_rest(Vector3::zeros());
        let mut lpc = LinearPredictiveControl::new(x, x, 1.0, 5, 1000.0, 1.0).unwrap();
        // u_z <= -1 and u_z >= 1
        let d = DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 1.0, 0.0, 0.0, -1.0]);
        let e = DVector::from_vec(vec![-1.0, -1.0]);
        let empty = Halfspaces::new(d, e).unwrap();
        lpc.set_acceleration_cones(&[box_constraint(5.0), empty], Some(2));
        assert!(matches!(lpc.solve(), Err(MpcError::Infeasible(_))));
    }
}
