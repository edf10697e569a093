//! Compressed-column form of the dense matrices handed to Clarabel by the
//! polygon projection and the CoM predictive controller.

use clarabel::algebra::CscMatrix;
use nalgebra::DMatrix;

/// Entries at or below this magnitude are left out of the sparsity pattern.
const DROP_TOL: f64 = 1e-15;

/// Constraint matrix `A` of `A z + s = b`, all entries kept.
pub fn csc_constraints(a: &DMatrix<f64>) -> CscMatrix<f64> {
    compress(a, |_, _| true)
}

/// Symmetric cost matrix `P`. Clarabel reads the upper triangle only.
pub fn csc_cost(p: &DMatrix<f64>) -> CscMatrix<f64> {
    compress(p, |i, j| i <= j)
}

fn compress(m: &DMatrix<f64>, keep: impl Fn(usize, usize) -> bool) -> CscMatrix<f64> {
    let mut colptr = Vec::with_capacity(m.ncols() + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for (j, column) in m.column_iter().enumerate() {
        for (i, &v) in column.iter().enumerate() {
            if keep(i, j) && v.abs() > DROP_TOL {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(m.nrows(), m.ncols(), colptr, rowval, nzval)
}
