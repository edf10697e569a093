//! Halfspace representation of 3D convex polytopes.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::error::GeometryError;

/// Relative tolerance for coplanarity and facet tests.
const REL_TOL: f64 = 1e-9;

/// Polytope `{x : A x <= b}` with unit-norm rows of `A`.
#[derive(Clone, Debug, PartialEq)]
pub struct Halfspaces {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
}

impl Halfspaces {
    pub fn new(a: DMatrix<f64>, b: DVector<f64>) -> Result<Self, GeometryError> {
        if a.nrows() != b.len() {
            return Err(GeometryError::DimensionMismatch {
                expected: a.nrows(),
                got: b.len(),
            });
        }
        Ok(Self { a, b })
    }

    pub fn nrows(&self) -> usize {
        self.a.nrows()
    }

    /// Largest constraint violation `max_i (A_i x - b_i)`, negative inside.
    pub fn max_violation(&self, x: &Vector3<f64>) -> f64 {
        (0..self.nrows())
            .map(|i| {
                self.a[(i, 0)] * x.x + self.a[(i, 1)] * x.y + self.a[(i, 2)] * x.z - self.b[i]
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn contains(&self, x: &Vector3<f64>, tol: f64) -> bool {
        self.max_violation(x) <= tol
    }
}

/// Compute the halfspaces of the convex hull of `vertices`.
///
/// Facets are enumerated over vertex triples, which is fine for the small
/// vertex sets of tubes and acceleration cones. Inputs that do not span a
/// full-dimensional volume are reported as [`GeometryError::Degenerate`].
pub fn compute_polytope_halfspaces(vertices: &[Vector3<f64>]) -> Result<Halfspaces, GeometryError> {
    if vertices.iter().any(|v| v.iter().any(|c| !c.is_finite())) {
        return Err(GeometryError::Degenerate("non-finite vertex".into()));
    }
    if vertices.len() < 4 {
        return Err(GeometryError::Degenerate(format!(
            "{} vertices cannot span a volume",
            vertices.len()
        )));
    }

    let scale = check_full_dimensional(vertices)?;
    let tol = REL_TOL * scale;

    let mut normals: Vec<Vector3<f64>> = Vec::new();
    let mut offsets: Vec<f64> = Vec::new();
    let n = vertices.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let normal = (vertices[j] - vertices[i]).cross(&(vertices[k] - vertices[i]));
                let norm = normal.norm();
                if norm < tol * scale {
                    continue;
                }
                let mut normal = normal / norm;
                let mut offset = normal.dot(&vertices[i]);
                let (mut below, mut above) = (false, false);
                for v in vertices {
                    let s = normal.dot(v) - offset;
                    below |= s < -tol;
                    above |= s > tol;
                }
                if below && above {
                    continue;
                }
                if above {
                    normal = -normal;
                    offset = -offset;
                }
                let duplicate = normals
                    .iter()
                    .zip(&offsets)
                    .any(|(n2, o2)| n2.dot(&normal) > 1.0 - REL_TOL && (o2 - offset).abs() < tol);
                if !duplicate {
                    normals.push(normal);
                    offsets.push(offset);
                }
            }
        }
    }

    let mut a = DMatrix::zeros(normals.len(), 3);
    for (row, normal) in normals.iter().enumerate() {
        a.row_mut(row).copy_from(&normal.transpose());
    }
    Halfspaces::new(a, DVector::from_vec(offsets))
}

/// Check that the vertices span three dimensions; returns their spatial scale.
fn check_full_dimensional(vertices: &[Vector3<f64>]) -> Result<f64, GeometryError> {
    let p0 = vertices[0];
    let farthest = |score: &dyn Fn(&Vector3<f64>) -> f64| {
        vertices
            .iter()
            .map(|v| (score(v), *v))
            .fold((f64::NEG_INFINITY, p0), |acc, x| if x.0 > acc.0 { x } else { acc })
    };

    let (d1, p1) = farthest(&|v| (v - p0).norm());
    let scale = d1.max(f64::MIN_POSITIVE);
    if d1 < REL_TOL {
        return Err(GeometryError::Degenerate("all vertices coincide".into()));
    }
    let axis = (p1 - p0) / d1;
    let (d2, p2) = farthest(&|v| (v - p0).cross(&axis).norm());
    if d2 < REL_TOL * scale {
        return Err(GeometryError::Degenerate("vertices are collinear".into()));
    }
    let normal = (p1 - p0).cross(&(p2 - p0)).normalize();
    let (d3, _) = farthest(&|v| (v - p0).dot(&normal).abs());
    if d3 < REL_TOL * scale {
        return Err(GeometryError::Degenerate("vertices are coplanar".into()));
    }
    Ok(scale)
}
