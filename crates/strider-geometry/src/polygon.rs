//! 2D convex polygons.
//!
//! Vertices are always stored counter-clockwise without duplicates or
//! collinear points, so every edge `v[i] -> v[i+1]` has the interior on its
//! left.

use nalgebra::Vector2;

use crate::error::GeometryError;

/// Tolerance on cross products when cleaning and clipping.
const EPS: f64 = 1e-12;

/// z-component of `(b - a) × (c - a)`.
fn cross(a: &Vector2<f64>, b: &Vector2<f64>, c: &Vector2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Convex polygon in counter-clockwise order.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vector2<f64>>,
}

impl Polygon {
    /// Build the convex hull of a point set (Andrew's monotone chain).
    ///
    /// Returns [`GeometryError::Degenerate`] when the points do not span a
    /// region of positive area.
    pub fn from_points(points: &[Vector2<f64>]) -> Result<Self, GeometryError> {
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(GeometryError::Degenerate("non-finite polygon vertex".into()));
        }
        let mut pts = points.to_vec();
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        pts.dedup_by(|a, b| (*a - *b).norm() < 1e-12);
        if pts.len() < 3 {
            return Err(GeometryError::Degenerate(format!(
                "{} distinct polygon vertices",
                pts.len()
            )));
        }

        let scale = pts
            .iter()
            .map(|p| (p - pts[0]).norm())
            .fold(1.0_f64, f64::max);
        let tol = EPS * scale * scale;

        let mut hull: Vec<Vector2<f64>> = Vec::with_capacity(2 * pts.len());
        for p in &pts {
            while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= tol
            {
                hull.pop();
            }
            hull.push(*p);
        }
        let lower_len = hull.len() + 1;
        for p in pts.iter().rev().skip(1) {
            while hull.len() >= lower_len
                && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= tol
            {
                hull.pop();
            }
            hull.push(*p);
        }
        hull.pop();

        let polygon = Self { vertices: hull };
        if polygon.vertices.len() < 3 || polygon.area() <= tol {
            return Err(GeometryError::Degenerate("polygon has zero area".into()));
        }
        Ok(polygon)
    }

    /// Axis-aligned rectangle `[min.x, max.x] × [min.y, max.y]`.
    pub fn rectangle(min: Vector2<f64>, max: Vector2<f64>) -> Result<Self, GeometryError> {
        Self::from_points(&[
            min,
            Vector2::new(max.x, min.y),
            max,
            Vector2::new(min.x, max.y),
        ])
    }

    pub fn vertices(&self) -> &[Vector2<f64>] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterate over edges `(start, end)` in counter-clockwise order.
    pub fn edges(&self) -> impl Iterator<Item = (&Vector2<f64>, &Vector2<f64>)> {
        let n = self.vertices.len();
        (0..n).map(move |i| (&self.vertices[i], &self.vertices[(i + 1) % n]))
    }

    /// Enclosed area (shoelace formula).
    pub fn area(&self) -> f64 {
        0.5 * self
            .edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
    }

    /// Component-wise bounds `(min, max)`.
    pub fn bounds(&self) -> (Vector2<f64>, Vector2<f64>) {
        let mut min = Vector2::repeat(f64::INFINITY);
        let mut max = Vector2::repeat(f64::NEG_INFINITY);
        for v in &self.vertices {
            min = min.inf(v);
            max = max.sup(v);
        }
        (min, max)
    }

    /// Signed distance from `p` to the polygon boundary, positive inside.
    pub fn signed_distance(&self, p: &Vector2<f64>) -> f64 {
        self.edges()
            .map(|(a, b)| cross(a, b, p) / (b - a).norm())
            .fold(f64::INFINITY, f64::min)
    }

    pub fn contains(&self, p: &Vector2<f64>, tol: f64) -> bool {
        self.signed_distance(p) >= -tol
    }

    /// Intersection with another convex polygon (Sutherland–Hodgman).
    pub fn intersect(&self, other: &Self) -> Result<Self, GeometryError> {
        let mut output = self.vertices.clone();
        for (a, b) in other.edges() {
            if output.is_empty() {
                break;
            }
            let input = std::mem::take(&mut output);
            let n = input.len();
            for i in 0..n {
                let cur = input[i];
                let prev = input[(i + n - 1) % n];
                let cur_in = cross(a, b, &cur) >= -EPS;
                let prev_in = cross(a, b, &prev) >= -EPS;
                if cur_in {
                    if !prev_in {
                        output.push(line_intersection(&prev, &cur, a, b));
                    }
                    output.push(cur);
                } else if prev_in {
                    output.push(line_intersection(&prev, &cur, a, b));
                }
            }
        }
        Self::from_points(&output).map_err(|_| GeometryError::EmptyIntersection)
    }
}

/// Intersection of segment `p -> q` with the infinite line through `a, b`.
fn line_intersection(
    p: &Vector2<f64>,
    q: &Vector2<f64>,
    a: &Vector2<f64>,
    b: &Vector2<f64>,
) -> Vector2<f64> {
    let dp = cross(a, b, p);
    let dq = cross(a, b, q);
    let denom = dp - dq;
    if denom.abs() < f64::MIN_POSITIVE {
        return *p;
    }
    p + (q - p) * (dp / denom)
}
