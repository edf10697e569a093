//! Computation-time statistics.
//!
//! Planning stages report wall-clock samples under fixed names
//! (`tube_primal_vrep`, `qp_solve`, ...). [`CompTimes`] keeps one
//! [`AvgStdEstimator`] per name.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// AvgStdEstimator
// ---------------------------------------------------------------------------

/// Online estimator of the mean, standard deviation and range of a scalar
/// time series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AvgStdEstimator {
    n: u64,
    sum: f64,
    sum_sq: f64,
    min: Option<f64>,
    max: Option<f64>,
    last: Option<f64>,
}

impl AvgStdEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new sample.
    pub fn add(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sum_sq += x * x;
        self.last = Some(x);
        self.min = Some(self.min.map_or(x, |m| m.min(x)));
        self.max = Some(self.max.map_or(x, |m| m.max(x)));
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub const fn count(&self) -> u64 {
        self.n
    }

    pub const fn last(&self) -> Option<f64> {
        self.last
    }

    pub const fn min(&self) -> Option<f64> {
        self.min
    }

    pub const fn max(&self) -> Option<f64> {
        self.max
    }

    /// Sample mean, `None` before the first sample.
    #[allow(clippy::cast_precision_loss)]
    pub fn avg(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }

    /// Unbiased standard deviation. Zero for a single sample.
    #[allow(clippy::cast_precision_loss)]
    pub fn std(&self) -> Option<f64> {
        let avg = self.avg()?;
        if self.n == 1 {
            return Some(0.0);
        }
        let n = self.n as f64;
        let var = (self.sum_sq / n - avg * avg).max(0.0);
        Some((n / (n - 1.0)).sqrt() * var.sqrt())
    }
}

impl fmt::Display for AvgStdEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.avg(), self.std(), self.max, self.min) {
            (Some(avg), Some(std), Some(max), Some(min)) => write!(
                f,
                "{avg:.6} +/- {std:.6} (max: {max:.6}, min: {min:.6}) over {} items",
                self.n
            ),
            _ => write!(f, "no samples"),
        }
    }
}

// ---------------------------------------------------------------------------
// MetricsSink
// ---------------------------------------------------------------------------

/// Destination for named computation-time samples.
pub trait MetricsSink {
    /// Record one sample, in seconds.
    fn log_comp_time(&mut self, name: &str, secs: f64);

    /// Record one sample from a [`Duration`].
    fn log_duration(&mut self, name: &str, duration: Duration) {
        self.log_comp_time(name, duration.as_secs_f64());
    }
}

/// In-memory metrics sink keyed by sample name.
#[derive(Clone, Debug, Default)]
pub struct CompTimes {
    estimators: BTreeMap<String, AvgStdEstimator>,
}

impl CompTimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AvgStdEstimator> {
        self.estimators.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AvgStdEstimator)> {
        self.estimators.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.estimators.clear();
    }
}

impl MetricsSink for CompTimes {
    fn log_comp_time(&mut self, name: &str, secs: f64) {
        self.estimators.entry(name.to_owned()).or_default().add(secs);
    }
}

impl fmt::Display for CompTimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, est) in &self.estimators {
            writeln!(f, "{name:<20} {est}")?;
        }
        Ok(())
    }
}
