use std::fmt;

use serde::{Deserialize, Serialize};

const MICROS_PER_SEC: f64 = 1e6;

/// Elapsed time of a walking simulation.
///
/// Kept in whole microseconds: ticks of a fixed period add up exactly, so
/// phase switches scheduled on tick boundaries never drift over a long walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct WalkTime {
    micros: u64,
}

impl WalkTime {
    pub const ZERO: Self = Self { micros: 0 };

    /// Nearest microsecond to `secs`. Negative inputs clamp to zero.
    #[must_use]
    pub fn from_secs(secs: f64) -> Self {
        Self {
            micros: to_micros(secs),
        }
    }

    #[must_use]
    pub const fn micros(self) -> u64 {
        self.micros
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn secs(self) -> f64 {
        self.micros as f64 / MICROS_PER_SEC
    }

    /// Move forward by one tick of `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.micros = self.micros.saturating_add(to_micros(dt));
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_micros(secs: f64) -> u64 {
    if secs.is_nan() || secs <= 0.0 {
        0
    } else {
        (secs * MICROS_PER_SEC).round() as u64
    }
}

impl fmt::Display for WalkTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.secs())
    }
}
