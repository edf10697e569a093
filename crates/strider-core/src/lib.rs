// strider-core: config, errors, simulation clock, metrics and tick traits for Strider.

pub mod config;
pub mod error;
pub mod metrics;
pub mod sync;
pub mod tick;
pub mod time;

pub use config::{FsmConfig, MpcSettings, SimSettings, StaircaseConfig, WalkingConfig};
pub use error::{ConfigError, StriderError};
pub use metrics::{AvgStdEstimator, CompTimes, MetricsSink};
pub use sync::{Shared, lock, shared};
pub use tick::{SimContext, Tickable};
pub use time::WalkTime;
