//! heat-core — shared types, the threshold classifier, and
//! configuration for heatgrid.

pub mod classifier;
pub mod config;
pub mod duration;
pub mod types;

pub use classifier::classify;
pub use config::{ConfigError, HeatConfig};
pub use duration::parse_duration;
pub use types::*;
