//! heatgrid-sensor — load sensors and the retry/fail-safe reader.
//!
//! # Architecture
//!
//! ```text
//! SensorReader
//!   ├── Arc<dyn LoadSensor>  (SimulatedSensor, ScriptedSensor, ...)
//!   ├── per-attempt timeout
//!   ├── fixed delay between attempts
//!   └── FAILSAFE reading once attempts run out
//! ```
//!
//! The reader never returns an error. A sensor that stays down yields a
//! reading tagged `Provenance::Failsafe`, which the engine classifies
//! like any other.

pub mod reader;
pub mod sensor;

pub use reader::SensorReader;
pub use sensor::{LoadPhase, LoadSensor, SampleFuture, ScriptedSensor, SensorError, SimulatedSensor};
