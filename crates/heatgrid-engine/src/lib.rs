//! heatgrid-engine — the heat state machine and server registry.
//!
//! # Architecture
//!
//! ```text
//! ServerRegistry
//!   └── per-server slot (Mutex)
//!       ├── EntityMemory  (current state, data-shift latch, shutdown latch)
//!       └── RouteState    (freeze flag, last load)
//!
//! CycleMonitor
//!   └── per-server background task
//!       └── SensorReader → ServerRegistry::run_cycle
//! ```
//!
//! One cycle is always sensor → state machine → router, and the state
//! machine and router see the same reading.

pub mod machine;
pub mod monitor;
pub mod registry;

pub use machine::EntityMemory;
pub use monitor::CycleMonitor;
pub use registry::{CycleReport, ServerRegistry, ServerStatus};
