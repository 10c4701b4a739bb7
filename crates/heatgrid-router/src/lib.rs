//! heatgrid-router — decides which server should take new traffic.
//!
//! # Components
//!
//! - **`FreezePolicy`** — freeze/release thresholds (hysteresis band)
//! - **`RouteState`** — per-server freeze flag and last observed load
//! - **`select_target`** — least-loaded unfrozen server, id tie-break

pub mod error;
pub mod router;

pub use error::{RouterError, RouterResult};
pub use router::{
    FreezePolicy, FreezeTransition, RouteState, log_transition, select_target, update_and_select,
};
