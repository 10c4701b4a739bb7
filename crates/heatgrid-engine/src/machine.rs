//! Heat state machine — per-server memory over the threshold classifier.
//!
//! Two latches make escalation sticky:
//!
//! - **data shift**: set the first time a reading lands in either data-shift
//!   bucket. While set, any lower classification is replaced by the full
//!   DATA_SHIFT_GRADUAL classification.
//! - **shutdown**: set the first time the result is EMERGENCY_SHUTDOWN.
//!   While set, every evaluation returns EMERGENCY_SHUTDOWN without
//!   consulting the classifier.
//!
//! Only [`EntityMemory::reset`] clears them.

use serde::Serialize;

use heat_core::classifier;
use heat_core::{Classification, HeatDecision, StateId};

/// Escalation memory for one server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityMemory {
    current_state: StateId,
    data_shift_latched: bool,
    shutdown_latched: bool,
}

impl EntityMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_state(&self) -> StateId {
        self.current_state
    }

    pub fn data_shift_latched(&self) -> bool {
        self.data_shift_latched
    }

    pub fn shutdown_latched(&self) -> bool {
        self.shutdown_latched
    }

    /// Apply one hit reading and return the resulting decision.
    pub fn transition(&mut self, hit: i32) -> HeatDecision {
        if self.shutdown_latched {
            return HeatDecision::from_classification(shutdown_classification(), true);
        }

        let mut decision = classifier::classify(hit);

        if decision.state.is_data_shift() {
            self.data_shift_latched = true;
        }

        if self.data_shift_latched && decision.state < StateId::DataShiftGradual {
            decision = classifier::classify(classifier::lower_bound(StateId::DataShiftGradual));
        }

        if decision.state == StateId::EmergencyShutdown {
            self.shutdown_latched = true;
        }

        self.current_state = decision.state;
        HeatDecision::from_classification(decision, self.shutdown_latched)
    }

    /// Clear both latches and return to MONITOR. Administrative only.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn shutdown_classification() -> Classification {
    classifier::classify(classifier::lower_bound(StateId::EmergencyShutdown))
}
