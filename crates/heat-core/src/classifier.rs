//! Threshold classifier — maps a hit percentage to a state, severity and
//! action set.
//!
//! The table below is fixed. Each row is the inclusive lower bound of a
//! half-open bucket:
//!
//! ```text
//!  0  MONITOR             GREEN     -
//! 60  WARNING             YELLOW    notify_company
//! 65  FAN_ON              ORANGE    fan_on
//! 70  FULL_COOLING        RED       fan_on fan_speed_high cooling_on
//! 75  DATA_SHIFT_GRADUAL  CRITICAL  fan_on fan_speed_high cooling_on data_shift_gradual
//! 80  DATA_SHIFT_FAST     CRITICAL  fan_on fan_speed_high cooling_on data_shift_fast
//! 90  EMERGENCY_SHUTDOWN  BLACK     shutdown_server
//! ```
//!
//! Values below 0 land in MONITOR and values above 100 in
//! EMERGENCY_SHUTDOWN.

use crate::types::{Action, Classification, StateId};

pub const WARNING_THRESHOLD: i32 = 60;
pub const FAN_ON_THRESHOLD: i32 = 65;
pub const FULL_COOLING_THRESHOLD: i32 = 70;
pub const DATA_SHIFT_GRADUAL_THRESHOLD: i32 = 75;
pub const DATA_SHIFT_FAST_THRESHOLD: i32 = 80;
pub const EMERGENCY_SHUTDOWN_THRESHOLD: i32 = 90;

/// Upper bound of the nominal hit range.
pub const MAX_HIT: i32 = 100;

const COOLING: [Action; 3] = [Action::FanOn, Action::FanSpeedHigh, Action::CoolingOn];

/// State for a hit value. Total over `i32`.
pub fn state_for(hit: i32) -> StateId {
    match hit {
        i32::MIN..WARNING_THRESHOLD => StateId::Monitor,
        WARNING_THRESHOLD..FAN_ON_THRESHOLD => StateId::Warning,
        FAN_ON_THRESHOLD..FULL_COOLING_THRESHOLD => StateId::FanOn,
        FULL_COOLING_THRESHOLD..DATA_SHIFT_GRADUAL_THRESHOLD => StateId::FullCooling,
        DATA_SHIFT_GRADUAL_THRESHOLD..DATA_SHIFT_FAST_THRESHOLD => StateId::DataShiftGradual,
        DATA_SHIFT_FAST_THRESHOLD..EMERGENCY_SHUTDOWN_THRESHOLD => StateId::DataShiftFast,
        _ => StateId::EmergencyShutdown,
    }
}

/// Lowest hit value that classifies as `state`.
pub fn lower_bound(state: StateId) -> i32 {
    match state {
        StateId::Monitor => 0,
        StateId::Warning => WARNING_THRESHOLD,
        StateId::FanOn => FAN_ON_THRESHOLD,
        StateId::FullCooling => FULL_COOLING_THRESHOLD,
        StateId::DataShiftGradual => DATA_SHIFT_GRADUAL_THRESHOLD,
        StateId::DataShiftFast => DATA_SHIFT_FAST_THRESHOLD,
        StateId::EmergencyShutdown => EMERGENCY_SHUTDOWN_THRESHOLD,
    }
}

/// Actions requested by a state, in escalation order.
pub fn actions_for(state: StateId) -> Vec<Action> {
    match state {
        StateId::Monitor => Vec::new(),
        StateId::Warning => vec![Action::NotifyCompany],
        StateId::FanOn => vec![Action::FanOn],
        StateId::FullCooling => COOLING.to_vec(),
        StateId::DataShiftGradual => with_cooling(Action::DataShiftGradual),
        StateId::DataShiftFast => with_cooling(Action::DataShiftFast),
        StateId::EmergencyShutdown => vec![Action::ShutdownServer],
    }
}

fn with_cooling(extra: Action) -> Vec<Action> {
    let mut actions = COOLING.to_vec();
    actions.push(extra);
    actions
}

/// Classify a hit percentage. Pure and total.
pub fn classify(hit: i32) -> Classification {
    let state = state_for(hit);
    Classification {
        state,
        severity: state.severity(),
        actions: actions_for(state),
    }
}
