//! Shared types used across heatgrid crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for a monitored server.
pub type ServerId = String;

// ── Readings ───────────────────────────────────────────────────────

/// Where a load reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Measured on the host.
    Real,
    /// Produced by a simulator.
    Simulated,
    /// Substituted after the sensor exhausted its retries.
    Failsafe,
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Real => "REAL",
            Provenance::Simulated => "SIMULATED",
            Provenance::Failsafe => "FAILSAFE",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single load observation for one server.
///
/// `value` is the hit percentage. It is nominally 0–100 but out-of-range
/// values are carried as-is and clamped by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadReading {
    pub value: i32,
    pub provenance: Provenance,
    /// CPU utilisation the value was derived from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    /// Memory utilisation the value was derived from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<f64>,
}

impl LoadReading {
    pub fn new(value: i32, provenance: Provenance) -> Self {
        Self {
            value,
            provenance,
            cpu: None,
            ram: None,
        }
    }

    pub fn real(value: i32) -> Self {
        Self::new(value, Provenance::Real)
    }

    pub fn simulated(value: i32) -> Self {
        Self::new(value, Provenance::Simulated)
    }

    pub fn failsafe(value: i32) -> Self {
        Self::new(value, Provenance::Failsafe)
    }
}

// ── Escalation ladder ──────────────────────────────────────────────

/// Escalation state, ordered from least to most urgent.
///
/// The derived `Ord` follows declaration order and is what latch and
/// floor comparisons use.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateId {
    #[default]
    Monitor,
    Warning,
    FanOn,
    FullCooling,
    DataShiftGradual,
    DataShiftFast,
    EmergencyShutdown,
}

impl StateId {
    /// Every state, in ladder order.
    pub const ALL: [StateId; 7] = [
        StateId::Monitor,
        StateId::Warning,
        StateId::FanOn,
        StateId::FullCooling,
        StateId::DataShiftGradual,
        StateId::DataShiftFast,
        StateId::EmergencyShutdown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StateId::Monitor => "MONITOR",
            StateId::Warning => "WARNING",
            StateId::FanOn => "FAN_ON",
            StateId::FullCooling => "FULL_COOLING",
            StateId::DataShiftGradual => "DATA_SHIFT_GRADUAL",
            StateId::DataShiftFast => "DATA_SHIFT_FAST",
            StateId::EmergencyShutdown => "EMERGENCY_SHUTDOWN",
        }
    }

    /// Severity is a fixed function of state.
    pub fn severity(&self) -> Severity {
        match self {
            StateId::Monitor => Severity::Green,
            StateId::Warning => Severity::Yellow,
            StateId::FanOn => Severity::Orange,
            StateId::FullCooling => Severity::Red,
            StateId::DataShiftGradual | StateId::DataShiftFast => Severity::Critical,
            StateId::EmergencyShutdown => Severity::Black,
        }
    }

    /// Whether this state means data is being moved off the server.
    pub fn is_data_shift(&self) -> bool {
        matches!(self, StateId::DataShiftGradual | StateId::DataShiftFast)
    }

    /// Operator-facing message for the server team screen.
    pub fn alert_message(&self) -> &'static str {
        match self {
            StateId::Monitor => "System Normal",
            StateId::Warning => "Company Warning Triggered",
            StateId::FanOn => "Fan Activated",
            StateId::FullCooling => "Full Cooling System Active",
            StateId::DataShiftGradual => "Gradual Data Shift In Progress",
            StateId::DataShiftFast => "Fast Data Shift In Progress",
            StateId::EmergencyShutdown => "Emergency Shutdown Initiated",
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display severity attached to a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Green,
    Yellow,
    Orange,
    Red,
    Critical,
    Black,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Green => "GREEN",
            Severity::Yellow => "YELLOW",
            Severity::Orange => "ORANGE",
            Severity::Red => "RED",
            Severity::Critical => "CRITICAL",
            Severity::Black => "BLACK",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A logical action the state asks operators or automation to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NotifyCompany,
    FanOn,
    FanSpeedHigh,
    #[serde(alias = "cooling_system_on")]
    CoolingOn,
    DataShiftGradual,
    DataShiftFast,
    ShutdownServer,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::NotifyCompany => "notify_company",
            Action::FanOn => "fan_on",
            Action::FanSpeedHigh => "fan_speed_high",
            Action::CoolingOn => "cooling_on",
            Action::DataShiftGradual => "data_shift_gradual",
            Action::DataShiftFast => "data_shift_fast",
            Action::ShutdownServer => "shutdown_server",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output of the threshold classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub state: StateId,
    pub severity: Severity,
    /// Actions in escalation order; no duplicates.
    pub actions: Vec<Action>,
}

/// A classification after per-server memory has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatDecision {
    pub state: StateId,
    pub severity: Severity,
    pub actions: Vec<Action>,
    /// True once the server has latched into emergency shutdown.
    pub locked: bool,
}

impl HeatDecision {
    pub fn from_classification(classification: Classification, locked: bool) -> Self {
        Self {
            state: classification.state,
            severity: classification.severity,
            actions: classification.actions,
            locked,
        }
    }
}
