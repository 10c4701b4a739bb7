//! Server registry — per-server heat memory and route state.
//!
//! The map itself sits behind an `RwLock` and is only write-locked to
//! insert a new server. Each server has its own `Mutex`-guarded slot, so
//! the heat decision and the router update for one cycle are applied
//! together and evaluations of different servers never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info, warn};

use heat_core::{HeatDecision, LoadReading, Provenance, ServerId, StateId};
use heatgrid_router::{FreezePolicy, RouteState, log_transition, select_target};
use heatgrid_sensor::SensorReader;

use crate::machine::EntityMemory;

/// Everything the registry tracks for one server.
#[derive(Debug, Default)]
struct ServerSlot {
    memory: EntityMemory,
    route: RouteState,
    last_provenance: Option<Provenance>,
    last_seen: u64,
}

/// Result of one evaluation cycle for a server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub server_id: ServerId,
    pub reading: LoadReading,
    pub decision: HeatDecision,
    /// Freeze flag after the router saw this reading.
    pub freeze: bool,
    pub timestamp: u64,
}

/// Point-in-time view of one server, for listings and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerStatus {
    pub server_id: ServerId,
    pub current_state: StateId,
    pub data_shift_latched: bool,
    pub shutdown_latched: bool,
    pub freeze: bool,
    pub last_load: i32,
    pub last_provenance: Option<Provenance>,
    pub last_seen: u64,
}

impl ServerStatus {
    fn from_slot(server_id: &str, slot: &ServerSlot) -> Self {
        Self {
            server_id: server_id.to_string(),
            current_state: slot.memory.current_state(),
            data_shift_latched: slot.memory.data_shift_latched(),
            shutdown_latched: slot.memory.shutdown_latched(),
            freeze: slot.route.freeze,
            last_load: slot.route.last_load,
            last_provenance: slot.last_provenance,
            last_seen: slot.last_seen,
        }
    }
}

/// Owns per-server state for every server the process has seen.
pub struct ServerRegistry {
    servers: RwLock<HashMap<ServerId, Arc<Mutex<ServerSlot>>>>,
    policy: FreezePolicy,
}

impl ServerRegistry {
    pub fn new(policy: FreezePolicy) -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Get the slot for a server, creating it on first reference.
    fn slot(&self, server_id: &str) -> Arc<Mutex<ServerSlot>> {
        if let Some(slot) = self.servers.read().expect("registry lock").get(server_id) {
            return Arc::clone(slot);
        }

        let mut servers = self.servers.write().expect("registry lock");
        Arc::clone(servers.entry(server_id.to_string()).or_insert_with(|| {
            debug!(%server_id, "registered new server");
            Arc::new(Mutex::new(ServerSlot::default()))
        }))
    }

    /// Apply one reading: heat state machine first, then the router.
    pub fn evaluate(&self, server_id: &str, reading: LoadReading) -> CycleReport {
        let slot = self.slot(server_id);
        let mut slot = slot.lock().expect("server slot lock");

        let before = slot.memory;
        let decision = slot.memory.transition(reading.value);
        let transition = slot.route.observe(reading.value, &self.policy);
        slot.last_provenance = Some(reading.provenance);
        slot.last_seen = epoch_secs();

        if !before.data_shift_latched() && slot.memory.data_shift_latched() {
            warn!(%server_id, hit = reading.value, "data shift started, latched until reset");
        }
        if !before.shutdown_latched() && slot.memory.shutdown_latched() {
            warn!(%server_id, hit = reading.value, "emergency shutdown initiated, server locked");
        }
        if decision.state != before.current_state() {
            debug!(
                %server_id,
                hit = reading.value,
                source = %reading.provenance,
                from = %before.current_state(),
                to = %decision.state,
                "heat state changed"
            );
        }
        log_transition(server_id, reading.value, transition);

        CycleReport {
            server_id: server_id.to_string(),
            reading,
            decision,
            freeze: slot.route.freeze,
            timestamp: slot.last_seen,
        }
    }

    /// Read the sensor, then evaluate. The sensor is read outside any lock.
    pub async fn run_cycle(&self, server_id: &str, reader: &SensorReader) -> CycleReport {
        let reading = reader.read().await;
        self.evaluate(server_id, reading)
    }

    /// Clear a server's heat memory. Route state is left alone.
    ///
    /// Returns `false` if the server has never been evaluated.
    pub fn reset(&self, server_id: &str) -> bool {
        let slot = match self.servers.read().expect("registry lock").get(server_id) {
            Some(slot) => Arc::clone(slot),
            None => return false,
        };

        let mut slot = slot.lock().expect("server slot lock");
        let previous = slot.memory.current_state();
        slot.memory.reset();
        info!(%server_id, %previous, "heat memory reset by administrator");
        true
    }

    /// Least-loaded unfrozen server, or `None` to hold all traffic.
    pub fn select_target(&self) -> Option<ServerId> {
        let routes = self.route_snapshot();
        select_target(routes.iter().map(|(id, route)| (id.as_str(), route))).map(str::to_string)
    }

    fn route_snapshot(&self) -> Vec<(ServerId, RouteState)> {
        let servers = self.servers.read().expect("registry lock");
        servers
            .iter()
            .map(|(id, slot)| (id.clone(), slot.lock().expect("server slot lock").route))
            .collect()
    }

    /// Status of one server.
    pub fn get(&self, server_id: &str) -> Option<ServerStatus> {
        let servers = self.servers.read().expect("registry lock");
        let slot = servers.get(server_id)?.lock().expect("server slot lock");
        Some(ServerStatus::from_slot(server_id, &slot))
    }

    /// Status of every known server, sorted by id.
    pub fn list(&self) -> Vec<ServerStatus> {
        let servers = self.servers.read().expect("registry lock");
        let mut statuses: Vec<ServerStatus> = servers
            .iter()
            .map(|(id, slot)| ServerStatus::from_slot(id, &slot.lock().expect("server slot lock")))
            .collect();
        statuses.sort_by(|a, b| a.server_id.cmp(&b.server_id));
        statuses
    }

    pub fn len(&self) -> usize {
        self.servers.read().expect("registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new(FreezePolicy::default())
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
