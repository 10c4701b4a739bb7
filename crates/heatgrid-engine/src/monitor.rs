//! Cycle monitor — background evaluation loops.
//!
//! The `CycleMonitor` spawns one task per server. Each task reads the
//! sensor and feeds the registry on a fixed interval until it is stopped.
//! Loops are independent: stopping or aborting one never touches another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use heatgrid_sensor::SensorReader;

use crate::registry::ServerRegistry;

/// Per-server loop state.
struct MonitorSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Manages evaluation loops for all monitored servers.
pub struct CycleMonitor {
    registry: Arc<ServerRegistry>,
    reader: Arc<SensorReader>,
    interval: Duration,
    /// Active loops: server_id → slot.
    monitors: Arc<RwLock<HashMap<String, MonitorSlot>>>,
}

impl CycleMonitor {
    pub fn new(registry: Arc<ServerRegistry>, reader: Arc<SensorReader>, interval: Duration) -> Self {
        Self {
            registry,
            reader,
            interval,
            monitors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start evaluating a server with the shared reader. Replaces any loop
    /// already running for it.
    pub async fn start_monitor(&self, server_id: &str) {
        self.start_monitor_with(server_id, Arc::clone(&self.reader)).await;
    }

    /// Start evaluating a server with its own reader, so stateful sensors
    /// (like the phase simulator) advance once per cycle of this server only.
    pub async fn start_monitor_with(&self, server_id: &str, reader: Arc<SensorReader>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let server_id_owned = server_id.to_string();
        let registry = Arc::clone(&self.registry);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            run_cycle_loop(&server_id_owned, registry, reader, interval, shutdown_rx).await;
        });

        let mut monitors = self.monitors.write().await;
        if let Some(old) = monitors.insert(
            server_id.to_string(),
            MonitorSlot {
                handle,
                shutdown_tx,
            },
        ) {
            let _ = old.shutdown_tx.send(true);
            old.handle.abort();
        }

        info!(%server_id, interval_ms = interval.as_millis() as u64, "heat monitor started");
    }

    /// Stop evaluating a server. Its registry state is kept.
    pub async fn stop_monitor(&self, server_id: &str) {
        let mut monitors = self.monitors.write().await;
        if let Some(slot) = monitors.remove(server_id) {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
            info!(%server_id, "heat monitor stopped");
        }
    }

    /// Stop all loops (for graceful shutdown).
    pub async fn stop_all(&self) {
        let mut monitors = self.monitors.write().await;
        for (id, slot) in monitors.drain() {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
            debug!(server_id = %id, "heat monitor stopped");
        }
        info!("all heat monitors stopped");
    }

    /// Server ids with a running loop, sorted.
    pub async fn active_monitors(&self) -> Vec<String> {
        let monitors = self.monitors.read().await;
        let mut ids: Vec<String> = monitors.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn is_monitoring(&self, server_id: &str) -> bool {
        self.monitors.read().await.contains_key(server_id)
    }
}

/// The evaluation loop for a single server.
async fn run_cycle_loop(
    server_id: &str,
    registry: Arc<ServerRegistry>,
    reader: Arc<SensorReader>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(%server_id, "heat loop starting");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let report = registry.run_cycle(server_id, &reader).await;
                debug!(
                    %server_id,
                    hit = report.reading.value,
                    state = %report.decision.state,
                    freeze = report.freeze,
                    "heat cycle complete"
                );
            }
            _ = shutdown.changed() => {
                debug!(%server_id, "heat loop shutting down");
                break;
            }
        }
    }
}
