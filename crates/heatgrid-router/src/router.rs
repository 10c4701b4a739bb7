//! Load routing — freeze/release hysteresis and least-loaded selection.
//!
//! Each server carries a `RouteState`. A reading at or above the freeze
//! threshold freezes the server; it is released only once a reading falls
//! to or below the release threshold. Readings in between leave the flag
//! alone. New traffic goes to the unfrozen server with the lowest last
//! load, ties broken by server id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use heat_core::ServerId;
use heat_core::config::{DEFAULT_FREEZE_THRESHOLD, DEFAULT_RELEASE_THRESHOLD, RouterConfig};

use crate::error::{RouterError, RouterResult};

/// Freeze/release thresholds. `release < freeze` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreezePolicy {
    freeze_threshold: i32,
    release_threshold: i32,
}

impl FreezePolicy {
    pub fn new(freeze_threshold: i32, release_threshold: i32) -> RouterResult<Self> {
        if release_threshold >= freeze_threshold {
            return Err(RouterError::InvalidBand {
                freeze: freeze_threshold,
                release: release_threshold,
            });
        }
        Ok(Self {
            freeze_threshold,
            release_threshold,
        })
    }

    pub fn from_config(config: &RouterConfig) -> RouterResult<Self> {
        Self::new(config.freeze_threshold, config.release_threshold)
    }

    pub fn freeze_threshold(&self) -> i32 {
        self.freeze_threshold
    }

    pub fn release_threshold(&self) -> i32 {
        self.release_threshold
    }
}

impl Default for FreezePolicy {
    fn default() -> Self {
        Self {
            freeze_threshold: DEFAULT_FREEZE_THRESHOLD,
            release_threshold: DEFAULT_RELEASE_THRESHOLD,
        }
    }
}

/// What a single observation did to the freeze flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeTransition {
    Froze,
    Released,
    Unchanged,
}

/// Routing view of one server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteState {
    pub freeze: bool,
    pub last_load: i32,
}

impl RouteState {
    /// Record a load observation and apply hysteresis.
    pub fn observe(&mut self, load: i32, policy: &FreezePolicy) -> FreezeTransition {
        self.last_load = load;

        if load >= policy.freeze_threshold {
            if !self.freeze {
                self.freeze = true;
                return FreezeTransition::Froze;
            }
        } else if load <= policy.release_threshold && self.freeze {
            self.freeze = false;
            return FreezeTransition::Released;
        }

        FreezeTransition::Unchanged
    }

    /// Whether the server may receive new traffic.
    pub fn is_active(&self) -> bool {
        !self.freeze
    }
}

/// Pick the unfrozen server with the lowest last load.
///
/// Ties go to the lexicographically smallest id regardless of iteration
/// order. Returns `None` when every server is frozen or there are none,
/// which means all new traffic should be held.
pub fn select_target<'a, I>(servers: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a RouteState)>,
{
    servers
        .into_iter()
        .filter(|(_, route)| route.is_active())
        .min_by(|(a_id, a), (b_id, b)| a.last_load.cmp(&b.last_load).then_with(|| a_id.cmp(b_id)))
        .map(|(id, _)| id)
}

/// Record `load` for `server_id` (creating its route state if needed),
/// then return the current routing target.
pub fn update_and_select(
    servers: &mut BTreeMap<ServerId, RouteState>,
    server_id: &str,
    load: i32,
    policy: &FreezePolicy,
) -> Option<ServerId> {
    let route = servers.entry(server_id.to_string()).or_default();
    log_transition(server_id, load, route.observe(load, policy));

    select_target(servers.iter().map(|(id, route)| (id.as_str(), route))).map(str::to_string)
}

/// Emit the log line for a freeze transition.
pub fn log_transition(server_id: &str, load: i32, transition: FreezeTransition) {
    match transition {
        FreezeTransition::Froze => {
            warn!(%server_id, load, "server frozen, routing around it");
        }
        FreezeTransition::Released => {
            debug!(%server_id, load, "server released back into rotation");
        }
        FreezeTransition::Unchanged => {}
    }
}
