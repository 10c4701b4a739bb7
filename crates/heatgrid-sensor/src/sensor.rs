//! Load sensors.
//!
//! A `LoadSensor` produces one `LoadReading` per call or fails. Retry and
//! fail-safe handling live in [`crate::reader`]; sensors themselves never
//! retry.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use heat_core::LoadReading;

/// Boxed future returned by [`LoadSensor::sample`].
pub type SampleFuture<'a> =
    Pin<Box<dyn Future<Output = Result<LoadReading, SensorError>> + Send + 'a>>;

/// Errors a single sample attempt can produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("sensor unavailable: {0}")]
    Unavailable(String),

    #[error("sensor sample timed out after {0:?}")]
    Timeout(Duration),
}

/// Something that can measure a server's load.
pub trait LoadSensor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Take one sample.
    fn sample(&self) -> SampleFuture<'_>;
}

// ── Simulated sensor ───────────────────────────────────────────────

/// Load phase the simulator is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Low,
    Medium,
    High,
}

impl LoadPhase {
    const CYCLE: [LoadPhase; 3] = [LoadPhase::Low, LoadPhase::Medium, LoadPhase::High];

    /// Inclusive hit range sampled in this phase.
    pub fn range(&self) -> (i32, i32) {
        match self {
            LoadPhase::Low => (30, 50),
            LoadPhase::Medium => (55, 70),
            LoadPhase::High => (75, 95),
        }
    }
}

/// Cycles LOW → MEDIUM → HIGH, spending `phase_cycles` samples in each
/// phase and drawing a uniform hit from the phase's range.
pub struct SimulatedSensor {
    phase_cycles: u64,
    samples: AtomicU64,
}

impl SimulatedSensor {
    pub fn new(phase_cycles: u32) -> Self {
        Self {
            phase_cycles: u64::from(phase_cycles.max(1)),
            samples: AtomicU64::new(0),
        }
    }

    /// Phase the next sample will be drawn from.
    pub fn current_phase(&self) -> LoadPhase {
        self.phase_at(self.samples.load(Ordering::Relaxed))
    }

    fn phase_at(&self, sample: u64) -> LoadPhase {
        let idx = (sample / self.phase_cycles) % LoadPhase::CYCLE.len() as u64;
        LoadPhase::CYCLE[idx as usize]
    }
}

impl LoadSensor for SimulatedSensor {
    fn name(&self) -> &str {
        "simulated"
    }

    fn sample(&self) -> SampleFuture<'_> {
        let n = self.samples.fetch_add(1, Ordering::Relaxed);
        let phase = self.phase_at(n);
        let (lo, hi) = phase.range();
        let hit = rand::thread_rng().gen_range(lo..=hi);
        debug!(?phase, hit, "simulated load sample");
        Box::pin(async move { Ok(LoadReading::simulated(hit)) })
    }
}

// ── Scripted sensor ────────────────────────────────────────────────

/// Replays a fixed queue of outcomes, then reports unavailable.
///
/// Used to drive the engine deterministically.
#[derive(Default)]
pub struct ScriptedSensor {
    script: Mutex<VecDeque<Result<LoadReading, SensorError>>>,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful real reading.
    pub fn then_value(self, hit: i32) -> Self {
        self.push(Ok(LoadReading::real(hit)));
        self
    }

    /// Queue a failed attempt.
    pub fn then_failure(self, reason: &str) -> Self {
        self.push(Err(SensorError::Unavailable(reason.to_string())));
        self
    }

    pub fn push(&self, outcome: Result<LoadReading, SensorError>) {
        self.script.lock().expect("script lock").push_back(outcome);
    }

    /// Outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script lock").len()
    }
}

impl LoadSensor for ScriptedSensor {
    fn name(&self) -> &str {
        "scripted"
    }

    fn sample(&self) -> SampleFuture<'_> {
        let next = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(SensorError::Unavailable("script exhausted".to_string())));
        Box::pin(async move { next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heat_core::Provenance;

    #[tokio::test]
    async fn simulator_walks_phases() {
        let sensor = SimulatedSensor::new(2);
        let expected = [
            LoadPhase::Low,
            LoadPhase::Low,
            LoadPhase::Medium,
            LoadPhase::Medium,
            LoadPhase::High,
            LoadPhase::High,
            LoadPhase::Low,
        ];

        for phase in expected {
            assert_eq!(sensor.current_phase(), phase);
            let reading = sensor.sample().await.unwrap();
            let (lo, hi) = phase.range();
            assert!((lo..=hi).contains(&reading.value), "{} not in {phase:?}", reading.value);
            assert_eq!(reading.provenance, Provenance::Simulated);
        }
    }

    #[test]
    fn simulator_treats_zero_cycles_as_one() {
        let sensor = SimulatedSensor::new(0);
        assert_eq!(sensor.phase_at(0), LoadPhase::Low);
        assert_eq!(sensor.phase_at(1), LoadPhase::Medium);
        assert_eq!(sensor.phase_at(2), LoadPhase::High);
    }

    #[tokio::test]
    async fn scripted_replays_in_order_then_runs_dry() {
        let sensor = ScriptedSensor::new()
            .then_value(42)
            .then_failure("bus error")
            .then_value(91);
        assert_eq!(sensor.remaining(), 3);

        assert_eq!(sensor.sample().await.unwrap().value, 42);
        assert_eq!(
            sensor.sample().await.unwrap_err(),
            SensorError::Unavailable("bus error".to_string())
        );
        assert_eq!(sensor.sample().await.unwrap().value, 91);
        assert!(sensor.sample().await.is_err());
        assert_eq!(sensor.remaining(), 0);
    }
}
