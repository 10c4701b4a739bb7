//! Sensor reader — retry, then fail safe.
//!
//! Each attempt is bounded by a timeout. After `max_attempts` failures
//! the reader stops trying and hands back a FAILSAFE reading, so callers
//! always get a value to classify.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use heat_core::LoadReading;
use heat_core::config::{
    DEFAULT_FAILSAFE_HIT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_SAMPLE_TIMEOUT,
    SensorConfig,
};

use crate::sensor::{LoadSensor, SensorError};

/// Wraps a sensor with the retry/fail-safe contract.
pub struct SensorReader {
    sensor: Arc<dyn LoadSensor>,
    max_attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
    failsafe_hit: i32,
}

impl SensorReader {
    /// Create a reader with default policy (3 attempts, 2s apart, fail-safe 75).
    pub fn new(sensor: Arc<dyn LoadSensor>) -> Self {
        Self {
            sensor,
            max_attempts: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_SAMPLE_TIMEOUT,
            failsafe_hit: DEFAULT_FAILSAFE_HIT,
        }
    }

    /// Create a reader from the `[sensor]` config section.
    pub fn from_config(sensor: Arc<dyn LoadSensor>, config: &SensorConfig) -> Self {
        Self::new(sensor)
            .with_retries(config.max_retries, config.retry_delay())
            .with_timeout(config.timeout())
            .with_failsafe_hit(config.failsafe_hit)
    }

    /// Set the attempt count (at least one) and the pause between attempts.
    pub fn with_retries(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_failsafe_hit(mut self, hit: i32) -> Self {
        self.failsafe_hit = hit;
        self
    }

    pub fn failsafe_hit(&self) -> i32 {
        self.failsafe_hit
    }

    pub fn sensor_name(&self) -> &str {
        self.sensor.name()
    }

    /// Read the sensor. Never fails.
    pub async fn read(&self) -> LoadReading {
        for attempt in 1..=self.max_attempts {
            match self.attempt().await {
                Ok(reading) => {
                    if attempt > 1 {
                        debug!(sensor = self.sensor.name(), attempt, "sensor recovered after retry");
                    }
                    return reading;
                }
                Err(e) => {
                    warn!(
                        sensor = self.sensor.name(),
                        attempt,
                        max = self.max_attempts,
                        error = %e,
                        "sensor read failed"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        warn!(
            sensor = self.sensor.name(),
            hit = self.failsafe_hit,
            "sensor retries exhausted, using fail-safe reading"
        );
        LoadReading::failsafe(self.failsafe_hit)
    }

    async fn attempt(&self) -> Result<LoadReading, SensorError> {
        match tokio::time::timeout(self.timeout, self.sensor.sample()).await {
            Ok(result) => result,
            Err(_) => Err(SensorError::Timeout(self.timeout)),
        }
    }
}
