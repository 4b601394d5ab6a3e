use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::Envelope;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub envelope: Envelope,
    /// Distance from the target at which a move counts as converged.
    pub tolerance: f64,
    /// Largest actuator command, as a fraction of full speed.
    pub max_output: f64,
    pub poll_interval_ms: u64,
    pub move_timeout_ms: u64,
    pub max_iterations: u64,
}

impl MotionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn move_timeout(&self) -> Duration {
        Duration::from_millis(self.move_timeout_ms)
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            envelope: Envelope::default(),
            tolerance: 0.05,
            max_output: 0.3,
            poll_interval_ms: 10,
            move_timeout_ms: 30_000,
            max_iterations: 100_000,
        }
    }
}
