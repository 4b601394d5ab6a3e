use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomingConfig {
    /// Voltage applied toward the home stop. Negative drives toward zero.
    pub drive_voltage: f64,
    pub spin_up_ms: u64,
    pub poll_interval_ms: u64,
    /// Combined velocity (percent) below which the axis counts as stalled.
    pub stall_threshold: f64,
    /// Largest velocity difference between paired actuators at the stop.
    pub sync_tolerance: f64,
    pub timeout_ms: u64,
}

impl HomingConfig {
    pub fn with_voltage(drive_voltage: f64) -> Self {
        Self {
            drive_voltage,
            ..Default::default()
        }
    }

    pub fn spin_up(&self) -> Duration {
        Duration::from_millis(self.spin_up_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            drive_voltage: -1.0,
            spin_up_ms: 1000,
            poll_interval_ms: 100,
            stall_threshold: 10.0,
            sync_tolerance: 5.0,
            timeout_ms: 20_000,
        }
    }
}
