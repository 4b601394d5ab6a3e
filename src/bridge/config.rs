use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub address: String,
    pub reconnect_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub outbound_capacity: usize,
    pub inbound_capacity: usize,
    pub max_line_length: usize,
}

impl BridgeConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: "192.168.1.1:10002".to_string(),
            reconnect_interval_ms: 1000,
            connect_timeout_ms: 1000,
            outbound_capacity: 64,
            inbound_capacity: 64,
            max_line_length: 8192,
        }
    }
}
