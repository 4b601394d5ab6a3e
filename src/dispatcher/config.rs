use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Commands buffered ahead of the control task; further ones are dropped.
    pub queue_capacity: usize,
    pub move_speed: f64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            move_speed: 0.5,
        }
    }
}
