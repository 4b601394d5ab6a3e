use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    pub travel_speed: f64,
    pub draw_speed: f64,
    pub settle_ms: u64,
    /// Endpoint distance treated as touching when stitching; 0 is exact.
    pub stitch_tolerance: f64,
    pub deploy_dir: PathBuf,
}

impl DrawingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            travel_speed: 0.75,
            draw_speed: 0.5,
            settle_ms: 1000,
            stitch_tolerance: 0.0,
            deploy_dir: PathBuf::from("deploy"),
        }
    }
}
