use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitConverter {
    ticks_per_unit: f64,
}

impl UnitConverter {
    pub fn new(ticks_per_unit: f64) -> Self {
        Self { ticks_per_unit }
    }

    pub fn from_track(track_ticks: f64, track_length: f64) -> Self {
        Self::new(track_ticks / track_length)
    }

    pub fn ticks_per_unit(&self) -> f64 {
        self.ticks_per_unit
    }

    pub fn to_physical(&self, raw_ticks: f64) -> f64 {
        raw_ticks / self.ticks_per_unit
    }

    pub fn to_raw(&self, distance: f64) -> f64 {
        distance * self.ticks_per_unit
    }
}
