use serde::{Deserialize, Serialize};

use crate::{homing::config::HomingConfig, pid::PidGains, units::UnitConverter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coupling {
    /// One loop on the averaged position, same output to every actuator.
    Averaged,
    /// One loop per actuator, each fed its own position.
    PerActuator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    /// Encoder ticks counted over the full mechanical track.
    pub track_ticks: f64,
    pub track_length: f64,
    pub coupling: Coupling,
    pub pid: PidGains,
    pub homing: HomingConfig,
}

impl AxisConfig {
    pub fn x() -> Self {
        Self {
            track_ticks: 1250.0,
            track_length: 9.0,
            coupling: Coupling::Averaged,
            pid: PidGains::proportional(0.6),
            homing: HomingConfig::with_voltage(-1.0),
        }
    }

    pub fn y() -> Self {
        Self {
            track_ticks: 1371.0,
            track_length: 9.25,
            coupling: Coupling::PerActuator,
            pid: PidGains::proportional(0.7),
            homing: HomingConfig::with_voltage(-3.0),
        }
    }

    pub fn converter(&self) -> UnitConverter {
        UnitConverter::from_track(self.track_ticks, self.track_length)
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self::x()
    }
}
