pub mod config;
pub mod state;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::{
    actuator::Actuator,
    pid::{PidController, PidGains},
    units::UnitConverter,
};
use config::{AxisConfig, Coupling};
use state::AxisState;

pub struct AxisController {
    name: String,
    actuators: Vec<Arc<dyn Actuator>>,
    converter: UnitConverter,
    coupling: Coupling,
    pids: Vec<PidController>,
    zero: Vec<f64>,
    state: AxisState,
}

impl AxisController {
    pub fn new(
        name: impl Into<String>,
        actuators: Vec<Arc<dyn Actuator>>,
        converter: UnitConverter,
        coupling: Coupling,
        gains: PidGains,
    ) -> Result<Self> {
        let name = name.into();
        if actuators.is_empty() || actuators.len() > 2 {
            anyhow::bail!(
                "Axis {} needs one or two actuators, got {}",
                name,
                actuators.len()
            );
        }

        let loops = match coupling {
            Coupling::Averaged => 1,
            Coupling::PerActuator => actuators.len(),
        };
        let pids = (0..loops).map(|_| PidController::new(gains)).collect();
        let zero = vec![0.0; actuators.len()];

        Ok(Self {
            name,
            actuators,
            converter,
            coupling,
            pids,
            zero,
            state: AxisState::Unhomed,
        })
    }

    pub fn from_config(
        name: impl Into<String>,
        actuators: Vec<Arc<dyn Actuator>>,
        config: &AxisConfig,
    ) -> Result<Self> {
        Self::new(
            name,
            actuators,
            config.converter(),
            config.coupling,
            config.pid,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> AxisState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: AxisState) {
        self.state = state;
    }

    pub fn converter(&self) -> &UnitConverter {
        &self.converter
    }

    pub fn actuator_count(&self) -> usize {
        self.actuators.len()
    }

    pub fn target(&self) -> f64 {
        self.pids[0].setpoint()
    }

    /// Physical position of every actuator relative to the zero reference.
    pub async fn actuator_positions(&self) -> Result<Vec<f64>> {
        let mut positions = Vec::with_capacity(self.actuators.len());
        for (actuator, zero) in self.actuators.iter().zip(&self.zero) {
            let raw = actuator.position().await?;
            positions.push(self.converter.to_physical(raw - zero));
        }
        Ok(positions)
    }

    pub async fn position(&self) -> Result<f64> {
        let positions = self.actuator_positions().await?;
        Ok(positions.iter().sum::<f64>() / positions.len() as f64)
    }

    pub async fn velocities(&self) -> Result<Vec<f64>> {
        let mut velocities = Vec::with_capacity(self.actuators.len());
        for actuator in &self.actuators {
            velocities.push(actuator.velocity().await?);
        }
        Ok(velocities)
    }

    /// Resets every loop, even when the target value is unchanged.
    pub fn set_target(&mut self, target: f64) {
        for pid in &mut self.pids {
            pid.reset();
            pid.set_setpoint(target);
        }
    }

    pub fn integrals(&self) -> Vec<f64> {
        self.pids.iter().map(PidController::integral).collect()
    }

    /// Runs one control step: PID output scaled by `speed_scale` and clamped
    /// to `±max_output` (fraction of full speed).
    pub async fn drive(&mut self, speed_scale: f64, max_output: f64) -> Result<()> {
        let positions = self.actuator_positions().await?;

        match self.coupling {
            Coupling::Averaged => {
                let average = positions.iter().sum::<f64>() / positions.len() as f64;
                let output = clamp_output(self.pids[0].update(average) * speed_scale, max_output);
                for actuator in &self.actuators {
                    actuator.set_velocity(output * 100.0).await?;
                }
            }
            Coupling::PerActuator => {
                for ((actuator, pid), position) in
                    self.actuators.iter().zip(&mut self.pids).zip(positions)
                {
                    let output = clamp_output(pid.update(position) * speed_scale, max_output);
                    actuator.set_velocity(output * 100.0).await?;
                }
            }
        }

        self.state = AxisState::Moving;
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        for actuator in &self.actuators {
            actuator.set_velocity(0.0).await?;
        }
        if self.state == AxisState::Moving {
            self.state = AxisState::Idle;
        }
        Ok(())
    }

    pub async fn spin_voltage(&self, volts: f64) -> Result<()> {
        for actuator in &self.actuators {
            actuator.spin_voltage(volts).await?;
        }
        Ok(())
    }

    pub async fn zero_here(&mut self) -> Result<()> {
        for (actuator, zero) in self.actuators.iter().zip(&mut self.zero) {
            *zero = actuator.position().await?;
        }
        for pid in &mut self.pids {
            pid.reset();
        }
        debug!("Axis {} zeroed at raw {:?}", self.name, self.zero);
        Ok(())
    }

    pub async fn hold(&self) -> Result<()> {
        for actuator in &self.actuators {
            actuator.hold().await?;
        }
        Ok(())
    }
}

fn clamp_output(output: f64, max_output: f64) -> f64 {
    output.clamp(-max_output, max_output)
}
