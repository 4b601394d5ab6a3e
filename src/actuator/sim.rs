//! `SimActuator` integrates its commanded velocity over (tokio) time and stops
//! dead against optional hard limits, where it reports zero velocity the way a
//! stalled motor does.

use std::sync::Arc;

use tokio::{sync::Mutex, time::Instant};

use super::{Actuator, Pen, Servo};
use crate::{
    axis::{config::AxisConfig, AxisController},
    motion::{config::MotionConfig, MotionCoordinator},
};

/// Free-running speed of an 18:1 cartridge, in encoder degrees per second.
const SIM_MAX_SPEED: f64 = 1200.0;

#[derive(Debug)]
struct SimState {
    position: f64,
    commanded: f64,
    last_update: Instant,
    stalled: bool,
}

pub struct SimActuator {
    name: String,
    max_speed: f64,
    max_voltage: f64,
    lower_stop: f64,
    upper_stop: f64,
    state: Mutex<SimState>,
}

impl SimActuator {
    /// `max_speed` is in ticks per second at 100 % velocity.
    pub fn new(name: impl Into<String>, max_speed: f64) -> Self {
        Self {
            name: name.into(),
            max_speed,
            max_voltage: 12.0,
            lower_stop: f64::NEG_INFINITY,
            upper_stop: f64::INFINITY,
            state: Mutex::new(SimState {
                position: 0.0,
                commanded: 0.0,
                last_update: Instant::now(),
                stalled: false,
            }),
        }
    }

    pub fn with_stops(mut self, lower: f64, upper: f64) -> Self {
        self.lower_stop = lower;
        self.upper_stop = upper;
        self
    }

    pub fn with_position(mut self, position: f64) -> Self {
        self.state.get_mut().position = position;
        self
    }

    pub async fn commanded(&self) -> f64 {
        self.state.lock().await.commanded
    }

    fn advance(&self, state: &mut SimState) {
        let now = Instant::now();
        let dt = now.duration_since(state.last_update).as_secs_f64();
        state.last_update = now;

        let next = state.position + state.commanded / 100.0 * self.max_speed * dt;
        let clamped = next.clamp(self.lower_stop, self.upper_stop);
        state.stalled = clamped != next
            || (clamped == self.lower_stop && state.commanded < 0.0)
            || (clamped == self.upper_stop && state.commanded > 0.0);
        state.position = clamped;
    }
}

#[async_trait::async_trait]
impl Actuator for SimActuator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn position(&self) -> anyhow::Result<f64> {
        let mut state = self.state.lock().await;
        self.advance(&mut state);
        Ok(state.position)
    }

    async fn velocity(&self) -> anyhow::Result<f64> {
        let mut state = self.state.lock().await;
        self.advance(&mut state);
        Ok(if state.stalled { 0.0 } else { state.commanded })
    }

    async fn set_velocity(&self, percent: f64) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        self.advance(&mut state);
        state.commanded = percent.clamp(-100.0, 100.0);
        Ok(())
    }

    async fn spin_voltage(&self, volts: f64) -> anyhow::Result<()> {
        self.set_velocity(volts / self.max_voltage * 100.0).await
    }
}

#[derive(Default)]
pub struct SimServo {
    history: Mutex<Vec<f64>>,
}

impl SimServo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn history(&self) -> Vec<f64> {
        self.history.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl Servo for SimServo {
    async fn set_position(&self, percent: f64) -> anyhow::Result<()> {
        self.history.lock().await.push(percent);
        Ok(())
    }
}

pub struct SimRig {
    pub x: [Arc<SimActuator>; 2],
    pub y: [Arc<SimActuator>; 2],
    pub servo: Arc<SimServo>,
    x_config: AxisConfig,
    y_config: AxisConfig,
}

impl SimRig {
    pub fn new() -> Self {
        Self::with_axes(AxisConfig::x(), AxisConfig::y())
    }

    pub fn with_axes(x_config: AxisConfig, y_config: AxisConfig) -> Self {
        let x_end = x_config.track_ticks - 30.0;
        let y_end = y_config.track_ticks - 40.0;
        let motor = |name: &str, lower: f64, upper: f64, start: f64| {
            Arc::new(
                SimActuator::new(name, SIM_MAX_SPEED)
                    .with_stops(lower, upper)
                    .with_position(start),
            )
        };

        Self {
            x: [
                motor("x_left", -30.0, x_end, 200.0),
                motor("x_right", -30.0, x_end, 200.0),
            ],
            y: [
                motor("y_left", -40.0, y_end, 300.0),
                motor("y_right", -40.0, y_end, 300.0),
            ],
            servo: Arc::new(SimServo::new()),
            x_config,
            y_config,
        }
    }

    pub fn coordinator(&self, config: MotionConfig) -> anyhow::Result<MotionCoordinator> {
        let x_actuators: Vec<Arc<dyn Actuator>> = vec![self.x[0].clone(), self.x[1].clone()];
        let y_actuators: Vec<Arc<dyn Actuator>> = vec![self.y[0].clone(), self.y[1].clone()];
        let x = AxisController::from_config("X", x_actuators, &self.x_config)?;
        let y = AxisController::from_config("Y", y_actuators, &self.y_config)?;

        Ok(MotionCoordinator::new(x, y, config)?
            .with_homing(self.x_config.homing.clone(), self.y_config.homing.clone()))
    }

    pub fn pen(&self) -> Pen {
        Pen::new(self.servo.clone())
    }

    /// Last commanded velocity of every actuator, X first.
    pub async fn commanded(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(4);
        for actuator in self.x.iter().chain(self.y.iter()) {
            out.push(actuator.commanded().await);
        }
        out
    }
}

impl Default for SimRig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_integrates_velocity() {
        let motor = SimActuator::new("m", 1000.0);
        motor.set_velocity(50.0).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        let pos = motor.position().await.unwrap();
        assert!((pos - 1000.0).abs() < 1e-6, "position {}", pos);
        assert_eq!(motor.velocity().await.unwrap(), 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalls_against_stop() {
        let motor = SimActuator::new("m", 1000.0)
            .with_stops(0.0, 100.0)
            .with_position(50.0);
        motor.spin_voltage(-6.0).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(motor.position().await.unwrap(), 0.0);
        assert_eq!(motor.velocity().await.unwrap(), 0.0);

        motor.set_velocity(10.0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(motor.position().await.unwrap() > 0.0);
        assert_eq!(motor.velocity().await.unwrap(), 10.0);
    }
}
