pub mod config;

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::axis::{state::AxisState, AxisController};
use config::HomingConfig;

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("Axis {axis} did not reach its home stop within {timeout:?}")]
    Timeout { axis: String, timeout: Duration },

    #[error("Homing of axis {axis} was cancelled")]
    Cancelled { axis: String },

    #[error("Actuator failure while homing axis {axis}: {source}")]
    Actuator {
        axis: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingPhase {
    Idle,
    SpinningUp { until: Instant },
    Polling,
    Zeroed,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingStatus {
    InProgress,
    Zeroed,
}

pub struct HomingSequencer {
    config: HomingConfig,
    phase: HomingPhase,
    deadline: Option<Instant>,
}

impl HomingSequencer {
    pub fn new(config: HomingConfig) -> Self {
        Self {
            config,
            phase: HomingPhase::Idle,
            deadline: None,
        }
    }

    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    pub async fn tick(
        &mut self,
        axis: &mut AxisController,
        now: Instant,
    ) -> Result<HomingStatus, CalibrationError> {
        let axis_name = axis.name().to_string();
        let actuator_err = |source: anyhow::Error| CalibrationError::Actuator {
            axis: axis_name.clone(),
            source,
        };

        match self.phase {
            HomingPhase::Zeroed => return Ok(HomingStatus::Zeroed),
            HomingPhase::TimedOut => return Err(self.timeout_error(axis)),
            HomingPhase::Cancelled => {
                return Err(CalibrationError::Cancelled {
                    axis: axis_name.clone(),
                })
            }
            HomingPhase::Idle => {
                info!(
                    "Homing axis {} at {} V",
                    axis.name(),
                    self.config.drive_voltage
                );
                axis.set_state(AxisState::Homing);
                axis.spin_voltage(self.config.drive_voltage)
                    .await
                    .map_err(actuator_err)?;
                self.deadline = Some(now + self.config.timeout());
                self.phase = HomingPhase::SpinningUp {
                    until: now + self.config.spin_up(),
                };
                return Ok(HomingStatus::InProgress);
            }
            _ => {}
        }

        if self.deadline.is_some_and(|deadline| now >= deadline) {
            warn!("Homing axis {} timed out", axis.name());
            self.phase = HomingPhase::TimedOut;
            axis.set_state(AxisState::Fault);
            axis.hold().await.map_err(actuator_err)?;
            return Err(self.timeout_error(axis));
        }

        if let HomingPhase::SpinningUp { until } = self.phase {
            if now < until {
                return Ok(HomingStatus::InProgress);
            }
            self.phase = HomingPhase::Polling;
        }

        let velocities = axis.velocities().await.map_err(actuator_err)?;
        let combined = velocities.iter().sum::<f64>().abs();
        let spread = velocities.iter().cloned().fold(f64::MIN, f64::max)
            - velocities.iter().cloned().fold(f64::MAX, f64::min);
        debug!(
            "Axis {} homing velocities {:?} (combined {:.2})",
            axis.name(),
            velocities,
            combined
        );

        if combined >= self.config.stall_threshold || spread > self.config.sync_tolerance {
            return Ok(HomingStatus::InProgress);
        }

        axis.zero_here().await.map_err(actuator_err)?;
        axis.hold().await.map_err(actuator_err)?;
        axis.set_state(AxisState::Idle);
        self.phase = HomingPhase::Zeroed;
        info!("Calibrated axis {}", axis.name());
        Ok(HomingStatus::Zeroed)
    }

    pub async fn run(
        &mut self,
        axis: &mut AxisController,
        cancel: &CancellationToken,
    ) -> Result<(), CalibrationError> {
        loop {
            if self.tick(axis, Instant::now()).await? == HomingStatus::Zeroed {
                return Ok(());
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    self.phase = HomingPhase::Cancelled;
                    axis.set_state(AxisState::Unhomed);
                    axis.hold().await.map_err(|source| CalibrationError::Actuator {
                        axis: axis.name().to_string(),
                        source,
                    })?;
                    return Err(CalibrationError::Cancelled {
                        axis: axis.name().to_string(),
                    });
                }
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }

    fn timeout_error(&self, axis: &AxisController) -> CalibrationError {
        CalibrationError::Timeout {
            axis: axis.name().to_string(),
            timeout: self.config.timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        actuator::{sim::SimActuator, Actuator},
        axis::config::Coupling,
        pid::PidGains,
        units::UnitConverter,
    };
    use std::sync::Arc;

    fn axis(left: Arc<SimActuator>, right: Arc<SimActuator>) -> AxisController {
        let actuators: Vec<Arc<dyn Actuator>> = vec![left, right];
        AxisController::new(
            "X",
            actuators,
            UnitConverter::new(100.0),
            Coupling::Averaged,
            PidGains::default(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_homes_against_stop() {
        let left = Arc::new(
            SimActuator::new("left", 1200.0)
                .with_stops(-20.0, 1000.0)
                .with_position(300.0),
        );
        let right = Arc::new(
            SimActuator::new("right", 1200.0)
                .with_stops(-25.0, 1000.0)
                .with_position(310.0),
        );
        let mut axis = axis(left.clone(), right.clone());
        let mut homing = HomingSequencer::new(HomingConfig::default());

        homing
            .run(&mut axis, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(homing.phase(), HomingPhase::Zeroed);
        assert_eq!(axis.state(), AxisState::Idle);
        assert_eq!(axis.actuator_positions().await.unwrap(), vec![0.0, 0.0]);
        assert_eq!(left.commanded().await, 0.0);
        assert_eq!(right.commanded().await, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_both_actuators_to_stop() {
        // The right actuator has a long way further to travel.
        let left = Arc::new(
            SimActuator::new("left", 1200.0)
                .with_stops(0.0, 1000.0)
                .with_position(50.0),
        );
        let right = Arc::new(
            SimActuator::new("right", 1200.0)
                .with_stops(0.0, 1000.0)
                .with_position(600.0),
        );
        let mut axis = axis(left.clone(), right.clone());
        let mut homing = HomingSequencer::new(HomingConfig::default());

        let started = Instant::now();
        homing
            .run(&mut axis, &CancellationToken::new())
            .await
            .unwrap();

        // 600 ticks at 100 ticks/s.
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert_eq!(right.position().await.unwrap(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_stop() {
        let left = Arc::new(SimActuator::new("left", 1200.0));
        let right = Arc::new(SimActuator::new("right", 1200.0));
        let mut axis = axis(left.clone(), right);
        let mut homing = HomingSequencer::new(HomingConfig::default());

        let result = homing.run(&mut axis, &CancellationToken::new()).await;

        assert!(matches!(result, Err(CalibrationError::Timeout { .. })));
        assert_eq!(axis.state(), AxisState::Fault);
        assert_eq!(left.commanded().await, 0.0);

        // Ticking a failed sequencer keeps reporting the failure.
        let again = homing.tick(&mut axis, Instant::now()).await;
        assert!(matches!(again, Err(CalibrationError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_homing() {
        let left = Arc::new(SimActuator::new("left", 1200.0));
        let right = Arc::new(SimActuator::new("right", 1200.0));
        let mut axis = axis(left.clone(), right);
        let mut homing = HomingSequencer::new(HomingConfig::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            trigger.cancel();
        });

        let result = homing.run(&mut axis, &cancel).await;
        assert!(matches!(result, Err(CalibrationError::Cancelled { .. })));
        assert_eq!(axis.state(), AxisState::Unhomed);
        assert_eq!(left.commanded().await, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_sequence_stays_cancelled() {
        let left = Arc::new(SimActuator::new("left", 1200.0));
        let right = Arc::new(SimActuator::new("right", 1200.0));
        let mut axis = axis(left, right);
        let mut homing = HomingSequencer::new(HomingConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = homing.run(&mut axis, &cancel).await;
        assert!(matches!(result, Err(CalibrationError::Cancelled { .. })));
        assert_eq!(homing.phase(), HomingPhase::Cancelled);

        // Well past the homing deadline, the sequence still reports the cancel.
        let later = Instant::now() + Duration::from_secs(3600);
        let again = homing.tick(&mut axis, later).await;
        assert!(matches!(again, Err(CalibrationError::Cancelled { .. })));
        assert_eq!(axis.state(), AxisState::Unhomed);
    }
}
