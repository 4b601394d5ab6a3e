pub mod config;

use anyhow::Result;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    axis::AxisController,
    geometry::{Envelope, Position},
    homing::{config::HomingConfig, CalibrationError, HomingSequencer},
};
use config::MotionConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    Converged,
    /// Deadline or iteration budget ran out; `distance` is the remaining error.
    Stalled { distance: f64 },
    Cancelled,
}

impl MoveOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, MoveOutcome::Converged)
    }

    pub fn into_result(self, target: Position) -> Result<(), MotionError> {
        match self {
            MoveOutcome::Converged => Ok(()),
            MoveOutcome::Stalled { distance } => Err(MotionError::Stalled { target, distance }),
            MoveOutcome::Cancelled => Err(MotionError::Cancelled { target }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MotionError {
    #[error("Move to {target} stalled {distance:.3} short of the target")]
    Stalled { target: Position, distance: f64 },

    #[error("Move to {target} was cancelled")]
    Cancelled { target: Position },

    #[error("Move target {target} is not a finite position")]
    InvalidTarget { target: Position },

    #[error("Speed scale {speed_scale} is not a finite number")]
    InvalidSpeed { speed_scale: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveStatus {
    InProgress { distance: f64 },
    Done(MoveOutcome),
}

#[derive(Debug, Clone)]
pub struct MoveTask {
    target: Position,
    speed_scale: f64,
    deadline: Instant,
    iterations: u64,
}

impl MoveTask {
    pub fn target(&self) -> Position {
        self.target
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub async fn tick(
        &mut self,
        motion: &mut MotionCoordinator,
        now: Instant,
    ) -> Result<MoveStatus> {
        let position = motion.position().await?;
        let distance = position.distance(&self.target);

        if distance < motion.config.tolerance {
            motion.stop().await?;
            debug!(
                "Reached {} after {} iterations",
                self.target, self.iterations
            );
            return Ok(MoveStatus::Done(MoveOutcome::Converged));
        }

        if now >= self.deadline || self.iterations >= motion.config.max_iterations {
            motion.stop().await?;
            warn!(
                "Move to {} stalled at {} ({:.3} away)",
                self.target, position, distance
            );
            return Ok(MoveStatus::Done(MoveOutcome::Stalled { distance }));
        }

        let max_output = motion.config.max_output;
        motion.x.drive(self.speed_scale, max_output).await?;
        motion.y.drive(self.speed_scale, max_output).await?;
        self.iterations += 1;

        Ok(MoveStatus::InProgress { distance })
    }
}

pub struct MotionCoordinator {
    x: AxisController,
    y: AxisController,
    homing: [HomingConfig; 2],
    config: MotionConfig,
}

impl MotionCoordinator {
    pub fn new(x: AxisController, y: AxisController, config: MotionConfig) -> Result<Self> {
        if !config.envelope.is_valid() {
            anyhow::bail!(
                "Envelope {} to {} is empty or inverted",
                config.envelope.min,
                config.envelope.max
            );
        }

        Ok(Self {
            x,
            y,
            homing: [HomingConfig::with_voltage(-1.0), HomingConfig::with_voltage(-3.0)],
            config,
        })
    }

    pub fn with_homing(mut self, x: HomingConfig, y: HomingConfig) -> Self {
        self.homing = [x, y];
        self
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn envelope(&self) -> &Envelope {
        &self.config.envelope
    }

    pub fn x_axis(&self) -> &AxisController {
        &self.x
    }

    pub fn y_axis(&self) -> &AxisController {
        &self.y
    }

    pub async fn position(&self) -> Result<Position> {
        Ok(Position::new(
            self.x.position().await?,
            self.y.position().await?,
        ))
    }

    /// Homes X, then Y.
    pub async fn home(&mut self, cancel: &CancellationToken) -> Result<(), CalibrationError> {
        HomingSequencer::new(self.homing[0].clone())
            .run(&mut self.x, cancel)
            .await?;
        HomingSequencer::new(self.homing[1].clone())
            .run(&mut self.y, cancel)
            .await?;
        Ok(())
    }

    /// Clamps the target into the envelope and restarts every axis loop on it.
    pub fn begin_move(
        &mut self,
        target: Position,
        speed_scale: f64,
    ) -> Result<MoveTask, MotionError> {
        if !target.is_finite() {
            return Err(MotionError::InvalidTarget { target });
        }
        if !speed_scale.is_finite() {
            return Err(MotionError::InvalidSpeed { speed_scale });
        }

        let clamped = self.config.envelope.clamp(target);
        if clamped != target {
            debug!("Target {} clamped to {}", target, clamped);
        }

        self.x.set_target(clamped.x);
        self.y.set_target(clamped.y);

        Ok(MoveTask {
            target: clamped,
            speed_scale: speed_scale.clamp(0.0, 1.0),
            deadline: Instant::now() + self.config.move_timeout(),
            iterations: 0,
        })
    }

    pub async fn move_to(&mut self, target: Position, speed_scale: f64) -> Result<MoveOutcome> {
        self.move_to_cancellable(target, speed_scale, &CancellationToken::new())
            .await
    }

    pub async fn move_to_cancellable(
        &mut self,
        target: Position,
        speed_scale: f64,
        cancel: &CancellationToken,
    ) -> Result<MoveOutcome> {
        let mut task = self.begin_move(target, speed_scale)?;
        debug!("Moving to {} at speed {}", task.target(), speed_scale);

        loop {
            if let MoveStatus::Done(outcome) = task.tick(self, Instant::now()).await? {
                return Ok(outcome);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    self.stop().await?;
                    info!("Move to {} cancelled", task.target());
                    return Ok(MoveOutcome::Cancelled);
                }
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }

    /// Visits every point in order; gives up at the first point not reached.
    pub async fn follow(
        &mut self,
        path: &[Position],
        speed_scale: f64,
        cancel: &CancellationToken,
    ) -> Result<MoveOutcome> {
        for point in path {
            let outcome = self
                .move_to_cancellable(*point, speed_scale, cancel)
                .await?;
            if !outcome.is_converged() {
                return Ok(outcome);
            }
        }
        Ok(MoveOutcome::Converged)
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.x.stop().await?;
        self.y.stop().await
    }
}
