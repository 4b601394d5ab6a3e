pub mod sim;

use std::sync::Arc;

/// Positions are raw encoder ticks; velocities are percent of the
/// actuator's maximum speed.
#[async_trait::async_trait]
pub trait Actuator: Send + Sync {
    fn name(&self) -> &str;

    async fn position(&self) -> anyhow::Result<f64>;
    async fn velocity(&self) -> anyhow::Result<f64>;

    async fn set_velocity(&self, percent: f64) -> anyhow::Result<()>;
    async fn spin_voltage(&self, volts: f64) -> anyhow::Result<()>;

    async fn hold(&self) -> anyhow::Result<()> {
        self.set_velocity(0.0).await
    }
}

/// Positional servo, addressed in percent of its travel.
#[async_trait::async_trait]
pub trait Servo: Send + Sync {
    async fn set_position(&self, percent: f64) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenState {
    Up,
    Down,
}

pub struct Pen {
    servo: Arc<dyn Servo>,
    up_percent: f64,
    down_percent: f64,
    state: Option<PenState>,
}

impl Pen {
    pub fn new(servo: Arc<dyn Servo>) -> Self {
        Self {
            servo,
            up_percent: 100.0,
            down_percent: 0.0,
            state: None,
        }
    }

    pub fn with_positions(mut self, up_percent: f64, down_percent: f64) -> Self {
        self.up_percent = up_percent;
        self.down_percent = down_percent;
        self
    }

    /// Last commanded state; `None` until the pen has been driven once.
    pub fn state(&self) -> Option<PenState> {
        self.state
    }

    pub async fn up(&mut self) -> anyhow::Result<()> {
        self.servo.set_position(self.up_percent).await?;
        self.state = Some(PenState::Up);
        Ok(())
    }

    pub async fn down(&mut self) -> anyhow::Result<()> {
        self.servo.set_position(self.down_percent).await?;
        self.state = Some(PenState::Down);
        Ok(())
    }
}
