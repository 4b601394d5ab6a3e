pub mod config;
pub mod peripheral;

use std::{path::Path, sync::Arc};

use anyhow::Result;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    actuator::Pen,
    drawing::{DrawingError, DrawingSequencer},
    motion::MotionCoordinator,
    protocol::command::Command,
};
use config::DispatcherConfig;
use peripheral::{LoggingPeripheral, PeripheralControl};

/// When the queue is full the newest command is the one dropped.
#[derive(Clone)]
pub struct CommandQueue {
    sender: mpsc::Sender<Command>,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Command>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn submit(&self, command: Command) -> bool {
        match self.sender.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(command)) => {
                warn!("Command queue full, dropping {}", command);
                false
            }
            Err(TrySendError::Closed(command)) => {
                warn!("Control task gone, dropping {}", command);
                false
            }
        }
    }
}

pub struct Plotter {
    motion: MotionCoordinator,
    pen: Pen,
    drawing: DrawingSequencer,
    peripheral: Arc<dyn PeripheralControl>,
    move_speed: f64,
}

impl Plotter {
    pub fn new(
        motion: MotionCoordinator,
        pen: Pen,
        drawing: DrawingSequencer,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            motion,
            pen,
            drawing,
            peripheral: Arc::new(LoggingPeripheral),
            move_speed: config.move_speed,
        }
    }

    pub fn with_peripheral(mut self, peripheral: Arc<dyn PeripheralControl>) -> Self {
        self.peripheral = peripheral;
        self
    }

    pub fn motion(&self) -> &MotionCoordinator {
        &self.motion
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    pub async fn setup(&mut self, cancel: &CancellationToken) -> Result<()> {
        info!("Setting up plotter");
        self.pen.up().await?;
        self.motion.home(cancel).await?;
        info!("Plotter ready");
        Ok(())
    }

    pub async fn draw_dxf_file(
        &mut self,
        file: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<(), DrawingError> {
        self.drawing
            .draw_dxf_file(&mut self.motion, &mut self.pen, file, cancel)
            .await
    }

    pub async fn dispatch(&mut self, command: Command, cancel: &CancellationToken) -> Result<()> {
        debug!("Dispatching {}", command);

        match command {
            Command::PenUp => self.pen.up().await?,
            Command::PenDown => self.pen.down().await?,
            Command::MoveTo(target) => {
                self.motion
                    .move_to_cancellable(target, self.move_speed, cancel)
                    .await?
                    .into_result(target)?;
            }
            Command::Clear => debug!("Nothing to clear on the plotter"),
            Command::RestartPeripheral => self.peripheral.restart_peripheral().await?,
            Command::RestartBridge => self.peripheral.restart_bridge().await?,
        }

        Ok(())
    }

    /// Processes queued commands in order until the queue closes or `cancel`
    /// fires, then stops the axes and raises the pen.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<Command>,
        cancel: CancellationToken,
    ) -> Result<()> {
        info!("Control loop started");

        loop {
            let command = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            if let Err(e) = self.dispatch(command, &cancel).await {
                if cancel.is_cancelled() {
                    break;
                }
                error!("Command {} failed: {:#}", command, e);
            }
        }

        info!("Control loop stopping");
        self.motion.stop().await?;
        self.pen.up().await
    }
}
