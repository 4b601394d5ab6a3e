pub mod config;

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    actuator::Pen,
    dxf::{self, DxfError},
    geometry::Position,
    motion::{MotionCoordinator, MotionError},
    path::{self, shapes, PathSegment},
};
use config::DrawingConfig;

#[derive(Debug, thiserror::Error)]
pub enum DrawingError {
    #[error(transparent)]
    Motion(#[from] MotionError),

    #[error("Drawing cancelled")]
    Cancelled,

    #[error("Failed to read drawing {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid drawing: {0}")]
    Dxf(#[from] DxfError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] anyhow::Error),
}

pub struct DrawingSequencer {
    config: DrawingConfig,
}

impl DrawingSequencer {
    pub fn new(config: DrawingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DrawingConfig {
        &self.config
    }

    /// Draws every path in order, then returns the tool to the origin.
    pub async fn draw_paths(
        &self,
        motion: &mut MotionCoordinator,
        pen: &mut Pen,
        paths: &[PathSegment],
        cancel: &CancellationToken,
    ) -> Result<(), DrawingError> {
        info!("Drawing {} paths", paths.len());

        let result = self.draw_then_return(motion, pen, paths, cancel).await;
        if result.is_err() {
            Self::abort(motion, pen).await;
        }
        result
    }

    pub async fn draw_dxf_str(
        &self,
        motion: &mut MotionCoordinator,
        pen: &mut Pen,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DrawingError> {
        let segments = dxf::load_paths(content)?;
        let paths = path::stitch(segments, self.config.stitch_tolerance);
        debug!("Stitched drawing into {} paths", paths.len());
        self.draw_paths(motion, pen, &paths, cancel).await
    }

    /// Reads a DXF file (relative names resolve against the deploy
    /// directory) and draws it.
    pub async fn draw_dxf_file(
        &self,
        motion: &mut MotionCoordinator,
        pen: &mut Pen,
        file: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<(), DrawingError> {
        let path = self.resolve(file.as_ref());
        info!("Loading drawing {}", path.display());
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| DrawingError::Read {
                path: path.clone(),
                source,
            })?;
        self.draw_dxf_str(motion, pen, &content, cancel).await
    }

    /// Draws a rectangle and returns to wherever the tool was beforehand.
    pub async fn draw_rectangle(
        &self,
        motion: &mut MotionCoordinator,
        pen: &mut Pen,
        bottom_left: Position,
        width: f64,
        height: f64,
        cancel: &CancellationToken,
    ) -> Result<(), DrawingError> {
        let start = motion.position().await?;
        let rectangle = shapes::rectangle(bottom_left, width, height);

        let result = async {
            self.trace(motion, pen, &rectangle, cancel).await?;
            self.travel(motion, start, cancel).await
        }
        .await;

        if result.is_err() {
            Self::abort(motion, pen).await;
        }
        result
    }

    pub async fn draw_square(
        &self,
        motion: &mut MotionCoordinator,
        pen: &mut Pen,
        bottom_left: Position,
        side: f64,
        cancel: &CancellationToken,
    ) -> Result<(), DrawingError> {
        self.draw_rectangle(motion, pen, bottom_left, side, side, cancel)
            .await
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.config.deploy_dir.join(file)
        }
    }

    async fn draw_then_return(
        &self,
        motion: &mut MotionCoordinator,
        pen: &mut Pen,
        paths: &[PathSegment],
        cancel: &CancellationToken,
    ) -> Result<(), DrawingError> {
        pen.up().await?;
        for path in paths {
            self.trace(motion, pen, path, cancel).await?;
        }
        self.travel(motion, Position::ORIGIN, cancel).await
    }

    async fn trace(
        &self,
        motion: &mut MotionCoordinator,
        pen: &mut Pen,
        path: &PathSegment,
        cancel: &CancellationToken,
    ) -> Result<(), DrawingError> {
        let path = path.clamped(motion.envelope());
        let Some((start, rest)) = path.points().split_first() else {
            return Ok(());
        };

        pen.up().await?;
        self.travel(motion, *start, cancel).await?;
        pen.down().await?;
        self.settle(cancel).await?;

        for point in rest {
            motion
                .move_to_cancellable(*point, self.config.draw_speed, cancel)
                .await?
                .into_result(*point)?;
        }

        pen.up().await?;
        self.settle(cancel).await
    }

    async fn travel(
        &self,
        motion: &mut MotionCoordinator,
        target: Position,
        cancel: &CancellationToken,
    ) -> Result<(), DrawingError> {
        motion
            .move_to_cancellable(target, self.config.travel_speed, cancel)
            .await?
            .into_result(target)?;
        Ok(())
    }

    async fn settle(&self, cancel: &CancellationToken) -> Result<(), DrawingError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(DrawingError::Cancelled),
            _ = tokio::time::sleep(self.config.settle()) => Ok(()),
        }
    }

    async fn abort(motion: &mut MotionCoordinator, pen: &mut Pen) {
        if let Err(e) = motion.stop().await {
            warn!("Failed to stop axes after drawing error: {}", e);
        }
        if let Err(e) = pen.up().await {
            warn!("Failed to raise pen after drawing error: {}", e);
        }
    }
}
