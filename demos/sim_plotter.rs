//! Robot side on simulated hardware: homes, optionally draws a DXF file given
//! on the command line, then serves operator commands until Ctrl-C.

use anyhow::Result;
use plotarem::{
    actuator::sim::SimRig,
    command_server::CommandServer,
    config,
    dispatcher::{CommandQueue, Plotter},
    drawing::DrawingSequencer,
    logging,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_or_default()?;
    logging::init(&config.logging)?;

    let rig = SimRig::with_axes(config.x_axis.clone(), config.y_axis.clone());
    let mut plotter = Plotter::new(
        rig.coordinator(config.motion.clone())?,
        rig.pen(),
        DrawingSequencer::new(config.drawing.clone()),
        &config.dispatcher,
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        shutdown.cancel();
    });

    plotter.setup(&cancel).await?;

    if let Some(file) = std::env::args().nth(1) {
        match plotter.draw_dxf_file(&file, &cancel).await {
            Ok(()) => info!("Finished drawing {}", file),
            Err(e) => error!("Drawing {} failed: {}", file, e),
        }
    }

    let (queue, commands) = CommandQueue::new(config.dispatcher.queue_capacity);
    let mut server = CommandServer::new(config.server.clone(), queue);
    server.start().await?;

    plotter.run(commands, cancel).await?;
    server.shutdown().await?;

    let position = plotter.motion().position().await?;
    info!("Stopped at {}", position);
    Ok(())
}
