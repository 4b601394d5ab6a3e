//! Operator console: type commands on stdin, they go to the robot over the
//! bridge.
//!
//! ```text
//! up | down | clear | goto <x> <y> | path | status
//! restart | restart-bridge | quit
//! ```

use anyhow::Result;
use futures::StreamExt;
use plotarem::{
    bridge::NetworkBridge,
    config, logging,
    geometry::Position,
    protocol::command::Command,
};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_or_default()?;
    logging::init(&config.logging)?;

    let (inbound_tx, mut inbound_rx) = mpsc::channel(config.bridge.inbound_capacity);
    let bridge = NetworkBridge::spawn(config.bridge.clone(), inbound_tx);

    tokio::spawn(async move {
        while let Some(line) = inbound_rx.recv().await {
            info!("robot: {}", line);
        }
    });

    // Points sent since the last clear.
    let mut points: Vec<Position> = Vec::new();
    let mut stdin = FramedRead::new(tokio::io::stdin(), LinesCodec::new());

    while let Some(line) = stdin.next().await {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();

        let command = match words.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            ["status"] => {
                info!(
                    "Link {}, communications {}",
                    bridge.state(),
                    if bridge.communications_online() { "online" } else { "offline" }
                );
                continue;
            }
            ["path"] => {
                info!("{} points: {:?}", points.len(), points);
                continue;
            }
            ["up"] => Command::PenUp,
            ["down"] => Command::PenDown,
            ["clear"] => {
                points.clear();
                Command::Clear
            }
            ["restart"] => Command::RestartPeripheral,
            ["restart-bridge"] => Command::RestartBridge,
            ["goto", x, y] => match (x.parse(), y.parse()) {
                (Ok(x), Ok(y)) => {
                    let target = Position::new(x, y);
                    points.push(target);
                    Command::MoveTo(target)
                }
                _ => {
                    warn!("goto needs two numbers");
                    continue;
                }
            },
            _ => {
                warn!("Unknown command: {}", line);
                continue;
            }
        };

        if !bridge.send_command(&command) {
            warn!("Robot offline, {} not sent", command);
        }
    }

    bridge.shutdown().await;
    Ok(())
}
