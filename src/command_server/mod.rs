pub mod config;

use anyhow::Result;
use futures::StreamExt;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::broadcast,
};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, info, warn};

use crate::{dispatcher::CommandQueue, protocol::parse_command};
use config::CommandServerConfig;

pub struct CommandServer {
    config: CommandServerConfig,
    queue: CommandQueue,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl CommandServer {
    pub fn new(config: CommandServerConfig, queue: CommandQueue) -> Self {
        Self {
            config,
            queue,
            local_addr: None,
            shutdown_tx: None,
        }
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub async fn start(&mut self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);
        info!("Command server listening on: {}", local_addr);

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let queue = self.queue.clone();
        let max_connections = self.config.max_connections;
        let max_line_length = self.config.max_line_length;

        tokio::spawn(async move {
            let active_connections = Arc::new(AtomicUsize::new(0));

            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, addr)) => {
                                let current_connections = active_connections.load(Ordering::Relaxed);
                                if current_connections >= max_connections {
                                    warn!("Maximum connections reached ({}), rejecting {}", current_connections, addr);
                                    continue;
                                }

                                let new_count = active_connections.fetch_add(1, Ordering::Relaxed) + 1;
                                info!("Operator {} connected. Active connections: {}", addr, new_count);

                                let queue = queue.clone();
                                let mut shutdown_rx = shutdown_rx.resubscribe();
                                let active_connections = active_connections.clone();

                                tokio::spawn(async move {
                                    let result = Self::handle_client(stream, queue, max_line_length, &mut shutdown_rx).await;
                                    if let Err(e) = result {
                                        error!("Client handler error: {}", e);
                                    }

                                    let remaining = active_connections.fetch_sub(1, Ordering::Relaxed) - 1;
                                    info!("Operator {} disconnected. Active connections: {}", addr, remaining);
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Command server shutting down");
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(());
        }

        info!("Command server shutdown complete");
        Ok(())
    }

    async fn handle_client(
        stream: TcpStream,
        queue: CommandQueue,
        max_line_length: usize,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<()> {
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(max_line_length));

        loop {
            tokio::select! {
                line_result = framed.next() => {
                    match line_result {
                        Some(Ok(line)) => Self::process_line(&line, &queue),
                        Some(Err(e)) => {
                            error!("Error reading from operator: {}", e);
                            break;
                        }
                        None => {
                            debug!("Operator closed the connection");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("Shutdown signal received, closing operator connection");
                    break;
                }
            }
        }

        Ok(())
    }

    fn process_line(line: &str, queue: &CommandQueue) {
        match parse_command(line) {
            Ok(Some(command)) => {
                debug!("Received command: {}", command);
                queue.submit(command);
            }
            Ok(None) => {
                if !line.trim().is_empty() {
                    debug!("Ignoring unrecognized line: {:?}", line);
                }
            }
            Err(e) => warn!("Ignoring malformed command {:?}: {}", line, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::command::Command;
    use futures::SinkExt;
    use std::time::Duration;
    use tokio::time::timeout;

    fn local_config() -> CommandServerConfig {
        CommandServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..Default::default()
        }
    }

    async fn connect(server: &CommandServer) -> Framed<TcpStream, LinesCodec> {
        let addr = server.local_addr().unwrap();
        let stream = TcpStream::connect(addr).await.unwrap();
        Framed::new(stream, LinesCodec::new())
    }

    #[tokio::test]
    async fn test_lines_become_queued_commands() {
        let (queue, mut rx) = CommandQueue::new(8);
        let mut server = CommandServer::new(local_config(), queue);
        server.start().await.unwrap();

        let mut client = connect(&server).await;
        for line in ["UP", "NOISE", "GOTO:oops", "GOTO:1.5|2.25", "DOWN"] {
            client.send(line).await.unwrap();
        }

        let wait = Duration::from_secs(5);
        assert_eq!(timeout(wait, rx.recv()).await.unwrap(), Some(Command::PenUp));
        assert_eq!(
            timeout(wait, rx.recv()).await.unwrap(),
            Some(Command::move_to(1.5, 2.25))
        );
        assert_eq!(timeout(wait, rx.recv()).await.unwrap(), Some(Command::PenDown));

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_connections() {
        let (queue, mut rx) = CommandQueue::new(8);
        let mut server = CommandServer::new(local_config(), queue);
        server.start().await.unwrap();
        let mut client = connect(&server).await;

        // Make sure the connection is being served before shutting down.
        client.send("CLEAR").await.unwrap();
        let wait = Duration::from_secs(5);
        assert_eq!(timeout(wait, rx.recv()).await.unwrap(), Some(Command::Clear));

        server.shutdown().await.unwrap();

        let next = timeout(wait, client.next()).await.unwrap();
        assert!(next.is_none() || next.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_connection_limit_rejects_extra_clients() {
        let (queue, mut rx) = CommandQueue::new(8);
        let config = CommandServerConfig {
            max_connections: 1,
            ..local_config()
        };
        let mut server = CommandServer::new(config, queue);
        server.start().await.unwrap();

        let mut first = connect(&server).await;
        first.send("UP").await.unwrap();
        let wait = Duration::from_secs(5);
        assert_eq!(timeout(wait, rx.recv()).await.unwrap(), Some(Command::PenUp));

        let mut second = connect(&server).await;
        let next = timeout(wait, second.next()).await.unwrap();
        assert!(next.is_none() || next.unwrap().is_err());

        server.shutdown().await.unwrap();
    }
}
