pub mod config;

use std::fmt;

use futures::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
        watch, Mutex,
    },
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

use crate::protocol::{command::Command, serialize_command};
use config::BridgeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ShuttingDown,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::ShuttingDown => "shutting down",
        };
        f.write_str(name)
    }
}

enum SessionEnd {
    Shutdown,
    Lost(String),
}

pub struct NetworkBridge {
    outbound: mpsc::Sender<String>,
    state: watch::Receiver<ConnectionState>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkBridge {
    /// Non-empty lines from the robot are forwarded to `inbound`.
    pub fn spawn(config: BridgeConfig, inbound: mpsc::Sender<String>) -> Self {
        let (outbound, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(Self::connection_loop(
            config,
            outbound_rx,
            inbound,
            state_tx,
            shutdown_rx,
        ));

        Self {
            outbound,
            state,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Queues one line for the robot. Returns `false`, without blocking, when
    /// the line was dropped because the link is down or the buffer is full.
    pub fn send(&self, message: impl Into<String>) -> bool {
        let message = message.into();

        let state = *self.state.borrow();
        if state != ConnectionState::Connected {
            debug!("Link {}, dropping {:?}", state, message);
            return false;
        }

        match self.outbound.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!("Outbound buffer full, dropping {:?}", message);
                false
            }
            Err(TrySendError::Closed(message)) => {
                debug!("Bridge stopped, dropping {:?}", message);
                false
            }
        }
    }

    pub fn send_command(&self, command: &Command) -> bool {
        self.send(serialize_command(command))
    }

    pub fn restart_peripheral(&self) -> bool {
        self.send_command(&Command::RestartPeripheral)
    }

    pub fn restart_bridge(&self) -> bool {
        self.send_command(&Command::RestartBridge)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn communications_online(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Bridge task ended abnormally: {}", e);
            }
        }
    }

    async fn connection_loop(
        config: BridgeConfig,
        mut outbound_rx: mpsc::Receiver<String>,
        inbound: mpsc::Sender<String>,
        state_tx: watch::Sender<ConnectionState>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        loop {
            let Some(stream) = Self::connect(&config, &state_tx, &mut shutdown_rx).await else {
                break;
            };

            // Anything queued during the previous session is stale.
            while outbound_rx.try_recv().is_ok() {}

            state_tx.send_replace(ConnectionState::Connected);
            info!("Connected to {}", config.address);

            let framed = Framed::new(stream, LinesCodec::new_with_max_length(config.max_line_length));
            match Self::session(framed, &mut outbound_rx, &inbound, &mut shutdown_rx).await {
                SessionEnd::Shutdown => break,
                SessionEnd::Lost(reason) => {
                    state_tx.send_replace(ConnectionState::Disconnected);
                    warn!("Link to {} lost ({}), reconnecting", config.address, reason);
                }
            }
        }

        state_tx.send_replace(ConnectionState::ShuttingDown);
        info!("Bridge shut down");
    }

    /// Retries until a stream is open; `None` means shutdown was requested.
    /// The state is `Connecting` during an attempt and `Disconnected` between
    /// attempts.
    async fn connect(
        config: &BridgeConfig,
        state_tx: &watch::Sender<ConnectionState>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Option<TcpStream> {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            state_tx.send_replace(ConnectionState::Connecting);
            let result = tokio::select! {
                _ = shutdown_rx.recv() => return None,
                result = timeout(config.connect_timeout(), TcpStream::connect(&config.address)) => result,
            };

            let reason = match result {
                Ok(Ok(stream)) => {
                    if attempt > 1 {
                        info!("Reconnected after {} attempts", attempt);
                    }
                    return Some(stream);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => "timed out".to_string(),
            };

            if attempt == 1 {
                warn!("Cannot reach {}: {}; retrying", config.address, reason);
            } else {
                debug!("Connection attempt {} to {} failed: {}", attempt, config.address, reason);
            }

            state_tx.send_replace(ConnectionState::Disconnected);
            tokio::select! {
                _ = shutdown_rx.recv() => return None,
                _ = sleep(config.reconnect_interval()) => {}
            }
        }
    }

    async fn session(
        mut framed: Framed<TcpStream, LinesCodec>,
        outbound_rx: &mut mpsc::Receiver<String>,
        inbound: &mpsc::Sender<String>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    let _ = SinkExt::<String>::close(&mut framed).await;
                    return SessionEnd::Shutdown;
                }
                message = outbound_rx.recv() => {
                    let Some(message) = message else {
                        return SessionEnd::Shutdown;
                    };
                    debug!("Sending {:?}", message);
                    if let Err(e) = framed.send(message).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                }
                line = framed.next() => match line {
                    Some(Ok(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if let Err(e) = inbound.try_send(line) {
                            debug!("Inbound line not delivered: {}", e);
                        }
                    }
                    Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    None => return SessionEnd::Lost("closed by peer".to_string()),
                },
            }
        }
    }
}
