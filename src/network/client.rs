//! Game client connection
//!
//! Connects to a game server and runs the receive task. The task frames and
//! decodes packets, then hands them to the world-apply stage over a channel;
//! it never touches the world itself.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};

use super::connection::{Connection, ConnectionError};
use super::NetworkConfig;
use crate::protocol::{DispatchTable, FrameDecoder, ServerPacket};

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Not connected")]
    NotConnected,

    #[error("Connection timeout")]
    Timeout,
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Events emitted by the client
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Successfully connected to server
    Connected { server_addr: SocketAddr },
    /// A fully decoded packet, ready to apply
    Packet(ServerPacket),
    /// Disconnected from server
    Disconnected { reason: String },
    /// Connection error
    Error { message: String },
}

/// Client state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct Client {
    /// Client configuration
    config: NetworkConfig,
    /// Routes for the configured client version
    table: Arc<DispatchTable>,
    /// Current state
    state: Arc<RwLock<ClientState>>,
    /// Event sender
    event_tx: mpsc::Sender<ClientEvent>,
    /// Event receiver (for consumers)
    event_rx: Option<mpsc::Receiver<ClientEvent>>,
    /// Shutdown signal
    shutdown_tx: Arc<RwLock<Option<mpsc::Sender<()>>>>,
}

impl Client {
    pub fn new(config: NetworkConfig, table: DispatchTable) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_queue);

        Self {
            config,
            table: Arc::new(table),
            state: Arc::new(RwLock::new(ClientState::Disconnected)),
            event_tx,
            event_rx: Some(event_rx),
            shutdown_tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Take the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<ClientEvent>> {
        self.event_rx.take()
    }

    /// Connect to a server by address
    pub async fn connect(&self, server_addr: SocketAddr) -> ClientResult<()> {
        {
            let mut state = self.state.write().await;
            if *state != ClientState::Disconnected {
                return Err(ClientError::AlreadyConnected);
            }
            *state = ClientState::Connecting;
        }

        tracing::info!("Connecting to {}", server_addr);

        let stream = match self.open(server_addr).await {
            Ok(stream) => stream,
            Err(e) => {
                *self.state.write().await = ClientState::Disconnected;
                return Err(e);
            }
        };

        self.attach(stream, server_addr).await;
        Ok(())
    }

    /// Connect to a `host[:port]` server, using `default_port` when none is given
    pub async fn connect_hostname(&self, server: &str, default_port: u16) -> ClientResult<()> {
        let addr = super::resolve_server(server, default_port).await?;
        self.connect(addr).await
    }

    async fn open(&self, server_addr: SocketAddr) -> ClientResult<TcpStream> {
        let stream = tokio::time::timeout(
            Duration::from_millis(self.config.connect_timeout_ms),
            TcpStream::connect(server_addr),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;

        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Start the receive task over an established stream
    pub(crate) async fn attach<S>(&self, stream: S, server_addr: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let framer = FrameDecoder::new(self.config.max_packet_size);
        let conn = Connection::new(stream, self.table.clone(), framer);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.write().await = Some(shutdown_tx);
        *self.state.write().await = ClientState::Connected;

        let _ = self
            .event_tx
            .send(ClientEvent::Connected { server_addr })
            .await;

        tokio::spawn(receive_loop(
            conn,
            self.event_tx.clone(),
            self.state.clone(),
            shutdown_rx,
        ));
    }

    /// Disconnect from the server
    pub async fn disconnect(&self) -> ClientResult<()> {
        if *self.state.read().await == ClientState::Disconnected {
            return Err(ClientError::NotConnected);
        }

        if let Some(tx) = &*self.shutdown_tx.read().await {
            let _ = tx.send(()).await;
        }

        Ok(())
    }

    /// Get the current state
    pub async fn state(&self) -> ClientState {
        *self.state.read().await
    }

    /// Check if connected
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ClientState::Connected
    }
}

async fn receive_loop<S>(
    mut conn: Connection<S>,
    event_tx: mpsc::Sender<ClientEvent>,
    state: Arc<RwLock<ClientState>>,
    mut shutdown_rx: mpsc::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let disconnect_reason = loop {
        tokio::select! {
            result = conn.recv() => {
                match result {
                    Ok(Some(packet)) => {
                        if event_tx.send(ClientEvent::Packet(packet)).await.is_err() {
                            break "Event receiver dropped".to_string();
                        }
                    }
                    Ok(None) => {
                        break "Connection closed".to_string();
                    }
                    Err(e) => {
                        let _ = event_tx.send(ClientEvent::Error {
                            message: e.to_string(),
                        }).await;
                        break format!("Error: {}", e);
                    }
                }
            }

            _ = shutdown_rx.recv() => {
                break "Client shutdown requested".to_string();
            }
        }
    };

    let stats = conn.stats().clone();
    tracing::info!(
        "Receive task finished: {} packets, {} dropped, {} bytes",
        stats.packets_received,
        stats.packets_dropped,
        stats.bytes_received
    );

    let _ = conn.close().await;
    *state.write().await = ClientState::Disconnected;

    let _ = event_tx
        .send(ClientEvent::Disconnected {
            reason: disconnect_reason,
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::*;
    use crate::protocol::ClientVersion;
    use crate::world::Serial;
    use tokio_test::io::Builder;

    fn client() -> Client {
        Client::new(
            NetworkConfig::default(),
            DispatchTable::new(ClientVersion::default()),
        )
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = client();
        assert!(!client.is_connected().await);
        assert!(matches!(
            client.disconnect().await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_receive_task_forwards_packets() {
        let mut client = client();
        let mut events = client.take_event_receiver().unwrap();

        let mut bytes = login_confirm(Serial(1));
        bytes.extend(party_add(&[Serial(1), Serial(2)]));
        let mock = Builder::new().read(&bytes).build();
        let addr: SocketAddr = "127.0.0.1:2593".parse().unwrap();

        client.attach(mock, addr).await;

        assert!(matches!(
            events.recv().await,
            Some(ClientEvent::Connected { .. })
        ));
        assert!(matches!(
            events.recv().await,
            Some(ClientEvent::Packet(ServerPacket::LoginConfirm { .. }))
        ));
        assert!(matches!(
            events.recv().await,
            Some(ClientEvent::Packet(ServerPacket::Party(_)))
        ));
        assert!(matches!(
            events.recv().await,
            Some(ClientEvent::Disconnected { .. })
        ));
        assert_eq!(client.state().await, ClientState::Disconnected);
    }

    #[tokio::test]
    async fn test_failed_connect_can_be_retried() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client();
        assert!(matches!(client.connect(addr).await, Err(ClientError::Io(_))));
        assert_eq!(client.state().await, ClientState::Disconnected);

        // A second attempt fails on its own merits, not as AlreadyConnected.
        assert!(matches!(client.connect(addr).await, Err(ClientError::Io(_))));
    }

    #[tokio::test]
    async fn test_connect_hostname_with_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut client = client();
        let mut events = client.take_event_receiver().unwrap();
        client
            .connect_hostname(&format!("127.0.0.1:{}", port), 1)
            .await
            .unwrap();
        let (_server, _) = listener.accept().await.unwrap();

        match events.recv().await {
            Some(ClientEvent::Connected { server_addr }) => assert_eq!(server_addr.port(), port),
            other => panic!("expected Connected, got {:?}", other),
        }
        assert!(client.is_connected().await);
        assert!(matches!(
            client.connect_hostname("127.0.0.1", port).await,
            Err(ClientError::AlreadyConnected)
        ));
        client.disconnect().await.unwrap();
    }
}
