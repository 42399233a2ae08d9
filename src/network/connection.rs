//! Connection handling
//!
//! Reads the server stream, frames it into packets and decodes each one.
//! Packets that fail to decode are dropped here; only a framing failure
//! ends the connection.

use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::{report_dropped, DispatchTable, FrameDecoder, PacketError, ServerPacket};

/// Connection errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream out of sync: {0}")]
    Protocol(#[from] PacketError),

    #[error("Connection closed mid-packet")]
    Closed,
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// State of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Stream open, receiving packets
    Connected,
    /// Connection is closing gracefully
    Closing,
    /// Connection has been closed
    Closed,
}

/// Connection statistics
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Packets decoded
    pub packets_received: u64,
    /// Packets dropped at the packet boundary
    pub packets_dropped: u64,
    /// Bytes received
    pub bytes_received: u64,
}

/// A receive-side connection to the game server
pub struct Connection<S> {
    stream: S,
    table: Arc<DispatchTable>,
    framer: FrameDecoder,
    read_buf: BytesMut,
    state: ConnectionState,
    stats: ConnectionStats,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, table: Arc<DispatchTable>, framer: FrameDecoder) -> Self {
        Self {
            stream,
            table,
            framer,
            read_buf: BytesMut::with_capacity(4096),
            state: ConnectionState::Connected,
            stats: ConnectionStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Receive the next complete packet (None on clean close)
    pub async fn recv_frame(&mut self) -> ConnectionResult<Option<Bytes>> {
        loop {
            if let Some(frame) = self.framer.decode(&mut self.read_buf, &self.table)? {
                return Ok(Some(frame));
            }

            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await?;

            if n == 0 {
                self.state = ConnectionState::Closed;
                if self.read_buf.is_empty() {
                    return Ok(None); // Clean close
                } else {
                    return Err(ConnectionError::Closed);
                }
            }

            self.read_buf.extend_from_slice(&buf[..n]);
            self.stats.bytes_received += n as u64;
        }
    }

    /// Receive the next packet that decodes, skipping ones that don't
    pub async fn recv(&mut self) -> ConnectionResult<Option<ServerPacket>> {
        loop {
            let Some(frame) = self.recv_frame().await? else {
                return Ok(None);
            };

            match self.table.decode(&frame) {
                Ok(packet) => {
                    self.stats.packets_received += 1;
                    return Ok(Some(packet));
                }
                Err(e) => {
                    report_dropped(&frame, &e);
                    self.stats.packets_dropped += 1;
                }
            }
        }
    }

    /// Close the connection gracefully
    pub async fn close(&mut self) -> ConnectionResult<()> {
        self.state = ConnectionState::Closing;
        self.stream.shutdown().await?;
        self.state = ConnectionState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::*;
    use crate::protocol::{ClientVersion, PartyPacket};
    use crate::world::Serial;
    use tokio_test::io::Builder;

    fn table() -> Arc<DispatchTable> {
        Arc::new(DispatchTable::new(ClientVersion::default()))
    }

    #[tokio::test]
    async fn test_recv_reassembles_split_packets() {
        let invite = party_invite(Serial(7));
        let (head, tail) = invite.split_at(4);
        let mock = Builder::new().read(head).read(tail).build();

        let mut conn = Connection::new(mock, table(), FrameDecoder::default());
        let packet = conn.recv().await.unwrap().unwrap();
        assert_eq!(
            packet,
            ServerPacket::Party(PartyPacket::Invite { inviter: Serial(7) })
        );
        assert!(conn.recv().await.unwrap().is_none());
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_recv_skips_undecodable_packets() {
        let mut bytes = vec![0x4f, 0x10]; // global light: framed, not decoded
        bytes.extend(delete_object(Serial(3)));
        let mock = Builder::new().read(&bytes).build();

        let mut conn = Connection::new(mock, table(), FrameDecoder::default());
        assert_eq!(
            conn.recv().await.unwrap(),
            Some(ServerPacket::DeleteObject { serial: Serial(3) })
        );
        assert_eq!(conn.stats().packets_dropped, 1);
        assert_eq!(conn.stats().packets_received, 1);
    }

    #[tokio::test]
    async fn test_eof_mid_packet() {
        let invite = party_invite(Serial(7));
        let mock = Builder::new().read(&invite[..5]).build();

        let mut conn = Connection::new(mock, table(), FrameDecoder::default());
        assert!(matches!(conn.recv().await, Err(ConnectionError::Closed)));
    }

    #[tokio::test]
    async fn test_unknown_opcode_is_fatal() {
        let mock = Builder::new().read(&[0x03, 0x00]).build();

        let mut conn = Connection::new(mock, table(), FrameDecoder::default());
        assert!(matches!(
            conn.recv().await,
            Err(ConnectionError::Protocol(PacketError::UnknownOpcode(0x03)))
        ));
    }
}
