//! Packet framing
//!
//! [`Envelope`] slices a single complete packet into opcode and payload.
//! [`FrameDecoder`] cuts a received byte stream into complete packets.

use bytes::{Bytes, BytesMut};

use super::cursor::ByteCursor;
use super::dispatch::{DispatchTable, PacketLength};
use super::error::{PacketError, PacketResult};

/// Largest total size a dynamic packet can declare
pub const MAX_PACKET_SIZE: usize = u16::MAX as usize;

/// Opcode and payload of one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub opcode: u8,
    pub payload: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Split a complete packet using the table's length rules.
    ///
    /// Bytes past the resolved length are ignored.
    pub fn parse(frame: &'a [u8], table: &DispatchTable) -> PacketResult<Self> {
        let mut cursor = ByteCursor::new(frame);
        let opcode = cursor.read_u8()?;
        let length = table
            .length_of(opcode)
            .ok_or(PacketError::UnknownOpcode(opcode))?;

        let total = match length {
            PacketLength::Fixed(size) => size,
            PacketLength::Dynamic => usize::from(cursor.read_u16()?),
        };

        let header = length.header_len();
        if total < header {
            return Err(PacketError::InvalidLength {
                opcode,
                length: total,
            });
        }

        let payload = cursor.read_bytes(total - header)?;
        Ok(Self { opcode, payload })
    }
}

/// Incremental framer over a receive buffer
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    max_packet_size: usize,
}

impl FrameDecoder {
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            max_packet_size: max_packet_size.min(MAX_PACKET_SIZE),
        }
    }

    /// Attempt to split one complete packet off the front of `buf`.
    /// Returns Ok(None) if more data is needed.
    ///
    /// An error means the stream can no longer be framed.
    pub fn decode(&self, buf: &mut BytesMut, table: &DispatchTable) -> PacketResult<Option<Bytes>> {
        let Some(&opcode) = buf.first() else {
            return Ok(None);
        };

        let length = table
            .length_of(opcode)
            .ok_or(PacketError::UnknownOpcode(opcode))?;

        let total = match length {
            PacketLength::Fixed(size) => size,
            PacketLength::Dynamic => {
                if buf.len() < length.header_len() {
                    return Ok(None);
                }
                usize::from(u16::from_be_bytes([buf[1], buf[2]]))
            }
        };

        if total < length.header_len() || total > self.max_packet_size {
            return Err(PacketError::InvalidLength {
                opcode,
                length: total,
            });
        }

        if buf.len() < total {
            return Ok(None);
        }

        Ok(Some(buf.split_to(total).freeze()))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(MAX_PACKET_SIZE)
    }
}
