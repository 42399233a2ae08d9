//! Packet decoding errors
//!
//! Every failure is absorbed at the packet boundary: the offending packet is
//! dropped and the stream carries on with the next one.

use thiserror::Error;

/// Packet decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Truncated packet: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        needed: usize,
        available: usize,
        offset: usize,
    },

    #[error("Unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    #[error("Unknown sub-code {code:#06x} for opcode {opcode:#04x}")]
    UnknownSubCode { opcode: u8, code: u16 },

    #[error("Invalid length {length} for opcode {opcode:#04x}")]
    InvalidLength { opcode: u8, length: usize },
}

pub type PacketResult<T> = Result<T, PacketError>;

impl PacketError {
    /// Log a dropped packet at the severity matching its failure kind
    pub fn report(&self, opcode: u8) {
        match self {
            PacketError::Truncated { .. } | PacketError::InvalidLength { .. } => {
                tracing::warn!("Dropping packet {:#04x}: {}", opcode, self);
            }
            PacketError::UnknownSubCode { .. } | PacketError::UnknownOpcode(_) => {
                tracing::debug!("Ignoring packet {:#04x}: {}", opcode, self);
            }
        }
    }
}
