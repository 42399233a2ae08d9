//! Party sub-protocol decoding
//!
//! Carried by the extended command packet under sub-command `0x0006`.
//! The whole packet is decoded before the world sees any of it.

use super::cursor::{ByteCursor, TextEncoding};
use super::error::{PacketError, PacketResult};
use super::OP_EXTENDED;
use crate::world::Serial;

pub const PARTY_ADD: u8 = 0x01;
pub const PARTY_REMOVE: u8 = 0x02;
pub const PARTY_PRIVATE_MESSAGE: u8 = 0x03;
pub const PARTY_PUBLIC_MESSAGE: u8 = 0x04;
pub const PARTY_INVITE: u8 = 0x07;

/// Full member list sent by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterUpdate {
    /// Member being removed (remove variant only)
    pub excluded: Option<Serial>,
    /// Members in server order; the first one leads
    pub serials: Vec<Serial>,
}

impl RosterUpdate {
    pub fn is_removal(&self) -> bool {
        self.excluded.is_some()
    }
}

/// A decoded party packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyPacket {
    /// Add/remove with a member count of one or less
    Disband { removal: bool },
    Roster(RosterUpdate),
    Message {
        sender: Serial,
        text: String,
        private: bool,
    },
    Invite { inviter: Serial },
}

/// Decode a party packet starting at its sub-code byte
pub fn decode(cursor: &mut ByteCursor<'_>) -> PacketResult<PartyPacket> {
    let code = cursor.read_u8()?;

    match code {
        PARTY_ADD | PARTY_REMOVE => {
            let removal = code == PARTY_REMOVE;
            let count = cursor.read_u8()?;

            if count <= 1 {
                return Ok(PartyPacket::Disband { removal });
            }

            let excluded = if removal {
                Some(Serial(cursor.read_u32()?))
            } else {
                None
            };

            let serials = (0..count)
                .map(|_| cursor.read_u32().map(Serial))
                .collect::<PacketResult<Vec<_>>>()?;

            Ok(PartyPacket::Roster(RosterUpdate { excluded, serials }))
        }
        PARTY_PRIVATE_MESSAGE | PARTY_PUBLIC_MESSAGE => {
            let sender = Serial(cursor.read_u32()?);
            let text = cursor.read_terminated_string(TextEncoding::UnicodeBe)?;

            Ok(PartyPacket::Message {
                sender,
                text,
                private: code == PARTY_PRIVATE_MESSAGE,
            })
        }
        PARTY_INVITE => Ok(PartyPacket::Invite {
            inviter: Serial(cursor.read_u32()?),
        }),
        other => Err(PacketError::UnknownSubCode {
            opcode: OP_EXTENDED,
            code: u16::from(other),
        }),
    }
}
