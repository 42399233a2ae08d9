//! Typed server packets and their payload decoders
//!
//! Each decoder receives a cursor positioned just past the envelope header
//! (opcode, plus the length field for dynamic packets).

use super::cursor::{ByteCursor, TextEncoding};
use super::error::{PacketError, PacketResult};
use super::party::{self, PartyPacket};
use super::OP_EXTENDED;
use crate::world::Serial;

/// Width of the fixed name field in status and name packets
pub const NAME_FIELD_LEN: usize = 30;

/// Extended command sub-command carrying the party protocol
pub const EXT_PARTY: u16 = 0x0006;

/// A fully decoded packet from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPacket {
    MobileStatus {
        serial: Serial,
        name: String,
        hits: u16,
        hits_max: u16,
    },
    LoginConfirm {
        player: Serial,
    },
    DeleteObject {
        serial: Serial,
    },
    Ping {
        sequence: u8,
    },
    MobileName {
        serial: Serial,
        name: String,
    },
    Features {
        flags: u32,
    },
    Party(PartyPacket),
    LogoutStatus,
}

impl ServerPacket {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ServerPacket::MobileStatus { .. } => "mobile-status",
            ServerPacket::LoginConfirm { .. } => "login-confirm",
            ServerPacket::DeleteObject { .. } => "delete-object",
            ServerPacket::Ping { .. } => "ping",
            ServerPacket::MobileName { .. } => "mobile-name",
            ServerPacket::Features { .. } => "features",
            ServerPacket::Party(_) => "party",
            ServerPacket::LogoutStatus => "logout-status",
        }
    }
}

/// `0x11`
pub fn decode_mobile_status(cursor: &mut ByteCursor<'_>) -> PacketResult<ServerPacket> {
    let serial = Serial(cursor.read_u32()?);
    let name = cursor.read_fixed_string(NAME_FIELD_LEN, TextEncoding::Ascii)?;
    let hits = cursor.read_u16()?;
    let hits_max = cursor.read_u16()?;

    // Rename flag, status type and the stat block follow; not tracked here.
    Ok(ServerPacket::MobileStatus {
        serial,
        name,
        hits,
        hits_max,
    })
}

/// `0x1B`
pub fn decode_login_confirm(cursor: &mut ByteCursor<'_>) -> PacketResult<ServerPacket> {
    let player = Serial(cursor.read_u32()?);
    Ok(ServerPacket::LoginConfirm { player })
}

/// `0x1D`
pub fn decode_delete_object(cursor: &mut ByteCursor<'_>) -> PacketResult<ServerPacket> {
    let serial = Serial(cursor.read_u32()?);
    Ok(ServerPacket::DeleteObject { serial })
}

/// `0x73`
pub fn decode_ping(cursor: &mut ByteCursor<'_>) -> PacketResult<ServerPacket> {
    let sequence = cursor.read_u8()?;
    Ok(ServerPacket::Ping { sequence })
}

/// `0x98`
pub fn decode_mobile_name(cursor: &mut ByteCursor<'_>) -> PacketResult<ServerPacket> {
    let serial = Serial(cursor.read_u32()?);
    let name = cursor.read_fixed_string(NAME_FIELD_LEN, TextEncoding::Ascii)?;
    Ok(ServerPacket::MobileName { serial, name })
}

/// `0xB9` before 6.0.14.2
pub fn decode_features_legacy(cursor: &mut ByteCursor<'_>) -> PacketResult<ServerPacket> {
    let flags = u32::from(cursor.read_u16()?);
    Ok(ServerPacket::Features { flags })
}

/// `0xB9` from 6.0.14.2
pub fn decode_features(cursor: &mut ByteCursor<'_>) -> PacketResult<ServerPacket> {
    let flags = cursor.read_u32()?;
    Ok(ServerPacket::Features { flags })
}

/// `0xBF`
pub fn decode_extended(cursor: &mut ByteCursor<'_>) -> PacketResult<ServerPacket> {
    let command = cursor.read_u16()?;

    match command {
        EXT_PARTY => Ok(ServerPacket::Party(party::decode(cursor)?)),
        other => Err(PacketError::UnknownSubCode {
            opcode: OP_EXTENDED,
            code: other,
        }),
    }
}

/// `0xD1`
pub fn decode_logout_status(_cursor: &mut ByteCursor<'_>) -> PacketResult<ServerPacket> {
    Ok(ServerPacket::LogoutStatus)
}
