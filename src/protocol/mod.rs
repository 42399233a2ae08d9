//! Protocol module - Decodes the server-to-client wire protocol
//!
//! Packets are framed as:
//! - 1 byte opcode
//! - for dynamic packets, 2 bytes total length (big-endian, header included)
//! - payload
//!
//! Fixed-size packets take their length from the dispatch table.

mod cursor;
mod dispatch;
mod envelope;
mod error;
mod packets;
pub mod party;
mod version;

pub use cursor::*;
pub use dispatch::*;
pub use envelope::*;
pub use error::*;
pub use packets::*;
pub use party::{PartyPacket, RosterUpdate};
pub use version::*;

/// Default game server port
pub const DEFAULT_PORT: u16 = 2593;

pub const OP_MOBILE_STATUS: u8 = 0x11;
pub const OP_LOGIN_CONFIRM: u8 = 0x1B;
pub const OP_DELETE_OBJECT: u8 = 0x1D;
pub const OP_PING: u8 = 0x73;
pub const OP_MOBILE_NAME: u8 = 0x98;
pub const OP_FEATURES: u8 = 0xB9;
pub const OP_EXTENDED: u8 = 0xBF;
pub const OP_LOGOUT_STATUS: u8 = 0xD1;

/// Opcodes this client frames but does not decode
pub const UNHANDLED_LENGTHS: &[(u8, PacketLength)] = &[
    (0x1A, PacketLength::Dynamic),  // world item
    (0x1C, PacketLength::Dynamic),  // ascii speech
    (0x20, PacketLength::Fixed(19)), // draw player
    (0x22, PacketLength::Fixed(3)),  // move ack
    (0x2E, PacketLength::Fixed(15)), // equip item
    (0x4E, PacketLength::Fixed(6)),  // personal light
    (0x4F, PacketLength::Fixed(2)),  // global light
    (0x55, PacketLength::Fixed(1)),  // login complete
    (0x65, PacketLength::Fixed(4)),  // weather
    (0x6D, PacketLength::Fixed(3)),  // music
    (0x77, PacketLength::Fixed(17)), // update mobile
    (0x78, PacketLength::Dynamic),  // mobile incoming
    (0xAE, PacketLength::Dynamic),  // unicode speech
    (0xBC, PacketLength::Fixed(3)),  // season
];

/// Log a packet that was dropped at the packet boundary
pub fn report_dropped(frame: &[u8], err: &PacketError) {
    err.report(frame.first().copied().unwrap_or_default());
}
