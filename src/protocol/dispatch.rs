//! Opcode dispatch table
//!
//! Maps each opcode to its length rule and payload decoder. The same opcode
//! may be registered several times with different minimum client versions;
//! the newest variant the configured client supports wins.

use std::collections::HashMap;

use super::cursor::ByteCursor;
use super::envelope::Envelope;
use super::error::{PacketError, PacketResult};
use super::packets::{self, ServerPacket};
use super::version::ClientVersion;
use super::*;

/// Payload decoder for one opcode
pub type DecodeFn = fn(&mut ByteCursor<'_>) -> PacketResult<ServerPacket>;

/// How the total length of a packet is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketLength {
    /// Fixed total size, opcode byte included
    Fixed(usize),
    /// Big-endian `u16` total size right after the opcode
    Dynamic,
}

impl PacketLength {
    /// Bytes in front of the payload
    pub fn header_len(self) -> usize {
        match self {
            PacketLength::Fixed(_) => 1,
            PacketLength::Dynamic => 3,
        }
    }
}

/// Length rule and optional decoder for one opcode
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub length: PacketLength,
    decoder: Option<DecodeFn>,
}

#[derive(Debug)]
pub struct DispatchTable {
    version: ClientVersion,
    routes: HashMap<u8, (ClientVersion, Route)>,
}

impl DispatchTable {
    /// Build the table of built-in routes for a client version
    pub fn new(version: ClientVersion) -> Self {
        let mut table = Self::empty(version);

        table.register(OP_MOBILE_STATUS, PacketLength::Dynamic, packets::decode_mobile_status);
        table.register(OP_LOGIN_CONFIRM, PacketLength::Fixed(37), packets::decode_login_confirm);
        table.register(OP_DELETE_OBJECT, PacketLength::Fixed(5), packets::decode_delete_object);
        table.register(OP_PING, PacketLength::Fixed(2), packets::decode_ping);
        table.register(OP_MOBILE_NAME, PacketLength::Dynamic, packets::decode_mobile_name);
        table.register(OP_FEATURES, PacketLength::Fixed(3), packets::decode_features_legacy);
        table.register_since(
            OP_FEATURES,
            ClientVersion::V6_0_14_2,
            PacketLength::Fixed(5),
            packets::decode_features,
        );
        table.register(OP_EXTENDED, PacketLength::Dynamic, packets::decode_extended);
        table.register(OP_LOGOUT_STATUS, PacketLength::Fixed(2), packets::decode_logout_status);

        // Framed so the stream stays in sync, but not decoded.
        for &(opcode, length) in UNHANDLED_LENGTHS {
            table.register_length(opcode, length);
        }

        table
    }

    /// A table with no routes at all
    pub fn empty(version: ClientVersion) -> Self {
        Self {
            version,
            routes: HashMap::new(),
        }
    }

    pub fn version(&self) -> ClientVersion {
        self.version
    }

    /// Register a decoder for every client version
    pub fn register(&mut self, opcode: u8, length: PacketLength, decoder: DecodeFn) {
        self.insert(opcode, ClientVersion::MIN, Route { length, decoder: Some(decoder) });
    }

    /// Register a decoder that replaces older layouts from `since` onwards
    pub fn register_since(
        &mut self,
        opcode: u8,
        since: ClientVersion,
        length: PacketLength,
        decoder: DecodeFn,
    ) {
        self.insert(opcode, since, Route { length, decoder: Some(decoder) });
    }

    /// Register a length only; such packets are framed and dropped
    pub fn register_length(&mut self, opcode: u8, length: PacketLength) {
        self.insert(opcode, ClientVersion::MIN, Route { length, decoder: None });
    }

    pub fn route(&self, opcode: u8) -> Option<&Route> {
        self.routes.get(&opcode).map(|(_, route)| route)
    }

    pub fn length_of(&self, opcode: u8) -> Option<PacketLength> {
        self.route(opcode).map(|route| route.length)
    }

    /// Decode one complete packet, opcode byte included
    pub fn decode(&self, frame: &[u8]) -> PacketResult<ServerPacket> {
        let envelope = Envelope::parse(frame, self)?;
        let decoder = self
            .route(envelope.opcode)
            .and_then(|route| route.decoder)
            .ok_or(PacketError::UnknownOpcode(envelope.opcode))?;

        let mut cursor = ByteCursor::new(envelope.payload);
        let packet = decoder(&mut cursor)?;

        if !cursor.is_empty() {
            tracing::trace!(
                "{} bytes left unread in packet {:#04x}",
                cursor.remaining(),
                envelope.opcode
            );
        }

        Ok(packet)
    }

    fn insert(&mut self, opcode: u8, since: ClientVersion, route: Route) {
        if since > self.version {
            return;
        }
        if let PacketLength::Fixed(size) = route.length {
            debug_assert!(size >= 1, "fixed length must cover the opcode");
        }

        match self.routes.get(&opcode) {
            Some((existing, _)) if *existing > since => {}
            _ => {
                self.routes.insert(opcode, (since, route));
            }
        }
    }
}
