//! Session module - Drives the decode-and-apply path over a byte stream
//!
//! A [`Session`] frames raw server bytes, decodes each packet through the
//! dispatch table and applies it to its [`World`]. Used for capture replay
//! and anywhere the receive and apply stages run on the same thread.

use bytes::BytesMut;
use serde::Serialize;

use crate::observer::ObserverBridge;
use crate::protocol::{report_dropped, DispatchTable, FrameDecoder, PacketResult};
use crate::world::{World, WorldSettings};

/// Packet counters for one session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Packets decoded and applied
    pub applied: u64,
    /// Packets dropped at the packet boundary
    pub dropped: u64,
    /// Raw bytes fed in
    pub bytes_received: u64,
}

pub struct Session<B: ObserverBridge> {
    table: DispatchTable,
    framer: FrameDecoder,
    buffer: BytesMut,
    world: World,
    bridge: B,
    stats: SessionStats,
}

impl<B: ObserverBridge> Session<B> {
    pub fn new(table: DispatchTable, settings: WorldSettings, bridge: B) -> Self {
        Self {
            table,
            framer: FrameDecoder::default(),
            buffer: BytesMut::with_capacity(4096),
            world: World::new(settings),
            bridge,
            stats: SessionStats::default(),
        }
    }

    pub fn with_framer(mut self, framer: FrameDecoder) -> Self {
        self.framer = framer;
        self
    }

    /// Feed raw stream bytes and apply every complete packet.
    ///
    /// Returns the number of frames handled. An error means the stream lost
    /// sync; the unframed bytes stay buffered.
    pub fn feed(&mut self, bytes: &[u8]) -> PacketResult<usize> {
        self.buffer.extend_from_slice(bytes);
        self.stats.bytes_received += bytes.len() as u64;

        let mut frames = 0;
        while let Some(frame) = self.framer.decode(&mut self.buffer, &self.table)? {
            self.handle_frame(&frame);
            frames += 1;
        }
        Ok(frames)
    }

    /// Decode and apply one complete packet; returns whether it was applied
    pub fn handle_frame(&mut self, frame: &[u8]) -> bool {
        match self.table.decode(frame) {
            Ok(packet) => {
                self.world.apply(packet, &mut self.bridge);
                self.stats.applied += 1;
                true
            }
            Err(e) => {
                report_dropped(frame, &e);
                self.stats.dropped += 1;
                false
            }
        }
    }

    /// Bytes waiting for the rest of their packet
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}
