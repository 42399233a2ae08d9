//! World module - Client-side model of the game world
//!
//! The [`World`] owns the entity store and the party. It is mutated only by
//! [`World::apply`] on the world-apply stage; everything else reads a
//! [`WorldSnapshot`].

mod entities;
mod party;
mod serial;

pub use entities::*;
pub use party::*;
pub use serial::*;

use serde::Serialize;

use crate::observer::{touch, ObserverBridge};
use crate::protocol::ServerPacket;

/// Settings the world consults while applying packets
#[derive(Debug, Clone, Copy)]
pub struct WorldSettings {
    /// Show a prompt when someone invites us to a party
    pub invite_prompts: bool,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            invite_prompts: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct World {
    settings: WorldSettings,
    player: Serial,
    features: u32,
    entities: EntityStore,
    party: Party,
}

impl World {
    pub fn new(settings: WorldSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Serial of the local player, `Serial::NONE` before login
    pub fn local_player_serial(&self) -> Serial {
        self.player
    }

    pub fn invite_prompts_enabled(&self) -> bool {
        self.settings.invite_prompts
    }

    pub fn features(&self) -> u32 {
        self.features
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn party(&self) -> &Party {
        &self.party
    }

    pub fn resolve_name(&self, serial: Serial) -> String {
        self.entities.resolve_name(serial)
    }

    /// Apply one decoded packet
    pub fn apply(&mut self, packet: ServerPacket, bridge: &mut dyn ObserverBridge) {
        tracing::debug!("Applying {}", packet.name());

        match packet {
            ServerPacket::MobileStatus {
                serial,
                name,
                hits,
                hits_max,
            } => {
                let entity = self.entities.get_or_create(serial);
                entity.name = Some(name);
                entity.hits = hits;
                entity.hits_max = hits_max;
                touch(bridge, serial);
            }
            ServerPacket::MobileName { serial, name } => {
                self.entities.get_or_create(serial).name = Some(name);
                touch(bridge, serial);
            }
            ServerPacket::LoginConfirm { player } => {
                tracing::info!("Logged in as {}", player);
                self.player = player;
                self.entities.get_or_create(player);
            }
            ServerPacket::DeleteObject { serial } => {
                if self.entities.remove(serial).is_some() {
                    touch(bridge, serial);
                }
            }
            ServerPacket::Ping { .. } => {}
            ServerPacket::Features { flags } => {
                tracing::debug!("Supported features: {:#010x}", flags);
                self.features = flags;
            }
            ServerPacket::Party(packet) => {
                let ctx = PartyContext {
                    player: self.player,
                    invite_prompts: self.settings.invite_prompts,
                };
                self.party.apply(packet, ctx, &mut self.entities, bridge);
            }
            ServerPacket::LogoutStatus => {
                tracing::info!("Logged out");
                self.logout(bridge);
            }
        }
    }

    /// Drop all session state
    pub fn logout(&mut self, bridge: &mut dyn ObserverBridge) {
        let had_party = self.party.len() > 0;
        self.entities.clear();
        self.party.clear();
        self.player = Serial::NONE;
        self.features = 0;
        if had_party {
            bridge.notify_membership_view();
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let mut entities: Vec<EntitySnapshot> = self
            .entities
            .iter()
            .map(|entity| EntitySnapshot {
                serial: entity.serial(),
                kind: entity.kind(),
                name: self.entities.resolve_name(entity.serial()),
                hits: entity.hits,
                hits_max: entity.hits_max,
                party_slot: self.party.slot_of(entity.serial()),
            })
            .collect();
        entities.sort_by_key(|entity| entity.serial);

        WorldSnapshot {
            player: self.player,
            features: self.features,
            entities,
            party: self.party.snapshot(&self.entities),
        }
    }
}

/// Read-only copy of the world for UI collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldSnapshot {
    pub player: Serial,
    pub features: u32,
    pub entities: Vec<EntitySnapshot>,
    pub party: PartySnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySnapshot {
    pub serial: Serial,
    pub kind: EntityKind,
    pub name: String,
    pub hits: u16,
    pub hits_max: u16,
    pub party_slot: Option<usize>,
}
