//! Party membership state
//!
//! A fixed array of member slots plus leader and inviter. Every roster packet
//! rebuilds the member list from scratch; members are serial keys into the
//! entity store, never owners of entity data.

use serde::Serialize;

use super::entities::EntityStore;
use super::serial::Serial;
use crate::observer::{touch, ChatChannel, ChatEvent, ObserverBridge};
use crate::protocol::{PartyPacket, RosterUpdate};

/// Maximum party size
pub const PARTY_SIZE: usize = 10;

/// A party slot occupant, identified by serial alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PartyMember {
    serial: Serial,
}

impl PartyMember {
    pub fn new(serial: Serial) -> Self {
        Self { serial }
    }

    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// Live display name, looked up on every call
    pub fn name(&self, entities: &EntityStore) -> String {
        entities.resolve_name(self.serial)
    }
}

/// Inputs the party logic reads but never changes
#[derive(Debug, Clone, Copy, Default)]
pub struct PartyContext {
    pub player: Serial,
    pub invite_prompts: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Party {
    leader: Serial,
    inviter: Serial,
    slots: [Option<PartyMember>; PARTY_SIZE],
}

impl Party {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leader(&self) -> Serial {
        self.leader
    }

    pub fn inviter(&self) -> Serial {
        self.inviter
    }

    /// Occupied slots in slot order
    pub fn members(&self) -> impl Iterator<Item = &PartyMember> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.members().count()
    }

    /// No leader, no inviter and no members
    pub fn is_empty(&self) -> bool {
        self.leader == Serial::NONE && self.inviter == Serial::NONE && self.len() == 0
    }

    pub fn contains(&self, serial: Serial) -> bool {
        self.slot_of(serial).is_some()
    }

    pub fn slot_of(&self, serial: Serial) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(member) if member.serial == serial))
    }

    pub fn clear(&mut self) {
        self.leader = Serial::NONE;
        self.inviter = Serial::NONE;
        self.slots = Default::default();
    }

    /// Empty one slot, returning who was in it
    pub fn clear_slot(&mut self, index: usize) -> Option<Serial> {
        self.slots
            .get_mut(index)
            .and_then(Option::take)
            .map(|member| member.serial)
    }

    pub(crate) fn apply(
        &mut self,
        packet: PartyPacket,
        ctx: PartyContext,
        entities: &mut EntityStore,
        bridge: &mut dyn ObserverBridge,
    ) {
        match packet {
            PartyPacket::Disband { removal } => {
                tracing::info!(
                    "Party disbanded ({} update with no members)",
                    if removal { "remove" } else { "add" }
                );
                self.disband(bridge);
            }
            PartyPacket::Roster(update) => {
                self.replace(update, ctx, entities, bridge);
            }
            PartyPacket::Message { sender, text, private } => {
                self.forward_message(sender, text, private, entities, bridge);
            }
            PartyPacket::Invite { inviter } => {
                tracing::info!("Party invite from {}", inviter);
                self.inviter = inviter;
                if ctx.invite_prompts {
                    bridge.present_invite(inviter);
                }
            }
        }
    }

    fn disband(&mut self, bridge: &mut dyn ObserverBridge) {
        let previous: Vec<Serial> = self.members().map(PartyMember::serial).collect();
        self.clear();

        for serial in previous {
            touch(bridge, serial);
        }
        bridge.notify_membership_view();
    }

    fn replace(
        &mut self,
        update: RosterUpdate,
        ctx: PartyContext,
        entities: &mut EntityStore,
        bridge: &mut dyn ObserverBridge,
    ) {
        // Stale slots must never survive into the new roster.
        self.clear();

        let removal = update.is_removal();
        let excluded = update.excluded;
        if let Some(serial) = excluded {
            touch(bridge, serial);
        }

        // Removing ourselves means we left, whatever the list says.
        let left = excluded.is_some_and(|serial| serial.is_valid() && serial == ctx.player);
        if left {
            tracing::info!("Removed from party");
        }

        let mut inserted = 0usize;
        for serial in update.serials {
            let skipped = left || Some(serial) == excluded;

            if !skipped && self.insert(serial, entities) {
                if inserted == 0 {
                    self.leader = serial;
                }
                inserted += 1;
            }

            touch(bridge, serial);
        }

        if removal && inserted <= 1 {
            self.collapse(bridge);
        }

        tracing::debug!(
            "Party roster: {} members, leader {}",
            self.len(),
            self.leader
        );
        bridge.notify_membership_view();
    }

    /// Put `serial` in the next free slot
    fn insert(&mut self, serial: Serial, entities: &mut EntityStore) -> bool {
        if !serial.is_valid() {
            tracing::debug!("Ignoring sentinel serial {} in party roster", serial);
            return false;
        }
        if self.contains(serial) {
            return false;
        }

        let Some(slot) = self.slots.iter_mut().find(|slot| slot.is_none()) else {
            tracing::warn!("Party full, dropping member {}", serial);
            return false;
        };

        *slot = Some(PartyMember::new(serial));
        entities.get_or_create(serial);
        true
    }

    /// Drop every remaining member after a removal left at most one
    fn collapse(&mut self, bridge: &mut dyn ObserverBridge) {
        for index in 0..PARTY_SIZE {
            if let Some(serial) = self.clear_slot(index) {
                touch(bridge, serial);
            }
        }
        self.leader = Serial::NONE;
        self.inviter = Serial::NONE;
    }

    fn forward_message(
        &self,
        sender: Serial,
        text: String,
        private: bool,
        entities: &EntityStore,
        bridge: &mut dyn ObserverBridge,
    ) {
        let Some(member) = self.members().find(|member| member.serial == sender) else {
            tracing::debug!("Party message from non-member {}", sender);
            return;
        };

        tracing::trace!("Party message from {} (private: {})", sender, private);
        bridge.emit_chat(ChatEvent {
            sender,
            label: member.name(entities),
            body: text,
            channel: ChatChannel::Party,
        });
    }
}

/// Read-only view of the party
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartySnapshot {
    pub leader: Serial,
    pub inviter: Serial,
    pub members: Vec<MemberSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSnapshot {
    pub serial: Serial,
    pub name: String,
}

impl Party {
    pub fn snapshot(&self, entities: &EntityStore) -> PartySnapshot {
        PartySnapshot {
            leader: self.leader,
            inviter: self.inviter,
            members: self
                .members()
                .map(|member| MemberSnapshot {
                    serial: member.serial,
                    name: member.name(entities),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{RecordingBridge, UiEvent};
    use proptest::prelude::*;

    const PLAYER: Serial = Serial(0x100);
    const A: Serial = Serial(0x100);
    const B: Serial = Serial(0x200);
    const C: Serial = Serial(0x300);
    const D: Serial = Serial(0x400);

    struct Fixture {
        party: Party,
        entities: EntityStore,
        bridge: RecordingBridge,
        ctx: PartyContext,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                party: Party::new(),
                entities: EntityStore::new(),
                bridge: RecordingBridge::new(),
                ctx: PartyContext {
                    player: PLAYER,
                    invite_prompts: true,
                },
            }
        }

        fn apply(&mut self, packet: PartyPacket) {
            self.party
                .apply(packet, self.ctx, &mut self.entities, &mut self.bridge);
        }

        fn add(&mut self, serials: &[Serial]) {
            self.apply(PartyPacket::Roster(RosterUpdate {
                excluded: None,
                serials: serials.to_vec(),
            }));
        }

        fn remove(&mut self, excluded: Serial, serials: &[Serial]) {
            self.apply(PartyPacket::Roster(RosterUpdate {
                excluded: Some(excluded),
                serials: serials.to_vec(),
            }));
        }

        fn members(&self) -> Vec<Serial> {
            self.party.members().map(PartyMember::serial).collect()
        }
    }

    #[test]
    fn test_add_sets_leader_and_members() {
        let mut fx = Fixture::new();
        fx.add(&[A, B, C]);

        assert_eq!(fx.party.leader(), A);
        assert_eq!(fx.members(), vec![A, B, C]);
        for serial in [A, B, C] {
            assert_eq!(fx.bridge.refresh_count(serial), 1);
            assert!(fx.entities.contains(serial));
        }
        assert_eq!(fx.bridge.events().last(), Some(&UiEvent::MembershipView));
    }

    #[test]
    fn test_remove_skips_excluded_member() {
        let mut fx = Fixture::new();
        fx.add(&[B, C, D]);
        fx.bridge.take();
        fx.remove(B, &[B, C, D]);

        assert_eq!(fx.party.leader(), C);
        assert_eq!(fx.members(), vec![C, D]);
        assert!(!fx.party.contains(B));
        // Skipped members are still refreshed: once as excluded, once in the list.
        assert_eq!(fx.bridge.refresh_count(B), 2);
        assert_eq!(fx.bridge.refresh_count(C), 1);
        assert_eq!(fx.bridge.refresh_count(D), 1);
    }

    #[test]
    fn test_self_removal_empties_party() {
        let mut fx = Fixture::new();
        fx.add(&[A, B]);
        fx.bridge.take();
        fx.remove(A, &[A, B]);
        assert!(fx.party.is_empty());
        assert_eq!(fx.bridge.refresh_count(A), 2);
        assert_eq!(fx.bridge.refresh_count(B), 1);
        assert_eq!(fx.bridge.events().last(), Some(&UiEvent::MembershipView));

        // Even when the list claims others remain.
        fx.add(&[A, B, C]);
        fx.remove(A, &[B, C, D]);
        assert!(fx.party.is_empty());
    }

    #[test]
    fn test_disband_notifies_previous_members_once() {
        let mut fx = Fixture::new();
        fx.add(&[A, B, C]);
        fx.apply(PartyPacket::Invite { inviter: D });
        fx.bridge.take();

        fx.apply(PartyPacket::Disband { removal: true });

        assert!(fx.party.is_empty());
        assert_eq!(fx.party.inviter(), Serial::NONE);
        for serial in [A, B, C] {
            assert_eq!(fx.bridge.refresh_count(serial), 1);
        }
        assert_eq!(fx.bridge.refresh_count(D), 0);
    }

    #[test]
    fn test_removal_leaving_one_member_collapses() {
        let mut fx = Fixture::new();
        fx.add(&[B, C]);
        fx.bridge.take();

        fx.remove(B, &[B, C]);

        assert!(fx.party.is_empty());
        // Once while iterating, once while collapsing.
        assert_eq!(fx.bridge.refresh_count(C), 2);
    }

    #[test]
    fn test_roster_is_idempotent() {
        let mut fx = Fixture::new();
        fx.remove(B, &[B, C, D]);
        let once = fx.party.clone();
        fx.remove(B, &[B, C, D]);
        assert_eq!(fx.party, once);

        fx.add(&[D, C]);
        let once = fx.party.clone();
        fx.add(&[D, C]);
        assert_eq!(fx.party, once);
    }

    #[test]
    fn test_new_roster_replaces_old() {
        let mut fx = Fixture::new();
        fx.add(&[A, B, C, D]);
        fx.add(&[D, C]);
        assert_eq!(fx.members(), vec![D, C]);
        assert_eq!(fx.party.leader(), D);
    }

    #[test]
    fn test_duplicates_and_overflow() {
        let mut fx = Fixture::new();
        fx.add(&[A, A, B]);
        assert_eq!(fx.members(), vec![A, B]);

        let many: Vec<Serial> = (1..=12).map(Serial).collect();
        fx.add(&many);
        assert_eq!(fx.party.len(), PARTY_SIZE);
        assert!(!fx.party.contains(Serial(11)));
    }

    #[test]
    fn test_message_uses_live_name() {
        let mut fx = Fixture::new();
        fx.add(&[A, B]);
        fx.entities.get_or_create(B).name = Some("Jaana".to_string());
        fx.bridge.take();

        fx.apply(PartyPacket::Message {
            sender: B,
            text: "heal me".to_string(),
            private: false,
        });

        assert_eq!(
            fx.bridge.events(),
            &[UiEvent::Chat(ChatEvent {
                sender: B,
                label: "Jaana".to_string(),
                body: "heal me".to_string(),
                channel: ChatChannel::Party,
            })]
        );
    }

    #[test]
    fn test_message_from_stranger_is_ignored() {
        let mut fx = Fixture::new();
        fx.apply(PartyPacket::Message {
            sender: C,
            text: "hi".to_string(),
            private: true,
        });
        assert!(fx.bridge.events().is_empty());
        assert!(!fx.entities.contains(C));
    }

    #[test]
    fn test_invite_respects_prompt_setting() {
        let mut fx = Fixture::new();
        fx.add(&[A, B]);
        fx.bridge.take();

        fx.apply(PartyPacket::Invite { inviter: C });
        assert_eq!(fx.party.inviter(), C);
        assert_eq!(fx.bridge.events(), &[UiEvent::Invite { inviter: C }]);
        assert_eq!(fx.members(), vec![A, B]);

        fx.ctx.invite_prompts = false;
        fx.apply(PartyPacket::Invite { inviter: D });
        assert_eq!(fx.party.inviter(), D);
        assert_eq!(fx.bridge.events().len(), 1);
    }

    #[test]
    fn test_removed_entity_resolves_to_placeholder() {
        let mut fx = Fixture::new();
        fx.add(&[A, B]);
        fx.entities.get_or_create(B).name = Some("Geoffrey".to_string());
        fx.entities.remove(B);

        let snapshot = fx.party.snapshot(&fx.entities);
        assert_eq!(snapshot.members[1].serial, B);
        assert_eq!(snapshot.members[1].name, crate::world::NOT_SEEING);
    }

    #[test]
    fn test_clear_slot() {
        let mut fx = Fixture::new();
        fx.add(&[A, B]);
        assert_eq!(fx.party.clear_slot(1), Some(B));
        assert_eq!(fx.party.clear_slot(1), None);
        assert_eq!(fx.party.clear_slot(PARTY_SIZE), None);
    }

    /// Expected party after a roster update: (members before collapse, final members)
    fn model_roster(update: &RosterUpdate, player: Serial) -> (Vec<Serial>, Vec<Serial>) {
        let left = update.excluded == Some(player) && player.is_valid();
        let mut inserted = Vec::new();
        if !left {
            for &serial in &update.serials {
                if Some(serial) == update.excluded
                    || !serial.is_valid()
                    || inserted.contains(&serial)
                    || inserted.len() == PARTY_SIZE
                {
                    continue;
                }
                inserted.push(serial);
            }
        }

        let collapsed = update.is_removal() && inserted.len() <= 1;
        let members = if collapsed { Vec::new() } else { inserted.clone() };
        (inserted, members)
    }

    fn serial_strategy() -> impl Strategy<Value = Serial> {
        prop_oneof![
            4 => (1u32..24).prop_map(Serial),
            2 => any::<u32>().prop_map(Serial),
            1 => Just(PLAYER),
            1 => Just(Serial::NONE),
            1 => Just(Serial::ALL),
        ]
    }

    /// Roster updates with c in 2..=12; the excluded serial is either drawn
    /// from the list, the local player, or anything at all
    fn roster_strategy() -> impl Strategy<Value = RosterUpdate> {
        (
            prop::collection::vec(serial_strategy(), 2..=12),
            prop_oneof![
                Just(None),
                any::<prop::sample::Index>().prop_map(Some),
            ],
            0u8..3,
            serial_strategy(),
        )
            .prop_map(|(serials, pick, mode, other)| {
                let excluded = pick.map(|index| match mode {
                    0 => *index.get(&serials),
                    1 => PLAYER,
                    _ => other,
                });
                RosterUpdate { excluded, serials }
            })
    }

    fn distinct_serials(max: usize) -> impl Strategy<Value = Vec<Serial>> {
        prop::collection::hash_set(1u32..0x4000_0000, 0..=max)
            .prop_map(|set| set.into_iter().map(Serial).collect())
    }

    proptest! {
        #[test]
        fn prop_roster_matches_model(
            before in distinct_serials(PARTY_SIZE),
            update in roster_strategy(),
        ) {
            let mut fx = Fixture::new();
            fx.add(&before);
            fx.apply(PartyPacket::Invite { inviter: D });
            fx.bridge.take();

            fx.apply(PartyPacket::Roster(update.clone()));

            let (inserted, members) = model_roster(&update, PLAYER);
            prop_assert_eq!(fx.members(), members.clone());
            prop_assert_eq!(fx.party.leader(), members.first().copied().unwrap_or(Serial::NONE));
            prop_assert_eq!(fx.party.inviter(), Serial::NONE);

            let collapsed = members.is_empty() && update.is_removal();
            let mut touched: Vec<Serial> = update.serials.clone();
            touched.extend(update.excluded);
            for serial in touched {
                let expected = update.serials.iter().filter(|s| **s == serial).count()
                    + usize::from(update.excluded == Some(serial))
                    + usize::from(collapsed && inserted.contains(&serial));
                prop_assert_eq!(fx.bridge.refresh_count(serial), expected);
            }
            prop_assert_eq!(fx.bridge.events().last(), Some(&UiEvent::MembershipView));
        }

        #[test]
        fn prop_distinct_roster_leader_and_size(
            serials in distinct_serials(PARTY_SIZE),
            exclude in any::<Option<prop::sample::Index>>(),
        ) {
            prop_assume!(serials.len() >= 2 && !serials.contains(&PLAYER));
            let excluded = exclude.map(|index| *index.get(&serials));

            let mut fx = Fixture::new();
            fx.apply(PartyPacket::Roster(RosterUpdate { excluded, serials: serials.clone() }));

            let expected = serials.len() - usize::from(excluded.is_some());
            if excluded.is_some() && expected <= 1 {
                prop_assert!(fx.party.is_empty());
            } else {
                let first = serials.iter().copied().find(|s| Some(*s) != excluded);
                prop_assert_eq!(Some(fx.party.leader()), first);
                prop_assert_eq!(fx.party.len(), expected);
            }
        }

        #[test]
        fn prop_self_removal_always_empties(
            before in distinct_serials(PARTY_SIZE),
            serials in prop::collection::vec(serial_strategy(), 2..=12),
        ) {
            let mut fx = Fixture::new();
            fx.add(&before);
            fx.remove(PLAYER, &serials);
            prop_assert!(fx.party.is_empty());
        }

        #[test]
        fn prop_disband_notifies_each_member_once(
            before in distinct_serials(PARTY_SIZE),
            removal in any::<bool>(),
        ) {
            let mut fx = Fixture::new();
            fx.add(&before);
            fx.apply(PartyPacket::Invite { inviter: D });
            let previous = fx.members();
            fx.bridge.take();

            fx.apply(PartyPacket::Disband { removal });

            prop_assert!(fx.party.is_empty());
            for serial in &previous {
                prop_assert_eq!(fx.bridge.refresh_count(*serial), 1);
            }
            let refreshes = fx
                .bridge
                .events()
                .iter()
                .filter(|event| matches!(event, UiEvent::Refresh { .. }))
                .count();
            prop_assert_eq!(refreshes, previous.len());
        }

        #[test]
        fn prop_roster_is_idempotent(
            before in distinct_serials(PARTY_SIZE),
            update in roster_strategy(),
        ) {
            let mut fx = Fixture::new();
            fx.add(&before);
            fx.apply(PartyPacket::Roster(update.clone()));
            let once = fx.party.clone();

            fx.apply(PartyPacket::Roster(update));
            prop_assert_eq!(fx.party, once);
        }
    }
}
