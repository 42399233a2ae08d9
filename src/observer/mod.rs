//! Observer module - Boundary between the world and UI collaborators
//!
//! The world calls through [`ObserverBridge`] after each mutation. Every call
//! is a hint: it never blocks, returns nothing, and may be a no-op when no
//! panel is watching.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::world::Serial;

/// Chat channel a forwarded line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatChannel {
    Party,
}

/// A chat line forwarded to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEvent {
    pub sender: Serial,
    /// Live display name of the sender
    pub label: String,
    pub body: String,
    pub channel: ChatChannel,
}

/// Notifications emitted toward the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    /// Panels keyed by this serial should refresh
    Refresh { serial: Serial },
    /// The party panel should refresh
    MembershipView,
    /// Ask the player to accept a party invite
    Invite { inviter: Serial },
    Chat(ChatEvent),
}

/// Capability the world uses to reach UI collaborators
pub trait ObserverBridge {
    /// Whether any panel is currently keyed by `serial`
    fn has_observer(&self, _serial: Serial) -> bool {
        true
    }

    /// Mark panels keyed by `serial` dirty
    fn notify(&mut self, serial: Serial);

    /// Mark the whole membership panel dirty
    fn notify_membership_view(&mut self);

    fn present_invite(&mut self, inviter: Serial);

    fn emit_chat(&mut self, chat: ChatEvent);
}

/// Notify `serial` if anything observes it
pub fn touch(bridge: &mut dyn ObserverBridge, serial: Serial) {
    if bridge.has_observer(serial) {
        bridge.notify(serial);
    }
}

/// Bridge that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBridge;

impl ObserverBridge for NullBridge {
    fn has_observer(&self, _serial: Serial) -> bool {
        false
    }

    fn notify(&mut self, _serial: Serial) {}

    fn notify_membership_view(&mut self) {}

    fn present_invite(&mut self, _inviter: Serial) {}

    fn emit_chat(&mut self, _chat: ChatEvent) {}
}

/// Bridge that keeps every event in order
#[derive(Debug, Default, Clone)]
pub struct RecordingBridge {
    events: Vec<UiEvent>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[UiEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of refresh hints sent for `serial`
    pub fn refresh_count(&self, serial: Serial) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, UiEvent::Refresh { serial: s } if *s == serial))
            .count()
    }
}

impl ObserverBridge for RecordingBridge {
    fn notify(&mut self, serial: Serial) {
        self.events.push(UiEvent::Refresh { serial });
    }

    fn notify_membership_view(&mut self) {
        self.events.push(UiEvent::MembershipView);
    }

    fn present_invite(&mut self, inviter: Serial) {
        self.events.push(UiEvent::Invite { inviter });
    }

    fn emit_chat(&mut self, chat: ChatEvent) {
        self.events.push(UiEvent::Chat(chat));
    }
}

/// Bridge that forwards events to a UI task over a bounded channel.
///
/// Uses `try_send`; when the UI falls behind, hints are dropped and counted.
#[derive(Debug, Clone)]
pub struct ChannelBridge {
    sender: mpsc::Sender<UiEvent>,
    dropped: u64,
}

impl ChannelBridge {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender, dropped: 0 }
    }

    /// Create a bridge and the receiver the UI side drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Events lost because the channel was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn forward(&mut self, event: UiEvent) {
        if let Err(e) = self.sender.try_send(event) {
            self.dropped += 1;
            tracing::trace!("UI event dropped: {}", e);
        }
    }
}

impl ObserverBridge for ChannelBridge {
    fn has_observer(&self, _serial: Serial) -> bool {
        !self.sender.is_closed()
    }

    fn notify(&mut self, serial: Serial) {
        self.forward(UiEvent::Refresh { serial });
    }

    fn notify_membership_view(&mut self) {
        self.forward(UiEvent::MembershipView);
    }

    fn present_invite(&mut self, inviter: Serial) {
        self.forward(UiEvent::Invite { inviter });
    }

    fn emit_chat(&mut self, chat: ChatEvent) {
        self.forward(UiEvent::Chat(chat));
    }
}
