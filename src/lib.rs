//! Shardlink - protocol decoding and world synchronization for a legacy shard game client
//!
//! Raw server bytes are framed and decoded into typed packets
//! ([`protocol`]), applied to the client-side [`world`] model, and every
//! mutation is reported to UI collaborators through an [`observer`] bridge.

pub mod config;
pub mod network;
pub mod observer;
pub mod protocol;
pub mod session;
pub mod world;
