//! Entity store
//!
//! The only owner of entity records. Everything else refers to entities by
//! [`Serial`] and looks them up here.

use std::collections::HashMap;

use super::serial::{EntityKind, Serial};

/// Display name used when an entity is unknown or unnamed
pub const NOT_SEEING: &str = "<Not Seeing>";

/// One mobile or item known to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    serial: Serial,
    pub name: Option<String>,
    pub hits: u16,
    pub hits_max: u16,
}

impl Entity {
    /// Placeholder for a serial seen before its details
    pub fn placeholder(serial: Serial) -> Self {
        Self {
            serial,
            name: None,
            hits: 0,
            hits_max: 0,
        }
    }

    pub fn serial(&self) -> Serial {
        self.serial
    }

    pub fn kind(&self) -> EntityKind {
        self.serial.kind()
    }

    /// Name if one has been received and is not blank
    pub fn known_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Default)]
pub struct EntityStore {
    entities: HashMap<Serial, Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entity for `serial`, inserting a placeholder if it is new
    pub fn get_or_create(&mut self, serial: Serial) -> &mut Entity {
        self.entities.entry(serial).or_insert_with(|| {
            tracing::trace!("New entity {}", serial);
            Entity::placeholder(serial)
        })
    }

    pub fn get(&self, serial: Serial) -> Option<&Entity> {
        self.entities.get(&serial)
    }

    pub fn get_mut(&mut self, serial: Serial) -> Option<&mut Entity> {
        self.entities.get_mut(&serial)
    }

    pub fn contains(&self, serial: Serial) -> bool {
        self.entities.contains_key(&serial)
    }

    pub fn remove(&mut self, serial: Serial) -> Option<Entity> {
        self.entities.remove(&serial)
    }

    /// Best known display name; never fails
    pub fn resolve_name(&self, serial: Serial) -> String {
        self.get(serial)
            .and_then(Entity::known_name)
            .unwrap_or(NOT_SEEING)
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }
}
