//! Entity serials

use serde::{Deserialize, Serialize};
use std::fmt;

/// First serial in the item range; everything below is a mobile
const ITEM_RANGE_START: u32 = 0x4000_0000;

/// 32-bit entity identifier, unique within a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Serial(pub u32);

/// Kind of entity a serial refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Mobile,
    Item,
}

impl Serial {
    /// Sentinel meaning "no entity"
    pub const NONE: Serial = Serial(0);
    /// Sentinel meaning "every entity"
    pub const ALL: Serial = Serial(0xFFFF_FFFF);

    /// True for anything that is not a sentinel
    pub fn is_valid(self) -> bool {
        self != Self::NONE && self != Self::ALL
    }

    pub fn is_mobile(self) -> bool {
        self.is_valid() && self.0 < ITEM_RANGE_START
    }

    pub fn is_item(self) -> bool {
        self.is_valid() && self.0 >= ITEM_RANGE_START
    }

    pub fn kind(self) -> EntityKind {
        if self.is_item() {
            EntityKind::Item
        } else {
            EntityKind::Mobile
        }
    }
}

impl From<u32> for Serial {
    fn from(value: u32) -> Self {
        Serial(value)
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
