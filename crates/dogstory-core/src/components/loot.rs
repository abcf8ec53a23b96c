//! Loot components and ids.

use std::fmt;

use dogstory_logic::geometry::Point2D;
use serde::{Deserialize, Serialize};

/// Session-scoped loot id, issued monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LootId(pub u64);

impl fmt::Display for LootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A collectible item. Lives as its own entity while on the ground and moves
/// into a dog's [`Bag`](crate::components::Bag) when picked up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Loot {
    pub id: LootId,
    /// Index into the map's loot-type table
    pub loot_type: usize,
    pub position: Point2D,
}
