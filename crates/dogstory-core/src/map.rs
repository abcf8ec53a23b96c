//! Static map model - roads, buildings, offices and loot types.
//!
//! A [`Map`] is immutable once built. Sessions share it through an `Arc`.

use std::collections::HashSet;
use std::fmt;

use dogstory_logic::geometry::GridPoint;
use dogstory_logic::loot::LootGeneratorConfig;
use dogstory_logic::roads::{Road, RoadNetwork, ROAD_HALF_WIDTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DOG_SPEED: f64 = 1.0;
pub const DEFAULT_BAG_CAPACITY: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(pub String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfficeId(pub String);

impl fmt::Display for OfficeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rendering offset of an office sprite relative to its position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

/// Loot return point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub position: GridPoint,
    pub offset: Offset,
}

/// Decorative only; does not block movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// One entry of the map's loot table.
///
/// Only `value` matters to the simulation; everything else (name, sprite file,
/// rotation, colour...) is kept verbatim for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootType {
    pub value: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LootType {
    pub fn with_value(value: u64) -> Self {
        Self {
            value,
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("map {map}: duplicate office id {office}")]
    DuplicateOffice { map: MapId, office: OfficeId },
    #[error("map {0}: no roads")]
    NoRoads(MapId),
    #[error("map {0}: no loot types")]
    NoLootTypes(MapId),
}

#[derive(Debug, Clone)]
pub struct Map {
    id: MapId,
    name: String,
    roads: RoadNetwork,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    loot_types: Vec<LootType>,
    dog_speed: f64,
    bag_capacity: usize,
    loot_generator: Option<LootGeneratorConfig>,
}

impl Map {
    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roads(&self) -> &RoadNetwork {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    pub fn loot_types(&self) -> &[LootType] {
        &self.loot_types
    }

    /// Score awarded for returning one item of `loot_type`.
    pub fn loot_value(&self, loot_type: usize) -> u64 {
        self.loot_types.get(loot_type).map_or(0, |t| t.value)
    }

    pub fn dog_speed(&self) -> f64 {
        self.dog_speed
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    /// Per-map generator override, if any.
    pub fn loot_generator(&self) -> Option<LootGeneratorConfig> {
        self.loot_generator
    }

    pub fn road_offset(&self) -> f64 {
        ROAD_HALF_WIDTH
    }
}

/// Collects a map's parts and validates them into an immutable [`Map`].
#[derive(Debug, Clone)]
pub struct MapBuilder {
    id: MapId,
    name: String,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    loot_types: Vec<LootType>,
    dog_speed: f64,
    bag_capacity: usize,
    loot_generator: Option<LootGeneratorConfig>,
}

impl MapBuilder {
    pub fn new(id: MapId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            roads: Vec::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            loot_types: Vec::new(),
            dog_speed: DEFAULT_DOG_SPEED,
            bag_capacity: DEFAULT_BAG_CAPACITY,
            loot_generator: None,
        }
    }

    pub fn road(mut self, road: Road) -> Self {
        self.roads.push(road);
        self
    }

    pub fn building(mut self, building: Building) -> Self {
        self.buildings.push(building);
        self
    }

    pub fn office(mut self, office: Office) -> Self {
        self.offices.push(office);
        self
    }

    pub fn loot_type(mut self, loot_type: LootType) -> Self {
        self.loot_types.push(loot_type);
        self
    }

    pub fn dog_speed(mut self, speed: f64) -> Self {
        self.dog_speed = speed;
        self
    }

    pub fn bag_capacity(mut self, capacity: usize) -> Self {
        self.bag_capacity = capacity;
        self
    }

    pub fn loot_generator(mut self, config: LootGeneratorConfig) -> Self {
        self.loot_generator = Some(config);
        self
    }

    pub fn build(self) -> Result<Map, MapError> {
        if self.roads.is_empty() {
            return Err(MapError::NoRoads(self.id));
        }
        if self.loot_types.is_empty() {
            return Err(MapError::NoLootTypes(self.id));
        }
        if let Some(office) = first_duplicate_office(&self.offices) {
            return Err(MapError::DuplicateOffice {
                map: self.id.clone(),
                office,
            });
        }

        Ok(Map {
            roads: RoadNetwork::new(self.roads, ROAD_HALF_WIDTH),
            id: self.id,
            name: self.name,
            buildings: self.buildings,
            offices: self.offices,
            loot_types: self.loot_types,
            dog_speed: self.dog_speed,
            bag_capacity: self.bag_capacity,
            loot_generator: self.loot_generator,
        })
    }
}

fn first_duplicate_office(offices: &[Office]) -> Option<OfficeId> {
    let mut seen = HashSet::new();
    offices
        .iter()
        .find(|office| !seen.insert(&office.id))
        .map(|office| office.id.clone())
}
