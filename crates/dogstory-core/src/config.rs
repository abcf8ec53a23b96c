//! Game configuration loaded from JSON.
//!
//! ```json
//! {
//!   "defaultDogSpeed": 3.0,
//!   "defaultBagCapacity": 3,
//!   "dogRetirementTime": 15.0,
//!   "lootGeneratorConfig": { "period": 5.0, "probability": 0.5 },
//!   "maps": [{
//!     "id": "map1", "name": "Map 1", "dogSpeed": 4.0, "bagCapacity": 2,
//!     "roads": [{ "x0": 0, "y0": 0, "x1": 40 }, { "x0": 40, "y0": 0, "y1": 30 }],
//!     "buildings": [{ "x": 5, "y": 5, "w": 30, "h": 20 }],
//!     "offices": [{ "id": "o0", "x": 40, "y": 30, "offsetX": 5, "offsetY": 0 }],
//!     "lootTypes": [{ "name": "key", "file": "assets/key.obj", "value": 10 }]
//!   }]
//! }
//! ```
//!
//! Durations are in seconds.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dogstory_logic::geometry::GridPoint;
use dogstory_logic::loot::LootGeneratorConfig;
use dogstory_logic::roads::Road;
use serde::Deserialize;
use thiserror::Error;

use crate::game::{Game, GameError, GameSettings};
use crate::map::{
    Building, LootType, Map, MapBuilder, MapError, MapId, Office, OfficeId, Offset,
    DEFAULT_BAG_CAPACITY, DEFAULT_DOG_SPEED,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("map {map}: road #{index} must have exactly one of x1 or y1")]
    InvalidRoad { map: String, index: usize },
    #[error("{field} must be a non-negative number of seconds, got {value}")]
    InvalidDuration { field: &'static str, value: f64 },
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Game(#[from] GameError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameConfigDto {
    #[serde(default = "default_dog_speed")]
    default_dog_speed: f64,
    #[serde(default = "default_bag_capacity")]
    default_bag_capacity: usize,
    #[serde(default = "default_retirement_time")]
    dog_retirement_time: f64,
    #[serde(default)]
    loot_generator_config: Option<LootGeneratorDto>,
    maps: Vec<MapDto>,
}

fn default_dog_speed() -> f64 {
    DEFAULT_DOG_SPEED
}

fn default_bag_capacity() -> usize {
    DEFAULT_BAG_CAPACITY
}

fn default_retirement_time() -> f64 {
    60.0
}

#[derive(Debug, Deserialize)]
struct LootGeneratorDto {
    period: f64,
    probability: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapDto {
    id: String,
    name: String,
    dog_speed: Option<f64>,
    bag_capacity: Option<usize>,
    loot_generator_config: Option<LootGeneratorDto>,
    #[serde(default)]
    roads: Vec<RoadDto>,
    #[serde(default)]
    buildings: Vec<Building>,
    #[serde(default)]
    offices: Vec<OfficeDto>,
    #[serde(default)]
    loot_types: Vec<LootType>,
}

#[derive(Debug, Deserialize)]
struct RoadDto {
    x0: i32,
    y0: i32,
    x1: Option<i32>,
    y1: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfficeDto {
    id: String,
    x: i32,
    y: i32,
    #[serde(default)]
    offset_x: i32,
    #[serde(default)]
    offset_y: i32,
}

/// Parsed configuration: game settings plus validated maps.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub settings: GameSettings,
    pub maps: Vec<Map>,
}

impl GameConfig {
    /// Build a game with every map registered and no sessions.
    pub fn into_game(self) -> Result<Game, ConfigError> {
        let mut game = Game::new(self.settings);
        for map in self.maps {
            game.add_map(map)?;
        }
        Ok(game)
    }
}

pub fn load_config(path: &Path) -> Result<GameConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text)?;
    log::info!("Loaded {} maps from {}", config.maps.len(), path.display());
    Ok(config)
}

pub fn parse_config(json: &str) -> Result<GameConfig, ConfigError> {
    let dto: GameConfigDto = serde_json::from_str(json)?;

    let loot_generator = match &dto.loot_generator_config {
        Some(g) => generator_config(g)?,
        None => LootGeneratorConfig::default(),
    };
    let settings = GameSettings {
        loot_generator,
        dog_retirement_time: seconds("dogRetirementTime", dto.dog_retirement_time)?,
        ..GameSettings::default()
    };

    let maps = dto
        .maps
        .into_iter()
        .map(|m| build_map(m, dto.default_dog_speed, dto.default_bag_capacity))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GameConfig { settings, maps })
}

fn build_map(dto: MapDto, default_speed: f64, default_capacity: usize) -> Result<Map, ConfigError> {
    let mut builder = MapBuilder::new(MapId::new(dto.id.clone()), dto.name)
        .dog_speed(dto.dog_speed.unwrap_or(default_speed))
        .bag_capacity(dto.bag_capacity.unwrap_or(default_capacity));
    if let Some(g) = &dto.loot_generator_config {
        builder = builder.loot_generator(generator_config(g)?);
    }

    for (index, road) in dto.roads.iter().enumerate() {
        let start = GridPoint::new(road.x0, road.y0);
        let road = match (road.x1, road.y1) {
            (Some(x1), None) => Road::horizontal(start, x1),
            (None, Some(y1)) => Road::vertical(start, y1),
            _ => {
                return Err(ConfigError::InvalidRoad {
                    map: dto.id.clone(),
                    index,
                })
            }
        };
        builder = builder.road(road);
    }
    for building in dto.buildings {
        builder = builder.building(building);
    }
    for office in dto.offices {
        builder = builder.office(Office {
            id: OfficeId(office.id),
            position: GridPoint::new(office.x, office.y),
            offset: Offset {
                dx: office.offset_x,
                dy: office.offset_y,
            },
        });
    }
    for loot_type in dto.loot_types {
        builder = builder.loot_type(loot_type);
    }
    Ok(builder.build()?)
}

fn generator_config(dto: &LootGeneratorDto) -> Result<LootGeneratorConfig, ConfigError> {
    Ok(LootGeneratorConfig {
        period: seconds("lootGeneratorConfig.period", dto.period)?,
        probability: dto.probability.clamp(0.0, 1.0),
    })
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "defaultDogSpeed": 3.0,
        "dogRetirementTime": 15.0,
        "lootGeneratorConfig": { "period": 5.0, "probability": 0.5 },
        "maps": [
            {
                "id": "map1",
                "name": "Map 1",
                "roads": [
                    { "x0": 0, "y0": 0, "x1": 40 },
                    { "x0": 40, "y0": 0, "y1": 30 }
                ],
                "buildings": [{ "x": 5, "y": 5, "w": 30, "h": 20 }],
                "offices": [{ "id": "o0", "x": 40, "y": 30, "offsetX": 5, "offsetY": 0 }],
                "lootTypes": [
                    {
                        "name": "key", "file": "assets/key.obj", "type": "obj",
                        "rotation": 90, "value": 10
                    },
                    { "name": "wallet", "value": 30 }
                ]
            },
            {
                "id": "town",
                "name": "Town",
                "dogSpeed": 5.5,
                "bagCapacity": 1,
                "lootGeneratorConfig": { "period": 1.0, "probability": 0.9 },
                "roads": [{ "x0": 0, "y0": 0, "y1": 10 }],
                "lootTypes": [{ "value": 1 }]
            }
        ]
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(CONFIG).unwrap();
        assert_eq!(config.settings.dog_retirement_time, Duration::from_secs(15));
        assert_eq!(config.settings.loot_generator.period, Duration::from_secs(5));
        assert_eq!(config.settings.loot_generator.probability, 0.5);
        assert_eq!(config.maps.len(), 2);

        let map1 = &config.maps[0];
        assert_eq!(map1.dog_speed(), 3.0);
        assert_eq!(map1.bag_capacity(), DEFAULT_BAG_CAPACITY);
        assert_eq!(map1.roads().roads().len(), 2);
        assert!(map1.roads().roads()[1].is_vertical());
        assert_eq!(map1.offices()[0].offset, Offset { dx: 5, dy: 0 });
        assert_eq!(map1.buildings().len(), 1);
        assert_eq!(map1.loot_value(1), 30);
        assert!(map1.loot_generator().is_none());

        let town = &config.maps[1];
        assert_eq!(town.dog_speed(), 5.5);
        assert_eq!(town.bag_capacity(), 1);
        assert_eq!(
            town.loot_generator().map(|g| g.period),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_into_game_registers_maps() {
        let game = parse_config(CONFIG).unwrap().into_game().unwrap();
        assert_eq!(game.maps().len(), 2);
        assert!(game.find_map(&MapId::new("town")).is_some());
        assert!(game.sessions().is_empty());
    }

    #[test]
    fn test_road_needs_one_end() {
        let json = r#"{ "maps": [{ "id": "m", "name": "m",
            "roads": [{ "x0": 0, "y0": 0, "x1": 4, "y1": 4 }],
            "lootTypes": [{ "value": 1 }] }] }"#;
        assert!(matches!(
            parse_config(json),
            Err(ConfigError::InvalidRoad { index: 0, .. })
        ));
    }

    #[test]
    fn test_map_validation_surfaces() {
        let json = r#"{ "maps": [{ "id": "m", "name": "m",
            "roads": [{ "x0": 0, "y0": 0, "x1": 4 }] }] }"#;
        assert!(matches!(
            parse_config(json),
            Err(ConfigError::Map(MapError::NoLootTypes(_)))
        ));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let json = r#"{ "dogRetirementTime": -1.0, "maps": [] }"#;
        assert!(matches!(
            parse_config(json),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_duplicate_map_ids() {
        let json = r#"{ "maps": [
            { "id": "m", "name": "a", "roads": [{ "x0": 0, "y0": 0, "x1": 4 }],
              "lootTypes": [{ "value": 1 }] },
            { "id": "m", "name": "b", "roads": [{ "x0": 0, "y0": 0, "x1": 4 }],
              "lootTypes": [{ "value": 1 }] }
        ] }"#;
        let config = parse_config(json).unwrap();
        assert!(matches!(
            config.into_game(),
            Err(ConfigError::Game(GameError::DuplicateMap(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/dogstory/config.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
