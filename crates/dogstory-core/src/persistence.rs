//! Save/Load functionality for persisting game state
//!
//! Uses bincode for compact binary serialization. Maps are static and are not
//! saved; each session refers to its map by id and is rebuilt against the
//! game's loaded maps on restore.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::time::Duration;

use dogstory_logic::geometry::{Point2D, Speed2D};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{Direction, DogId, Lifetime, Loot};
use crate::game::Game;
use crate::leaderboard::{Leaderboard, RetiredDog};
use crate::map::MapId;
use crate::session::{DogState, GameSession, SessionError};

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the whole game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Sessions in creation order
    pub sessions: Vec<SerializableSession>,
    /// Retired dogs
    pub leaderboard: Vec<RetiredDog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableSession {
    pub map_id: MapId,
    pub next_dog_id: u64,
    pub next_loot_id: u64,
    /// Free loot on the map
    pub loot: Vec<Loot>,
    pub dogs: Vec<SerializableDog>,
}

impl From<&GameSession> for SerializableSession {
    fn from(session: &GameSession) -> Self {
        Self {
            map_id: session.map_id().clone(),
            next_dog_id: session.next_dog_id(),
            next_loot_id: session.next_loot_id(),
            loot: session.loot(),
            dogs: session.dogs().iter().map(SerializableDog::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableDog {
    pub id: DogId,
    pub name: String,
    pub position: Point2D,
    pub previous_position: Point2D,
    pub velocity: Speed2D,
    pub direction: Direction,
    pub score: u64,
    pub bag: Vec<Loot>,
    pub alive: Duration,
    pub last_moved: Duration,
}

impl From<&DogState> for SerializableDog {
    fn from(dog: &DogState) -> Self {
        Self {
            id: dog.id,
            name: dog.name.clone(),
            position: dog.position,
            previous_position: dog.previous_position,
            velocity: dog.velocity,
            direction: dog.direction,
            score: dog.score,
            bag: dog.bag.clone(),
            alive: dog.lifetime.alive,
            last_moved: dog.lifetime.last_moved,
        }
    }
}

impl From<SerializableDog> for DogState {
    fn from(dog: SerializableDog) -> Self {
        Self {
            id: dog.id,
            name: dog.name,
            position: dog.position,
            previous_position: dog.previous_position,
            velocity: dog.velocity,
            direction: dog.direction,
            score: dog.score,
            bag: dog.bag,
            lifetime: Lifetime {
                alive: dog.alive,
                last_moved: dog.last_moved,
            },
        }
    }
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("saved session refers to unknown map {0}")]
    UnknownMap(MapId),
    #[error("map {0} has more than one saved session")]
    DuplicateSession(MapId),
    #[error("saved session on map {map_id} is inconsistent: {source}")]
    Corrupt {
        map_id: MapId,
        #[source]
        source: SessionError,
    },
}

/// Snapshot the game's sessions and leaderboard.
pub fn snapshot(game: &Game) -> SaveData {
    SaveData {
        version: SAVE_VERSION,
        sessions: game.sessions().iter().map(SerializableSession::from).collect(),
        leaderboard: game.leaderboard().records().to_vec(),
    }
}

/// Save the game to a writer
pub fn save_game<W: Write>(writer: W, game: &Game) -> Result<(), SaveError> {
    bincode::serialize_into(writer, &snapshot(game))?;
    Ok(())
}

/// Load saved state into `game`, replacing its sessions and leaderboard.
///
/// All-or-nothing: every session is rebuilt and validated before the game is
/// touched, so on error `game` keeps its previous state.
pub fn load_game<R: Read>(mut reader: R, game: &mut Game) -> Result<(), SaveError> {
    // Decode from memory: length prefixes are then checked against the bytes
    // actually present instead of being trusted for allocation.
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let save_data: SaveData = bincode::deserialize(&bytes)?;
    restore(save_data, game)
}

/// Apply an already-decoded snapshot to `game`, with the same all-or-nothing
/// guarantee as [`load_game`].
pub fn restore(save_data: SaveData, game: &mut Game) -> Result<(), SaveError> {
    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut seen = HashSet::new();
    let mut sessions = Vec::with_capacity(save_data.sessions.len());
    for saved in save_data.sessions {
        if !seen.insert(saved.map_id.clone()) {
            return Err(SaveError::DuplicateSession(saved.map_id));
        }
        sessions.push(restore_session(saved, game)?);
    }

    let dogs: usize = sessions.iter().map(GameSession::dog_count).sum();
    log::info!(
        "Restored {} sessions with {} dogs and {} retired records",
        sessions.len(),
        dogs,
        save_data.leaderboard.len()
    );
    game.replace_state(sessions, Leaderboard::from_records(save_data.leaderboard));
    Ok(())
}

fn restore_session(saved: SerializableSession, game: &Game) -> Result<GameSession, SaveError> {
    let map = game
        .find_map(&saved.map_id)
        .cloned()
        .ok_or_else(|| SaveError::UnknownMap(saved.map_id.clone()))?;
    let corrupt = |source| SaveError::Corrupt {
        map_id: saved.map_id.clone(),
        source,
    };

    let mut session = GameSession::new(map, game.settings());
    for dog in saved.dogs {
        session.restore_dog(dog.into()).map_err(corrupt)?;
    }
    for loot in saved.loot {
        session.restore_loot(loot).map_err(corrupt)?;
    }
    session
        .set_id_counters(saved.next_dog_id, saved.next_loot_id)
        .map_err(corrupt)?;
    Ok(session)
}
