//! Dog Story Core - game-server simulation engine
//!
//! Dogs run along the roads of a map, pick up loot that spawns on the roads,
//! carry it to offices for points and retire to the leaderboard after idling
//! too long.
//!
//! # Architecture
//!
//! Each game session is an ECS world via `hecs`:
//! - **Entities**: dogs and loot items
//! - **Components**: pure data (Position, Motion, Bag, Score, Lifetime, Loot)
//! - **Systems**: movement, loot spawning, gathering, retirement, run in that
//!   order by [`session::GameSession::tick`]
//!
//! The pure algorithms (road clamping, loot generation, collision events) live
//! in `dogstory-logic`. A [`game::Game`] owns all maps, sessions and the
//! leaderboard; [`host::SimulationHost`] runs it on one thread and serializes
//! every access through a command channel.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`components`] | ECS component data for dogs and loot |
//! | [`config`] | JSON game configuration |
//! | [`game`] | Maps, sessions, leaderboard, tick observers |
//! | [`host`] | Single-threaded simulation host and its client |
//! | [`leaderboard`] | Retired dog records |
//! | [`map`] | Static map model |
//! | [`persistence`] | Binary save/load |
//! | [`session`] | One running map instance |
//! | [`state_file`] | Periodic state file snapshots and restore |
//! | [`systems`] | Per-tick ECS systems |
//!
//! # Example
//!
//! ```rust,no_run
//! use dogstory_core::prelude::*;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let mut game = load_config(Path::new("data/config.json"))?.into_game()?;
//! let map = MapId::new("map1");
//! let joined = game.join(&map, "Rex")?;
//! game.move_dog(&map, joined.dog_id, MoveCommand::Right)?;
//! game.tick(Duration::from_millis(50))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod components;
pub mod config;
pub mod game;
pub mod host;
pub mod leaderboard;
pub mod map;
pub mod persistence;
pub mod session;
pub mod state_file;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{load_config, parse_config, ConfigError, GameConfig};
    pub use crate::game::{Game, GameError, GameSettings, JoinInfo, TickObserver};
    pub use crate::host::{HostConfig, HostError, SimulationClient, SimulationHost};
    pub use crate::leaderboard::{Leaderboard, RetiredDog};
    pub use crate::map::{Map, MapBuilder, MapId};
    pub use crate::persistence::SaveError;
    pub use crate::session::{DogState, GameSession, SessionError, SessionState};
    pub use crate::state_file::{restore_or_fresh, RestoreOutcome, StateFile};
}
