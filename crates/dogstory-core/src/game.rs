//! Game - maps, their sessions, the leaderboard and tick observers.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use dogstory_logic::loot::LootGeneratorConfig;
use thiserror::Error;

use crate::components::{DogId, MoveCommand};
use crate::leaderboard::{Leaderboard, RetiredDog};
use crate::map::{Map, MapId};
use crate::persistence::{self, SaveError};
use crate::session::{GameSession, SessionError, SessionState};

pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Game-wide runtime settings, shared by every session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    /// Used by maps without their own generator config
    pub loot_generator: LootGeneratorConfig,
    /// Idle time after which a dog is retired
    pub dog_retirement_time: Duration,
    /// Spawn new dogs at a random road point instead of the first road's start
    pub randomize_spawn_points: bool,
    /// Seed for every session's random stream; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            loot_generator: LootGeneratorConfig::default(),
            dog_retirement_time: Duration::from_secs(60),
            randomize_spawn_points: false,
            seed: None,
        }
    }
}

/// Hook run after every [`Game::tick`], with the game already advanced.
pub trait TickObserver: Send {
    fn on_tick(&mut self, game: &Game, dt: Duration) -> Result<(), ObserverError>;

    /// Called once from [`Game::shutdown`].
    fn on_shutdown(&mut self, _game: &Game) -> Result<(), ObserverError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Error)]
pub enum GameError {
    #[error("map {0} not found")]
    MapNotFound(MapId),
    #[error("map {0} is already registered")]
    DuplicateMap(MapId),
    #[error("session on map {map_id}: {source}")]
    Session {
        map_id: MapId,
        #[source]
        source: SessionError,
    },
    #[error("tick observer failed: {0}")]
    Observer(#[source] ObserverError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinInfo {
    pub map_id: MapId,
    pub dog_id: DogId,
}

pub struct Game {
    settings: GameSettings,
    maps: Vec<Arc<Map>>,
    map_index: HashMap<MapId, usize>,
    sessions: Vec<GameSession>,
    session_index: HashMap<MapId, usize>,
    leaderboard: Leaderboard,
    observers: Vec<(ObserverId, Box<dyn TickObserver>)>,
    next_observer_id: u64,
}

impl Game {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            settings,
            maps: Vec::new(),
            map_index: HashMap::new(),
            sessions: Vec::new(),
            session_index: HashMap::new(),
            leaderboard: Leaderboard::new(),
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    // ── Maps ───────────────────────────────────────────────────────────

    pub fn add_map(&mut self, map: Map) -> Result<(), GameError> {
        if self.map_index.contains_key(map.id()) {
            return Err(GameError::DuplicateMap(map.id().clone()));
        }
        self.map_index.insert(map.id().clone(), self.maps.len());
        self.maps.push(Arc::new(map));
        Ok(())
    }

    pub fn find_map(&self, id: &MapId) -> Option<&Arc<Map>> {
        self.map_index.get(id).map(|&i| &self.maps[i])
    }

    pub fn maps(&self) -> &[Arc<Map>] {
        &self.maps
    }

    // ── Sessions ───────────────────────────────────────────────────────

    pub fn find_session(&self, map_id: &MapId) -> Option<&GameSession> {
        self.session_index.get(map_id).map(|&i| &self.sessions[i])
    }

    pub fn find_session_mut(&mut self, map_id: &MapId) -> Option<&mut GameSession> {
        let idx = *self.session_index.get(map_id)?;
        Some(&mut self.sessions[idx])
    }

    /// Session for `map_id`, created on first use.
    pub fn add_session(&mut self, map_id: &MapId) -> Result<&mut GameSession, GameError> {
        let idx = match self.session_index.get(map_id) {
            Some(&idx) => idx,
            None => {
                let map = self
                    .find_map(map_id)
                    .cloned()
                    .ok_or_else(|| GameError::MapNotFound(map_id.clone()))?;
                let session = GameSession::new(map, &self.settings);
                self.insert_session(session)
            }
        };
        Ok(&mut self.sessions[idx])
    }

    fn insert_session(&mut self, session: GameSession) -> usize {
        let idx = self.sessions.len();
        self.session_index.insert(session.map_id().clone(), idx);
        self.sessions.push(session);
        idx
    }

    /// Sessions in creation order
    pub fn sessions(&self) -> &[GameSession] {
        &self.sessions
    }

    /// Join `name` to the session on `map_id`, creating the session if needed.
    pub fn join(&mut self, map_id: &MapId, name: &str) -> Result<JoinInfo, GameError> {
        let session = self.add_session(map_id)?;
        let dog_id = session.add_dog(name).map_err(|source| GameError::Session {
            map_id: map_id.clone(),
            source,
        })?;
        Ok(JoinInfo {
            map_id: map_id.clone(),
            dog_id,
        })
    }

    pub fn move_dog(
        &mut self,
        map_id: &MapId,
        dog_id: DogId,
        command: MoveCommand,
    ) -> Result<(), GameError> {
        let session = self
            .find_session_mut(map_id)
            .ok_or_else(|| GameError::MapNotFound(map_id.clone()))?;
        session.move_dog(dog_id, command).map_err(|source| GameError::Session {
            map_id: map_id.clone(),
            source,
        })
    }

    pub fn state(&self, map_id: &MapId) -> Option<SessionState> {
        self.find_session(map_id).map(GameSession::state)
    }

    // ── Tick ───────────────────────────────────────────────────────────

    /// Advance every session by `dt`, then notify observers.
    ///
    /// A failing session does not stop the others; the first failure (session
    /// or observer) is returned after everything has run.
    pub fn tick(&mut self, dt: Duration) -> Result<(), GameError> {
        let mut first_error = None;

        for session in &mut self.sessions {
            match session.tick(dt) {
                Ok(report) => self.leaderboard.extend(report.retired),
                Err(source) => {
                    log::error!("Tick failed on map {}: {}", session.map_id(), source);
                    if first_error.is_none() {
                        first_error = Some(GameError::Session {
                            map_id: session.map_id().clone(),
                            source,
                        });
                    }
                }
            }
        }

        let observed = self.notify(|observer, game| observer.on_tick(game, dt));
        match first_error {
            Some(err) => Err(err),
            None => observed,
        }
    }

    /// Run every observer's shutdown hook (final save and similar).
    pub fn shutdown(&mut self) -> Result<(), GameError> {
        log::info!("Game shutting down");
        self.notify(|observer, game| observer.on_shutdown(game))
    }

    fn notify<F>(&mut self, mut f: F) -> Result<(), GameError>
    where
        F: FnMut(&mut Box<dyn TickObserver>, &Game) -> Result<(), ObserverError>,
    {
        let mut observers = std::mem::take(&mut self.observers);
        let mut result = Ok(());
        for (_, observer) in observers.iter_mut() {
            if let Err(e) = f(observer, self) {
                log::error!("Tick observer failed: {}", e);
                if result.is_ok() {
                    result = Err(GameError::Observer(e));
                }
            }
        }
        self.observers = observers;
        result
    }

    pub fn add_observer(&mut self, observer: Box<dyn TickObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> Option<Box<dyn TickObserver>> {
        let idx = self.observers.iter().position(|(oid, _)| *oid == id)?;
        Some(self.observers.remove(idx).1)
    }

    // ── Leaderboard ────────────────────────────────────────────────────

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// Retired-dog records at offsets `[start, start + max_items)`.
    pub fn records(&self, start: usize, max_items: usize) -> &[RetiredDog] {
        self.leaderboard.page(start, max_items)
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Save all sessions and the leaderboard to a writer
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        persistence::save_game(writer, self)
    }

    /// Replace sessions and leaderboard with a saved state. On error the game
    /// is left untouched.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), SaveError> {
        persistence::load_game(reader, self)
    }

    pub(crate) fn replace_state(&mut self, sessions: Vec<GameSession>, leaderboard: Leaderboard) {
        self.sessions.clear();
        self.session_index.clear();
        for session in sessions {
            self.insert_session(session);
        }
        self.leaderboard = leaderboard;
    }
}
