//! Game session - one map's dogs and loot, and the per-tick pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use dogstory_logic::geometry::{Point2D, Speed2D};
use dogstory_logic::loot::LootGenerator;
use dogstory_logic::roads::RoadError;
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::components::*;
use crate::game::GameSettings;
use crate::leaderboard::RetiredDog;
use crate::map::{Map, MapId};
use crate::systems::*;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    RoadGraph(#[from] RoadError),
    #[error("{kind} id counter overflowed")]
    IdOverflow { kind: &'static str },
    #[error("dog name {0:?} is already taken")]
    DuplicateDogName(String),
    #[error("no dog with id {0}")]
    UnknownDog(DogId),
    #[error("dog id {0} is already in use")]
    DuplicateDogId(DogId),
    #[error("loot id {0} is already in use")]
    DuplicateLootId(LootId),
    #[error("dog {id} carries {carried} items but bag capacity is {capacity}")]
    BagOverCapacity {
        id: DogId,
        carried: usize,
        capacity: usize,
    },
    #[error("dog {0} is off the road network")]
    OffRoad(DogId),
    #[error("loot {0} is off the road network")]
    LootOffRoad(LootId),
    #[error("{kind} counter {counter} does not exceed issued id {issued}")]
    CounterBehind {
        kind: &'static str,
        counter: u64,
        issued: u64,
    },
}

/// Snapshot of one dog, for rendering and persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct DogState {
    pub id: DogId,
    pub name: String,
    pub position: Point2D,
    pub previous_position: Point2D,
    pub velocity: Speed2D,
    pub direction: Direction,
    pub score: u64,
    pub bag: Vec<Loot>,
    pub lifetime: Lifetime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub dogs: Vec<DogState>,
    pub loot: Vec<Loot>,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub moved: usize,
    pub spawned: usize,
    pub gathered: GatherReport,
    pub retired: Vec<RetiredDog>,
}

pub struct GameSession {
    map: Arc<Map>,
    world: World,
    /// Dog id → entity. hecs entities carry a generation, so a stale handle
    /// never aliases a respawned dog.
    dogs: HashMap<DogId, Entity>,
    names: HashMap<String, DogId>,
    next_dog_id: u64,
    next_loot_id: u64,
    loot_generator: LootGenerator,
    rng: StdRng,
    retirement_time: Duration,
    randomize_spawn_points: bool,
}

impl GameSession {
    pub fn new(map: Arc<Map>, settings: &GameSettings) -> Self {
        let generator = map.loot_generator().unwrap_or(settings.loot_generator);
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(session_seed(seed, map.id())),
            None => StdRng::from_entropy(),
        };
        log::info!("Session created for map {}", map.id());
        Self {
            map,
            world: World::new(),
            dogs: HashMap::new(),
            names: HashMap::new(),
            next_dog_id: 0,
            next_loot_id: 0,
            loot_generator: LootGenerator::new(generator),
            rng,
            retirement_time: settings.dog_retirement_time,
            randomize_spawn_points: settings.randomize_spawn_points,
        }
    }

    pub fn map(&self) -> &Arc<Map> {
        &self.map
    }

    pub fn map_id(&self) -> &MapId {
        self.map.id()
    }

    pub fn next_dog_id(&self) -> u64 {
        self.next_dog_id
    }

    pub fn next_loot_id(&self) -> u64 {
        self.next_loot_id
    }

    pub fn dog_count(&self) -> usize {
        self.dogs.len()
    }

    pub fn loot_count(&self) -> usize {
        self.world.query::<&Loot>().iter().count()
    }

    /// Add a new dog at a spawn point. Names are unique within a session.
    pub fn add_dog(&mut self, name: &str) -> Result<DogId, SessionError> {
        if self.names.contains_key(name) {
            return Err(SessionError::DuplicateDogName(name.to_string()));
        }
        let id = DogId(self.next_dog_id);
        self.next_dog_id = self
            .next_dog_id
            .checked_add(1)
            .ok_or(SessionError::IdOverflow { kind: "dog" })?;

        let spawn = self.spawn_point();
        self.insert_dog(
            Dog {
                id,
                name: name.to_string(),
            },
            Position::at(spawn),
            Motion::default(),
            Bag::default(),
            Score::default(),
            Lifetime::default(),
        );
        log::info!(
            "Dog {} ({}) joined map {} at ({:.2}, {:.2})",
            id,
            name,
            self.map.id(),
            spawn.x,
            spawn.y
        );
        Ok(id)
    }

    fn spawn_point(&mut self) -> Point2D {
        let roads = self.map.roads().roads();
        if self.randomize_spawn_points && !roads.is_empty() {
            let road = roads[self.rng.gen_range(0..roads.len())];
            road.point_at(self.rng.gen())
        } else {
            roads.first().map_or(Point2D::ORIGIN, |r| r.start().into())
        }
    }

    fn insert_dog(
        &mut self,
        dog: Dog,
        position: Position,
        motion: Motion,
        bag: Bag,
        score: Score,
        lifetime: Lifetime,
    ) {
        let id = dog.id;
        let name = dog.name.clone();
        let entity = self
            .world
            .spawn((dog, position, motion, bag, score, lifetime));
        self.dogs.insert(id, entity);
        self.names.insert(name, id);
    }

    /// Set a dog's velocity from a move command at the map's dog speed.
    pub fn move_dog(&mut self, id: DogId, command: MoveCommand) -> Result<(), SessionError> {
        let entity = *self.dogs.get(&id).ok_or(SessionError::UnknownDog(id))?;
        let motion = self
            .world
            .query_one_mut::<&mut Motion>(entity)
            .map_err(|_| SessionError::UnknownDog(id))?;
        motion.apply(command, self.map.dog_speed());
        Ok(())
    }

    pub fn dog(&self, id: DogId) -> Option<DogState> {
        let entity = *self.dogs.get(&id)?;
        self.dog_state(entity)
    }

    pub fn dog_by_name(&self, name: &str) -> Option<DogState> {
        self.names.get(name).and_then(|id| self.dog(*id))
    }

    /// All dogs, sorted by id.
    pub fn dogs(&self) -> Vec<DogState> {
        let mut ids: Vec<&DogId> = self.dogs.keys().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.dog(*id)).collect()
    }

    fn dog_state(&self, entity: Entity) -> Option<DogState> {
        let mut query = self
            .world
            .query_one::<(&Dog, &Position, &Motion, &Bag, &Score, &Lifetime)>(entity)
            .ok()?;
        let (dog, pos, motion, bag, score, lifetime) = query.get()?;
        Some(DogState {
            id: dog.id,
            name: dog.name.clone(),
            position: pos.current,
            previous_position: pos.previous,
            velocity: motion.velocity,
            direction: motion.direction,
            score: score.points,
            bag: bag.items.clone(),
            lifetime: *lifetime,
        })
    }

    /// Free loot, sorted by id.
    pub fn loot(&self) -> Vec<Loot> {
        let mut loot: Vec<Loot> = self.world.query::<&Loot>().iter().map(|(_, l)| *l).collect();
        loot.sort_by_key(|l| l.id);
        loot
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            dogs: self.dogs(),
            loot: self.loot(),
        }
    }

    /// Advance the session by `dt`: move, spawn, gather, retire.
    ///
    /// A road-graph or id-counter failure aborts the tick before any later
    /// phase runs.
    pub fn tick(&mut self, dt: Duration) -> Result<TickReport, SessionError> {
        let moved = movement_system(&mut self.world, self.map.roads(), dt)?;
        let spawned = spawn_loot_system(
            &mut self.world,
            &self.map,
            &mut self.loot_generator,
            &mut self.rng,
            &mut self.next_loot_id,
            dt,
        )?;
        let gathered = gathering_system(&mut self.world, &self.map);
        let retirements = retirement_system(&mut self.world, dt, &moved, self.retirement_time);

        let mut retired = Vec::with_capacity(retirements.len());
        for (id, record) in retirements {
            self.dogs.remove(&id);
            self.names.remove(&record.name);
            log::info!(
                "Dog {} ({}) retired from map {} with score {}",
                id,
                record.name,
                self.map.id(),
                record.score
            );
            retired.push(record);
        }

        if spawned > 0 || gathered.picked_up > 0 || gathered.delivered > 0 {
            log::debug!(
                "Map {}: spawned {}, picked up {}, delivered {} for {} points",
                self.map.id(),
                spawned,
                gathered.picked_up,
                gathered.delivered,
                gathered.points
            );
        }

        Ok(TickReport {
            moved: moved.len(),
            spawned,
            gathered,
            retired,
        })
    }

    // ── Restore hooks ──────────────────────────────────────────────────

    /// Insert a dog exactly as it was saved. Does not touch the id counters.
    pub fn restore_dog(&mut self, state: DogState) -> Result<(), SessionError> {
        if self.dogs.contains_key(&state.id) {
            return Err(SessionError::DuplicateDogId(state.id));
        }
        if self.names.contains_key(&state.name) {
            return Err(SessionError::DuplicateDogName(state.name));
        }
        let capacity = self.map.bag_capacity();
        if state.bag.len() > capacity {
            return Err(SessionError::BagOverCapacity {
                id: state.id,
                carried: state.bag.len(),
                capacity,
            });
        }
        let roads = self.map.roads();
        if !roads.contains(&state.position) || !roads.contains(&state.previous_position) {
            return Err(SessionError::OffRoad(state.id));
        }
        let mut in_use = self.loot_ids();
        if let Some(loot) = state.bag.iter().find(|l| !in_use.insert(l.id)) {
            return Err(SessionError::DuplicateLootId(loot.id));
        }

        self.insert_dog(
            Dog {
                id: state.id,
                name: state.name,
            },
            Position {
                current: state.position,
                previous: state.previous_position,
            },
            Motion {
                velocity: state.velocity,
                direction: state.direction,
            },
            Bag { items: state.bag },
            Score {
                points: state.score,
            },
            state.lifetime,
        );
        Ok(())
    }

    /// Put a saved free loot item back on the map.
    pub fn restore_loot(&mut self, loot: Loot) -> Result<(), SessionError> {
        if self.loot_ids().contains(&loot.id) {
            return Err(SessionError::DuplicateLootId(loot.id));
        }
        if !self.map.roads().contains(&loot.position) {
            return Err(SessionError::LootOffRoad(loot.id));
        }
        self.world.spawn((loot,));
        Ok(())
    }

    /// Resume the id counters. Both must be past every id already present.
    pub fn set_id_counters(
        &mut self,
        next_dog_id: u64,
        next_loot_id: u64,
    ) -> Result<(), SessionError> {
        if let Some(max) = self.dogs.keys().map(|id| id.0).max() {
            if next_dog_id <= max {
                return Err(SessionError::CounterBehind {
                    kind: "dog",
                    counter: next_dog_id,
                    issued: max,
                });
            }
        }
        if let Some(max) = self.loot_ids().into_iter().map(|id| id.0).max() {
            if next_loot_id <= max {
                return Err(SessionError::CounterBehind {
                    kind: "loot",
                    counter: next_loot_id,
                    issued: max,
                });
            }
        }
        self.next_dog_id = next_dog_id;
        self.next_loot_id = next_loot_id;
        Ok(())
    }

    /// Every loot id present in the session, on the ground or in a bag.
    fn loot_ids(&self) -> HashSet<LootId> {
        let mut ids: HashSet<LootId> = self
            .world
            .query::<&Loot>()
            .iter()
            .map(|(_, l)| l.id)
            .collect();
        for (_, bag) in self.world.query::<&Bag>().iter() {
            ids.extend(bag.items.iter().map(|l| l.id));
        }
        ids
    }
}

/// Per-session seed derived from the game seed and the map id, so sessions on
/// different maps do not share a random stream.
fn session_seed(seed: u64, map_id: &MapId) -> u64 {
    map_id
        .as_str()
        .bytes()
        .fold(seed.wrapping_mul(6364136223846793005), |h, b| {
            let mut h = h.wrapping_add(u64::from(b));
            h ^= h >> 33;
            h.wrapping_mul(0xff51afd7ed558ccd)
        })
}
