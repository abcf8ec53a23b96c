//! Loot spawn system - tops up free loot through the map's generator

use std::ops::Range;
use std::time::Duration;

use dogstory_logic::loot::LootGenerator;
use hecs::World;
use rand::Rng;

use crate::components::{Dog, Loot, LootId};
use crate::map::Map;
use crate::session::SessionError;

/// Spawn as many items as the generator asks for this tick, each on a random
/// road at a random point with a random type.
///
/// `next_loot_id` is the session's loot counter. Returns the number spawned.
/// Ids are reserved before anything spawns, so on error the world, the
/// counter and the generator are unchanged.
pub fn spawn_loot_system<R: Rng>(
    world: &mut World,
    map: &Map,
    generator: &mut LootGenerator,
    rng: &mut R,
    next_loot_id: &mut u64,
    dt: Duration,
) -> Result<usize, SessionError> {
    let loot_count = world.query::<&Loot>().iter().count();
    let looter_count = world.query::<&Dog>().iter().count();

    let roll: f64 = rng.gen();
    let before = generator.clone();
    let count = generator.generate(dt, loot_count, looter_count, || roll);

    let roads = map.roads().roads();
    let loot_types = map.loot_types().len();
    if roads.is_empty() || loot_types == 0 {
        return Ok(0);
    }

    let ids = match reserve_loot_ids(next_loot_id, count) {
        Ok(ids) => ids,
        Err(e) => {
            *generator = before;
            return Err(e);
        }
    };
    for id in ids {
        let road = &roads[rng.gen_range(0..roads.len())];
        let loot = Loot {
            id: LootId(id),
            loot_type: rng.gen_range(0..loot_types),
            position: road.point_at(rng.gen()),
        };
        world.spawn((loot,));
    }
    Ok(count)
}

/// Take `count` consecutive ids from the counter, or none at all.
fn reserve_loot_ids(next: &mut u64, count: usize) -> Result<Range<u64>, SessionError> {
    let start = *next;
    let end = u64::try_from(count)
        .ok()
        .and_then(|count| start.checked_add(count))
        .ok_or(SessionError::IdOverflow { kind: "loot" })?;
    *next = end;
    Ok(start..end)
}
