//! Retirement system - lifetime tracking and idle eviction

use std::time::Duration;

use hecs::World;

use crate::components::{Dog, DogId, Lifetime, Score};
use crate::leaderboard::RetiredDog;

/// Advance every dog's lifetime by `dt` and retire those idle for longer than
/// `threshold`.
///
/// `moved` lists the dogs that had a non-zero velocity this tick (sorted);
/// their idle clock restarts. Retired dogs are despawned and returned in id
/// order with their final record.
pub fn retirement_system(
    world: &mut World,
    dt: Duration,
    moved: &[DogId],
    threshold: Duration,
) -> Vec<(DogId, RetiredDog)> {
    let mut retired = Vec::new();

    for (entity, (dog, score, lifetime)) in world.query_mut::<(&Dog, &Score, &mut Lifetime)>() {
        lifetime.alive += dt;
        if moved.binary_search(&dog.id).is_ok() {
            lifetime.last_moved = lifetime.alive;
        }
        if lifetime.idle() > threshold {
            retired.push((
                entity,
                dog.id,
                RetiredDog {
                    name: dog.name.clone(),
                    score: score.points,
                    play_time: lifetime.alive,
                },
            ));
        }
    }

    retired.sort_by_key(|(_, id, _)| *id);
    retired
        .into_iter()
        .map(|(entity, id, record)| {
            let _ = world.despawn(entity);
            (id, record)
        })
        .collect()
}
