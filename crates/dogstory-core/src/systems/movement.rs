//! Movement system - advances dogs along the road network

use std::time::Duration;

use dogstory_logic::roads::{RoadError, RoadNetwork};
use hecs::World;

use crate::components::{Dog, DogId, Motion, Position};

/// Move every dog by `velocity * dt`, clamped to the roads.
///
/// `previous` is set to the pre-move position for every dog, including those
/// standing still, so gathering sees this tick's segment. A dog whose move was
/// cut short by a road edge stops.
///
/// Returns the ids of dogs that had a non-zero velocity, sorted. On error no
/// dog has been moved.
pub fn movement_system(
    world: &mut World,
    roads: &RoadNetwork,
    dt: Duration,
) -> Result<Vec<DogId>, RoadError> {
    let seconds = dt.as_secs_f64();

    // Collect updates first so a failure leaves the world untouched
    let mut updates = Vec::new();
    for (entity, (dog, pos, motion)) in world.query::<(&Dog, &Position, &Motion)>().iter() {
        if motion.velocity.is_zero() {
            updates.push((entity, None));
            continue;
        }
        let target = pos.current + motion.velocity.displacement(seconds);
        let reached = roads.clamp_move(pos.current, target)?;
        updates.push((entity, Some((dog.id, reached, reached != target))));
    }

    let mut moved = Vec::new();
    for (entity, update) in updates {
        let Ok((pos, motion)) = world.query_one_mut::<(&mut Position, &mut Motion)>(entity) else {
            continue;
        };
        pos.previous = pos.current;
        if let Some((id, reached, blocked)) = update {
            pos.current = reached;
            if blocked {
                motion.stop();
            }
            moved.push(id);
        }
    }
    moved.sort();
    Ok(moved)
}
