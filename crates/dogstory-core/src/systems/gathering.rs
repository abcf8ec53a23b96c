//! Gathering system - loot pickup and office delivery

use dogstory_logic::collision::{find_gather_events, Gatherer, Item};
use hecs::{Entity, World};

use crate::components::{Bag, Dog, DogId, Loot, Position, Score};
use crate::map::Map;

/// Half-width of a dog for collision purposes
pub const DOG_WIDTH: f64 = 0.3;
pub const LOOT_WIDTH: f64 = 0.0;
pub const OFFICE_WIDTH: f64 = 0.25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatherReport {
    pub picked_up: usize,
    pub delivered: usize,
    pub points: u64,
}

/// Resolve this tick's pickups and deliveries in the order they happened
/// along each dog's path.
///
/// Items are free loot (sorted by id) followed by the map's offices; an item
/// index at or past the loot count is an office. A pickup is skipped when the
/// bag is full or the loot was already taken earlier in the tick. Reaching an
/// office empties the bag into the dog's score.
pub fn gathering_system(world: &mut World, map: &Map) -> GatherReport {
    let mut dogs: Vec<(Entity, DogId, Position)> = world
        .query::<(&Dog, &Position)>()
        .iter()
        .map(|(e, (dog, pos))| (e, dog.id, *pos))
        .collect();
    dogs.sort_by_key(|(_, id, _)| *id);

    let mut loot: Vec<(Entity, Loot)> = world
        .query::<&Loot>()
        .iter()
        .map(|(e, loot)| (e, *loot))
        .collect();
    loot.sort_by_key(|(_, l)| l.id);

    let gatherers: Vec<Gatherer> = dogs
        .iter()
        .map(|(_, _, pos)| Gatherer {
            start: pos.previous,
            end: pos.current,
            width: DOG_WIDTH,
        })
        .collect();
    let items: Vec<Item> = loot
        .iter()
        .map(|(_, l)| Item {
            position: l.position,
            width: LOOT_WIDTH,
        })
        .chain(map.offices().iter().map(|office| Item {
            position: office.position.into(),
            width: OFFICE_WIDTH,
        }))
        .collect();

    let mut report = GatherReport::default();
    let mut taken = vec![false; loot.len()];
    let capacity = map.bag_capacity();

    for event in find_gather_events(&gatherers, &items) {
        if !event.is_collected() {
            continue;
        }
        let dog_entity = dogs[event.gatherer_id].0;
        let Ok((bag, score)) = world.query_one_mut::<(&mut Bag, &mut Score)>(dog_entity) else {
            continue;
        };

        if event.item_id < loot.len() {
            if taken[event.item_id] || bag.is_full(capacity) {
                continue;
            }
            taken[event.item_id] = true;
            bag.items.push(loot[event.item_id].1);
            report.picked_up += 1;
        } else if !bag.is_empty() {
            let points: u64 = bag.items.iter().map(|l| map.loot_value(l.loot_type)).sum();
            score.points += points;
            report.points += points;
            report.delivered += bag.items.len();
            bag.items.clear();
        }
    }

    for ((entity, _), taken) in loot.iter().zip(taken) {
        if taken {
            let _ = world.despawn(*entity);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::LootId;
    use crate::map::{LootType, MapBuilder, MapId, Office, OfficeId, Offset};
    use dogstory_logic::geometry::{GridPoint, Point2D};
    use dogstory_logic::roads::Road;

    fn map(capacity: usize) -> Map {
        MapBuilder::new(MapId::new("m"), "m")
            .road(Road::horizontal(GridPoint::new(0, 0), 20))
            .office(Office {
                id: OfficeId("o".into()),
                position: GridPoint::new(10, 0),
                offset: Offset::default(),
            })
            .loot_type(LootType::with_value(1))
            .loot_type(LootType::with_value(2))
            .bag_capacity(capacity)
            .build()
            .unwrap()
    }

    fn dog(world: &mut World, id: u64, from: f64, to: f64, bag: Vec<Loot>) -> Entity {
        world.spawn((
            Dog {
                id: DogId(id),
                name: format!("d{id}"),
            },
            Position {
                current: Point2D::new(to, 0.0),
                previous: Point2D::new(from, 0.0),
            },
            Bag { items: bag },
            Score::default(),
        ))
    }

    fn loot(world: &mut World, id: u64, loot_type: usize, x: f64) -> Loot {
        let l = Loot {
            id: LootId(id),
            loot_type,
            position: Point2D::new(x, 0.0),
        };
        world.spawn((l,));
        l
    }

    fn free_loot(world: &World) -> usize {
        world.query::<&Loot>().iter().count()
    }

    #[test]
    fn test_pickup_moves_loot_into_bag() {
        let map = map(3);
        let mut world = World::new();
        let d = dog(&mut world, 0, 0.0, 5.0, vec![]);
        let l = loot(&mut world, 0, 1, 2.0);

        let report = gathering_system(&mut world, &map);
        assert_eq!(report.picked_up, 1);
        assert_eq!(world.get::<&Bag>(d).unwrap().items, vec![l]);
        assert_eq!(free_loot(&world), 0);
    }

    #[test]
    fn test_full_bag_skips_pickup() {
        let map = map(1);
        let mut world = World::new();
        let d = dog(&mut world, 0, 0.0, 5.0, vec![]);
        loot(&mut world, 0, 0, 1.0);
        loot(&mut world, 1, 0, 2.0);

        let report = gathering_system(&mut world, &map);
        assert_eq!(report.picked_up, 1);
        assert_eq!(world.get::<&Bag>(d).unwrap().items[0].id, LootId(0));
        assert_eq!(free_loot(&world), 1);
    }

    #[test]
    fn test_office_delivery_scores_bag() {
        let map = map(3);
        let mut world = World::new();
        let carried = vec![
            Loot {
                id: LootId(7),
                loot_type: 0,
                position: Point2D::ORIGIN,
            },
            Loot {
                id: LootId(8),
                loot_type: 1,
                position: Point2D::ORIGIN,
            },
        ];
        let d = dog(&mut world, 0, 8.0, 12.0, carried);

        let report = gathering_system(&mut world, &map);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.points, 3);
        assert_eq!(world.get::<&Score>(d).unwrap().points, 3);
        assert!(world.get::<&Bag>(d).unwrap().is_empty());
    }

    #[test]
    fn test_events_apply_in_path_order() {
        // full bag, office at 10, loot at 12: deliver first, then pick up
        let map = map(1);
        let mut world = World::new();
        let carried = vec![Loot {
            id: LootId(1),
            loot_type: 1,
            position: Point2D::ORIGIN,
        }];
        let d = dog(&mut world, 0, 8.0, 14.0, carried);
        loot(&mut world, 2, 0, 12.0);

        let report = gathering_system(&mut world, &map);
        assert_eq!(report.points, 2);
        assert_eq!(report.picked_up, 1);
        let bag = world.get::<&Bag>(d).unwrap();
        assert_eq!(bag.items.len(), 1);
        assert_eq!(bag.items[0].id, LootId(2));
    }

    #[test]
    fn test_loot_taken_once() {
        let map = map(3);
        let mut world = World::new();
        let a = dog(&mut world, 0, 0.0, 4.0, vec![]);
        let b = dog(&mut world, 1, 4.0, 0.0, vec![]);
        loot(&mut world, 0, 0, 1.0);

        let report = gathering_system(&mut world, &map);
        assert_eq!(report.picked_up, 1);
        let total = world.get::<&Bag>(a).unwrap().len() + world.get::<&Bag>(b).unwrap().len();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_standing_dog_on_loot_collects() {
        let map = map(3);
        let mut world = World::new();
        let d = dog(&mut world, 0, 3.0, 3.0, vec![]);
        loot(&mut world, 0, 0, 3.1);

        gathering_system(&mut world, &map);
        assert_eq!(world.get::<&Bag>(d).unwrap().len(), 1);
    }
}
