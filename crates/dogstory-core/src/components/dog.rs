//! Dog components: identity, position, motion, bag, score and lifetime.

use std::fmt;
use std::time::Duration;

use dogstory_logic::geometry::{Point2D, Speed2D};
use serde::{Deserialize, Serialize};

use super::Loot;

/// Session-scoped dog id, issued monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DogId(pub u64);

impl fmt::Display for DogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a dog entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dog {
    pub id: DogId,
    pub name: String,
}

/// Where the dog is now and where it was at the start of the last tick.
/// The pair forms the swept segment used for gathering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub current: Point2D,
    pub previous: Point2D,
}

impl Position {
    pub fn at(point: Point2D) -> Self {
        Self {
            current: point,
            previous: point,
        }
    }
}

/// Facing direction. New dogs face north.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    North,
    South,
    West,
    East,
}

impl Direction {
    /// Single-letter form used by clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "U",
            Direction::South => "D",
            Direction::West => "L",
            Direction::East => "R",
        }
    }
}

/// Movement request from a player. Map y grows downward, so `Up` is -y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveCommand {
    Left,
    Right,
    Up,
    Down,
    Stand,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub velocity: Speed2D,
    pub direction: Direction,
}

impl Motion {
    /// Apply a move command at `speed`. Standing keeps the facing direction.
    pub fn apply(&mut self, command: MoveCommand, speed: f64) {
        let (velocity, direction) = match command {
            MoveCommand::Left => (Speed2D::new(-speed, 0.0), Direction::West),
            MoveCommand::Right => (Speed2D::new(speed, 0.0), Direction::East),
            MoveCommand::Up => (Speed2D::new(0.0, -speed), Direction::North),
            MoveCommand::Down => (Speed2D::new(0.0, speed), Direction::South),
            MoveCommand::Stand => (Speed2D::ZERO, self.direction),
        };
        self.velocity = velocity;
        self.direction = direction;
    }

    pub fn stop(&mut self) {
        self.velocity = Speed2D::ZERO;
    }
}

/// Items the dog carries. Capacity is a map property, enforced by the
/// gathering system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bag {
    pub items: Vec<Loot>,
}

impl Bag {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self, capacity: usize) -> bool {
        self.items.len() >= capacity
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub points: u64,
}

/// Time in session and the moment (on the same clock) the dog last moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    pub alive: Duration,
    pub last_moved: Duration,
}

impl Lifetime {
    pub fn idle(&self) -> Duration {
        self.alive.saturating_sub(self.last_moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_apply() {
        let mut motion = Motion::default();
        assert_eq!(motion.direction, Direction::North);

        motion.apply(MoveCommand::Right, 3.0);
        assert_eq!(motion.velocity, Speed2D::new(3.0, 0.0));
        assert_eq!(motion.direction, Direction::East);

        motion.apply(MoveCommand::Up, 3.0);
        assert_eq!(motion.velocity, Speed2D::new(0.0, -3.0));
        assert_eq!(motion.direction.as_str(), "U");

        motion.apply(MoveCommand::Stand, 3.0);
        assert!(motion.velocity.is_zero());
        assert_eq!(motion.direction, Direction::North);
    }

    #[test]
    fn test_bag_capacity() {
        let mut bag = Bag::default();
        assert!(bag.is_full(0));
        assert!(!bag.is_full(1));
        bag.items.push(Loot {
            id: crate::components::LootId(0),
            loot_type: 0,
            position: Point2D::ORIGIN,
        });
        assert!(bag.is_full(1));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_lifetime_idle() {
        let life = Lifetime {
            alive: Duration::from_secs(10),
            last_moved: Duration::from_secs(4),
        };
        assert_eq!(life.idle(), Duration::from_secs(6));
    }
}
