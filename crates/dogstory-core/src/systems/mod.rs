//! Systems - logic that operates on components
//!
//! One system per tick phase, run by `GameSession::tick` in this order:
//! movement → spawn → gathering → retirement.

mod gathering;
mod movement;
mod retirement;
mod spawn;

pub use gathering::*;
pub use movement::*;
pub use retirement::*;
pub use spawn::*;
