//! Pure simulation logic for Dog Story.
//!
//! This crate contains the algorithmic parts of the world simulation that are
//! independent of the ECS, persistence, or any runtime. Functions take plain
//! data and return results, making them unit-testable without a session.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`collision`] | Swept-segment gatherer/item collision events |
//! | [`geometry`] | 2-D points, vectors, speeds and grid cells |
//! | [`loot`] | Probabilistic loot spawn generator |
//! | [`roads`] | Road rectangles, cell index, movement clamping |

pub mod collision;
pub mod geometry;
pub mod loot;
pub mod roads;
