//! Swept-segment collision detection between moving gatherers and stationary
//! items.
//!
//! A gatherer is the path a dog covered during one tick (previous → current
//! position). For every gatherer/item pair the item is projected onto that
//! path; the projection ratio doubles as the moment within the tick at which
//! the closest approach happens, so sorting by it replays pickups in the order
//! they actually occurred.

use crate::geometry::Point2D;

/// One moving collector: the segment swept this tick plus its half-width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gatherer {
    pub start: Point2D,
    pub end: Point2D,
    pub width: f64,
}

impl Gatherer {
    pub fn is_stationary(&self) -> bool {
        self.start == self.end
    }
}

/// A stationary target (loot or office).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub position: Point2D,
    pub width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionResult {
    /// Squared distance from the item to its projection on the segment's line.
    pub sq_distance: f64,
    /// Position of the projection along the segment: 0 at start, 1 at end.
    pub proj_ratio: f64,
}

impl CollectionResult {
    pub fn is_collected(&self, collect_radius: f64) -> bool {
        (0.0..=1.0).contains(&self.proj_ratio)
            && self.sq_distance <= collect_radius * collect_radius
    }
}

/// Project `c` onto the segment `a → b`.
///
/// A zero-length segment reports the point-to-point distance with ratio 0.
pub fn try_collect_point(a: Point2D, b: Point2D, c: Point2D) -> CollectionResult {
    let u = c - a;
    let v = b - a;
    let v_len2 = v.length_squared();
    if v_len2 == 0.0 {
        return CollectionResult {
            sq_distance: u.length_squared(),
            proj_ratio: 0.0,
        };
    }

    let u_dot_v = u.dot(&v);
    let proj_ratio = u_dot_v / v_len2;
    // cancellation can push this a hair below zero
    let sq_distance = (u.length_squared() - u_dot_v * u_dot_v / v_len2).max(0.0);
    CollectionResult {
        sq_distance,
        proj_ratio,
    }
}

/// One gatherer/item pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatheringEvent {
    pub item_id: usize,
    pub gatherer_id: usize,
    pub sq_distance: f64,
    /// Projection ratio; chronological order within the tick.
    pub time: f64,
    pub collect_radius: f64,
}

impl GatheringEvent {
    pub fn is_collected(&self) -> bool {
        (0.0..=1.0).contains(&self.time)
            && self.sq_distance <= self.collect_radius * self.collect_radius
    }
}

/// Every gatherer/item pair, sorted by `time` ascending.
///
/// Ids are indices into the input slices. The sort is stable, so events that
/// share a time stay in gatherer-major, item-minor order.
pub fn find_gather_events(gatherers: &[Gatherer], items: &[Item]) -> Vec<GatheringEvent> {
    let mut events = Vec::with_capacity(gatherers.len() * items.len());

    for (gatherer_id, gatherer) in gatherers.iter().enumerate() {
        for (item_id, item) in items.iter().enumerate() {
            let collect_radius = gatherer.width + item.width;
            let result = try_collect_point(gatherer.start, gatherer.end, item.position);
            let time = if gatherer.is_stationary() && !result.is_collected(collect_radius) {
                f64::INFINITY
            } else {
                result.proj_ratio
            };
            events.push(GatheringEvent {
                item_id,
                gatherer_id,
                sq_distance: result.sq_distance,
                time,
                collect_radius,
            });
        }
    }

    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}
