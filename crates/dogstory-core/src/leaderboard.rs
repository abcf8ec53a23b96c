//! Retired-dog records.

use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Final record of a dog removed for idleness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetiredDog {
    pub name: String,
    pub score: u64,
    pub play_time: Duration,
}

/// Best score first; ties go to the shorter play time, then by name.
fn rank(a: &RetiredDog, b: &RetiredDog) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(a.play_time.cmp(&b.play_time))
        .then_with(|| a.name.cmp(&b.name))
}

/// Records kept in rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaderboard {
    records: Vec<RetiredDog>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(mut records: Vec<RetiredDog>) -> Self {
        records.sort_by(rank);
        Self { records }
    }

    pub fn record(&mut self, dog: RetiredDog) {
        let at = self
            .records
            .partition_point(|r| rank(r, &dog) != Ordering::Greater);
        self.records.insert(at, dog);
    }

    pub fn records(&self) -> &[RetiredDog] {
        &self.records
    }

    /// Up to `max_items` records starting at offset `start`.
    pub fn page(&self, start: usize, max_items: usize) -> &[RetiredDog] {
        let start = start.min(self.records.len());
        let end = start.saturating_add(max_items).min(self.records.len());
        &self.records[start..end]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Extend<RetiredDog> for Leaderboard {
    fn extend<I: IntoIterator<Item = RetiredDog>>(&mut self, iter: I) {
        for dog in iter {
            self.record(dog);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, score: u64, secs: u64) -> RetiredDog {
        RetiredDog {
            name: name.to_string(),
            score,
            play_time: Duration::from_secs(secs),
        }
    }

    fn names(records: &[RetiredDog]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_rank_order() {
        let mut board = Leaderboard::new();
        board.extend([
            rec("slow", 10, 100),
            rec("low", 1, 5),
            rec("fast", 10, 50),
            rec("best", 30, 500),
            rec("also_fast", 10, 50),
        ]);
        assert_eq!(
            names(board.records()),
            vec!["best", "also_fast", "fast", "slow", "low"]
        );
    }

    #[test]
    fn test_from_records_sorts() {
        let board = Leaderboard::from_records(vec![rec("b", 1, 1), rec("a", 2, 1)]);
        assert_eq!(names(board.records()), vec!["a", "b"]);
    }

    #[test]
    fn test_paging() {
        let board =
            Leaderboard::from_records((0..10).map(|i| rec(&format!("d{i}"), i, 1)).collect());
        assert_eq!(names(board.page(0, 3)), vec!["d9", "d8", "d7"]);
        assert_eq!(names(board.page(8, 5)), vec!["d1", "d0"]);
        assert!(board.page(10, 5).is_empty());
        assert!(board.page(50, 5).is_empty());
        assert!(board.page(2, 0).is_empty());
        assert_eq!(board.page(0, usize::MAX).len(), 10);
    }
}
