//! Loot spawn generator.
//!
//! Each tick the generator is asked how many new items to place. The model is
//! a discretised Poisson arrival: `probability` is the chance that one missing
//! item appears within `period`. Time without a spawn accumulates across ticks
//! and is forgiven as soon as something spawns.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Generator parameters, shared game-wide unless a map overrides them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootGeneratorConfig {
    /// Base interval the probability refers to.
    pub period: Duration,
    /// Chance in [0, 1] that a missing item spawns within one period.
    pub probability: f64,
}

impl Default for LootGeneratorConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            probability: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LootGenerator {
    period: Duration,
    probability: f64,
    time_without_loot: Duration,
}

impl LootGenerator {
    pub fn new(config: LootGeneratorConfig) -> Self {
        Self {
            period: config.period,
            probability: config.probability.clamp(0.0, 1.0),
            time_without_loot: Duration::ZERO,
        }
    }

    pub fn config(&self) -> LootGeneratorConfig {
        LootGeneratorConfig {
            period: self.period,
            probability: self.probability,
        }
    }

    /// Time accumulated since the last tick that spawned anything.
    pub fn time_without_loot(&self) -> Duration {
        self.time_without_loot
    }

    /// Number of items to spawn this tick.
    ///
    /// `random` must return a uniform value in [0, 1); it decides whether the
    /// fractional part of the expected count rounds up. Never exceeds the
    /// deficit `looter_count - loot_count`.
    pub fn generate(
        &mut self,
        time_delta: Duration,
        loot_count: usize,
        looter_count: usize,
        random: impl FnOnce() -> f64,
    ) -> usize {
        self.time_without_loot += time_delta;
        let shortage = looter_count.saturating_sub(loot_count);
        if shortage == 0 {
            return 0;
        }

        let expected = shortage as f64 * self.spawn_probability();
        let whole = expected.floor();
        let fraction = expected - whole;
        let mut generated = whole as usize;
        if fraction > 0.0 && random() < fraction {
            generated += 1;
        }
        let generated = generated.min(shortage);

        if generated > 0 {
            self.time_without_loot = Duration::ZERO;
        }
        generated
    }

    /// Chance that a single missing item has arrived over the accumulated time.
    fn spawn_probability(&self) -> f64 {
        if self.probability <= 0.0 {
            return 0.0;
        }
        if self.period.is_zero() {
            return 1.0;
        }
        let ratio = self.time_without_loot.as_secs_f64() / self.period.as_secs_f64();
        (1.0 - (1.0 - self.probability).powf(ratio)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(period_ms: u64, probability: f64) -> LootGenerator {
        LootGenerator::new(LootGeneratorConfig {
            period: Duration::from_millis(period_ms),
            probability,
        })
    }

    #[test]
    fn certain_spawn_fills_single_deficit() {
        let mut g = generator(1000, 1.0);
        assert_eq!(g.generate(Duration::from_secs(1), 0, 1, || 0.0), 1);
    }

    #[test]
    fn no_deficit_no_loot() {
        let mut g = generator(1000, 1.0);
        assert_eq!(g.generate(Duration::from_secs(10), 3, 3, || 0.0), 0);
        assert_eq!(g.generate(Duration::from_secs(10), 5, 3, || 0.0), 0);
    }

    #[test]
    fn never_exceeds_deficit() {
        let mut g = generator(1, 1.0);
        for looters in 0..20 {
            for loot in 0..20 {
                let n = g.generate(Duration::from_secs(100), loot, looters, || 0.0);
                assert!(n <= looters.saturating_sub(loot));
            }
        }
    }

    #[test]
    fn zero_probability_never_spawns() {
        let mut g = generator(1000, 0.0);
        assert_eq!(g.generate(Duration::from_secs(1000), 0, 10, || 0.0), 0);
    }

    #[test]
    fn fractional_expectation_rounds_by_random_source() {
        // p = 1 - 0.5^1 = 0.5, deficit 1 → expected 0.5
        let mut g = generator(1000, 0.5);
        assert_eq!(g.generate(Duration::from_secs(1), 0, 1, || 0.7), 0);

        let mut g = generator(1000, 0.5);
        assert_eq!(g.generate(Duration::from_secs(1), 0, 1, || 0.2), 1);
    }

    #[test]
    fn time_debt_accumulates_until_spawn() {
        let mut g = generator(1000, 0.5);
        assert_eq!(g.generate(Duration::from_millis(500), 0, 1, || 0.99), 0);
        assert_eq!(g.time_without_loot(), Duration::from_millis(500));
        assert_eq!(g.generate(Duration::from_millis(500), 0, 1, || 0.99), 0);
        assert_eq!(g.time_without_loot(), Duration::from_secs(1));
        // 2 periods accumulated: p = 0.75
        assert_eq!(g.generate(Duration::from_secs(1), 0, 1, || 0.5), 1);
        assert_eq!(g.time_without_loot(), Duration::ZERO);
    }

    #[test]
    fn long_run_average_matches_expectation() {
        let mut g = generator(1000, 0.5);
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut total = 0usize;
        let rounds = 10_000;
        for _ in 0..rounds {
            // tiny xorshift so the test is self-contained and deterministic
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let u = (state >> 11) as f64 / (1u64 << 53) as f64;
            total += g.generate(Duration::from_secs(1), 0, 1, || u);
            // force a fresh period each round regardless of outcome
            g.time_without_loot = Duration::ZERO;
        }
        let mean = total as f64 / rounds as f64;
        assert!((mean - 0.5).abs() < 0.03, "mean={mean}");
    }

    #[test]
    fn zero_period_means_immediate_spawn() {
        let mut g = generator(0, 0.25);
        assert_eq!(g.generate(Duration::from_millis(1), 0, 4, || 0.9), 4);
    }

    #[test]
    fn probability_is_clamped() {
        let g = generator(1000, 500.0);
        assert_eq!(g.config().probability, 1.0);
    }
}
