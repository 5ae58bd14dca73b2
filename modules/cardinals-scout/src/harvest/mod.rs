//! Harvesters: turn keyword lists into curated rows via the search adapter.

pub mod experts;
pub mod section;

use std::time::Duration;

use rand::Rng;

use cardinals_common::HarvestConfig;

pub use experts::{parse_name_role, ExpertHarvester, NameRole};
pub use section::{SectionHarvester, SectionPlan};

/// Rows accepted by one harvest pass, plus the provider queries it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestBatch<T> {
    pub rows: Vec<T>,
    pub queries: u32,
}

/// Politeness delay between provider queries: a fixed base plus uniform jitter.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    base: Duration,
    jitter_ms: u64,
}

impl Pacer {
    pub fn new(base: Duration, jitter_ms: u64) -> Self {
        Self { base, jitter_ms }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(Duration::from_millis(config.polite_delay_ms), config.jitter_ms)
    }

    /// No delay at all. Tests and replays.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    pub fn next_delay(&self) -> Duration {
        if self.jitter_ms == 0 {
            return self.base;
        }
        let jitter = rand::rng().random_range(0..=self.jitter_ms);
        self.base + Duration::from_millis(jitter)
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_stays_within_base_plus_jitter() {
        let pacer = Pacer::new(Duration::from_millis(250), 150);
        for _ in 0..50 {
            let d = pacer.next_delay();
            assert!(d >= Duration::from_millis(250));
            assert!(d <= Duration::from_millis(400));
        }
    }

    #[test]
    fn zero_jitter_is_exactly_base() {
        let pacer = Pacer::new(Duration::from_millis(10), 0);
        assert_eq!(pacer.next_delay(), Duration::from_millis(10));
        assert_eq!(Pacer::none().next_delay(), Duration::ZERO);
    }

    #[test]
    fn from_config_uses_harvest_knobs() {
        let config = HarvestConfig {
            polite_delay_ms: 0,
            jitter_ms: 0,
            ..Default::default()
        };
        assert_eq!(Pacer::from_config(&config).next_delay(), Duration::ZERO);
    }
}
