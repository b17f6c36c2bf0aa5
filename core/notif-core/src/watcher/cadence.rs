//! Adaptive cycle interval.
//!
//! ```text
//! changed       → FAST        (interval = min)
//! unchanged     → BACKING_OFF (interval = min(interval + step, max))
//! read failure  → BACKING_OFF (interval = max)
//! ```

use std::cmp;
use std::time::Duration;

use crate::config::WatchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadencePhase {
    Fast,
    BackingOff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    min: Duration,
    max: Duration,
    step: Duration,
    interval: Duration,
}

impl Cadence {
    pub fn new(min: Duration, max: Duration, step: Duration) -> Self {
        let max = cmp::max(min, max);
        Self {
            min,
            max,
            step,
            interval: min,
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        let (min, max, step) = config.bounds();
        Self::new(min, max, step)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn phase(&self) -> CadencePhase {
        if self.interval == self.min {
            CadencePhase::Fast
        } else {
            CadencePhase::BackingOff
        }
    }

    pub fn on_changed(&mut self) {
        self.interval = self.min;
    }

    pub fn on_idle(&mut self) {
        self.interval = cmp::min(self.interval.saturating_add(self.step), self.max);
    }

    pub fn on_read_failure(&mut self) {
        self.interval = self.max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cadence() -> Cadence {
        Cadence::new(
            Duration::from_secs(2),
            Duration::from_secs(10),
            Duration::from_secs(3),
        )
    }

    #[test]
    fn starts_fast_at_min() {
        let cadence = cadence();
        assert_eq!(cadence.interval(), Duration::from_secs(2));
        assert_eq!(cadence.phase(), CadencePhase::Fast);
    }

    #[test]
    fn idle_cycles_grow_monotonically_and_clamp() {
        let mut cadence = cadence();
        let mut previous = cadence.interval();
        for _ in 0..20 {
            cadence.on_idle();
            assert!(cadence.interval() >= previous);
            assert!(cadence.interval() <= Duration::from_secs(10));
            previous = cadence.interval();
        }
        assert_eq!(cadence.interval(), Duration::from_secs(10));
        assert_eq!(cadence.phase(), CadencePhase::BackingOff);

        cadence.on_changed();
        assert_eq!(cadence.interval(), Duration::from_secs(2));
        assert_eq!(cadence.phase(), CadencePhase::Fast);
    }

    #[test]
    fn read_failure_jumps_to_max() {
        let mut cadence = cadence();
        cadence.on_read_failure();
        assert_eq!(cadence.interval(), Duration::from_secs(10));
    }

    #[test]
    fn max_below_min_is_lifted() {
        let mut cadence = Cadence::new(
            Duration::from_secs(5),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        cadence.on_idle();
        assert_eq!(cadence.interval(), Duration::from_secs(5));
    }
}
