//! Tick gating for the fluid simulation.
//!
//! Fires on every game tick divisible by the configured interval.

/// Tick interval used when none is configured.
pub const DEFAULT_TICK_INTERVAL: u32 = 2;

/// Decides which game ticks run the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickScheduler {
    /// Game ticks between firings, at least one.
    interval: u32,
    /// Firings recorded so far.
    firings: u64,
    /// Game tick of the latest firing.
    last_fired: Option<u64>,
}

impl TickScheduler {
    /// Creates a scheduler. An interval of zero is treated as one.
    #[must_use]
    pub fn new(interval: u32) -> Self {
        if interval == 0 {
            log::warn!("Tick interval of 0 is invalid, using 1");
        }
        Self {
            interval: interval.max(1),
            firings: 0,
            last_fired: None,
        }
    }

    /// Whether the simulation fires on `game_time`.
    #[must_use]
    pub const fn should_fire(&self, game_time: u64) -> bool {
        game_time % self.interval as u64 == 0
    }

    /// Records that the simulation fired on `game_time`.
    pub fn record_firing(&mut self, game_time: u64) {
        self.firings += 1;
        self.last_fired = Some(game_time);
        log::trace!("Fluid firing #{} at tick {game_time}", self.firings);
    }

    /// Game ticks between firings.
    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    /// Number of firings so far.
    #[must_use]
    pub const fn firings(&self) -> u64 {
        self.firings
    }

    /// Game tick of the latest firing.
    #[must_use]
    pub const fn last_fired(&self) -> Option<u64> {
        self.last_fired
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_on_even_ticks() {
        let scheduler = TickScheduler::default();
        let fired: Vec<u64> = (0..10).filter(|&t| scheduler.should_fire(t)).collect();
        assert_eq!(fired, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_zero_interval_fires_every_tick() {
        let scheduler = TickScheduler::new(0);
        assert_eq!(scheduler.interval(), 1);
        assert!((0..5).all(|t| scheduler.should_fire(t)));
    }

    #[test]
    fn test_record_firing() {
        let mut scheduler = TickScheduler::new(5);
        assert_eq!(scheduler.last_fired(), None);
        scheduler.record_firing(10);
        scheduler.record_firing(15);
        assert_eq!(scheduler.firings(), 2);
        assert_eq!(scheduler.last_fired(), Some(15));
    }
}
