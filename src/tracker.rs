//! Location sources feeding the geo state store.

use chrono::{Datelike, Local, Timelike};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    config::AppConfig,
    geo::{FishermanState, FishermanUpdate},
};

/// Hour of day and month of year used for the time context.
pub trait Clock {
    fn hour(&self) -> u8;
    fn month(&self) -> u8;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn hour(&self) -> u8 {
        Local::now().hour() as u8
    }

    fn month(&self) -> u8 {
        Local::now().month() as u8
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub hour: u8,
    pub month: u8,
}

impl Clock for FixedClock {
    fn hour(&self) -> u8 {
        self.hour
    }

    fn month(&self) -> u8 {
        self.month
    }
}

/// Produces the next partial update from the latest committed state.
pub trait LocationSource {
    fn next_update(&mut self, current: &FishermanState) -> Option<FishermanUpdate>;
}

/// Start state from config, with the clock filling in missing time fields.
pub fn initial_state(config: &AppConfig, clock: &impl Clock) -> FishermanState {
    FishermanState {
        latitude: config.fisherman.latitude,
        longitude: config.fisherman.longitude,
        hour: config.fisherman.hour.unwrap_or_else(|| clock.hour()),
        month: config.fisherman.month.unwrap_or_else(|| clock.month()),
    }
}

/// Seeded random walk that steps from whatever position is committed, so
/// manual updates in between ticks are kept.
pub struct SimulatedTracker<C: Clock> {
    rng: ChaCha8Rng,
    drift_deg: f64,
    clock: C,
}

impl<C: Clock> SimulatedTracker<C> {
    pub fn new(seed: u64, drift_deg: f64, clock: C) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            drift_deg: drift_deg.abs(),
            clock,
        }
    }

    pub fn from_config(config: &AppConfig, clock: C) -> Self {
        Self::new(config.tracker.seed, config.tracker.drift_deg, clock)
    }

    fn jitter(&mut self) -> f64 {
        if self.drift_deg == 0.0 {
            0.0
        } else {
            self.rng.gen_range(-self.drift_deg..=self.drift_deg)
        }
    }
}

impl<C: Clock> LocationSource for SimulatedTracker<C> {
    fn next_update(&mut self, current: &FishermanState) -> Option<FishermanUpdate> {
        let lat = (current.latitude + self.jitter()).clamp(-90.0, 90.0);
        let lng = (current.longitude + self.jitter()).clamp(-180.0, 180.0);
        Some(
            FishermanUpdate::position(lat, lng)
                .with_hour(self.clock.hour())
                .with_month(self.clock.month()),
        )
    }
}
