//! Release scheduling
//!
//! A batch of new events is not launched in one frame. It is spread over
//! `release_duration_ms` so a burst looks like a steady stream, limited by
//! whatever headroom the pool has at each tick.

use crate::particle::ParticlePool;
use crate::rng::Rng;
use crate::settings::Settings;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReleaseCycle {
    particles_to_release: u64,
    particles_released: u64,
    release_start: u64,
    releasing: bool,
}

impl ReleaseCycle {
    /// Start a new cycle for `delta` events, replacing any cycle in flight.
    /// A zero delta leaves the current cycle untouched.
    pub fn begin(&mut self, delta: u64, now: u64) {
        if delta == 0 {
            return;
        }
        *self = Self {
            particles_to_release: delta,
            particles_released: 0,
            release_start: now,
            releasing: true,
        };
    }

    /// Launch this tick's share of the cycle. Returns the number of
    /// particles actually launched.
    pub fn advance<const N: usize>(
        &mut self,
        now: u64,
        pool: &mut ParticlePool<N>,
        rng: &mut Rng,
        settings: &Settings,
    ) -> usize {
        if !self.releasing {
            return 0;
        }

        let progress = self.progress(now, settings.release_duration_ms);
        let target =
            libm::round(self.particles_to_release as f64 * progress.min(1.0)) as u64;
        let wanted = target.saturating_sub(self.particles_released);

        // PERF: never ask the pool for more than it can hold
        let wanted = wanted.min(pool.free_slots() as u64) as usize;
        let launched = pool.release(wanted, rng, settings);
        self.particles_released += launched as u64;

        if progress >= 1.0 {
            self.releasing = false;
        }
        launched
    }

    fn progress(&self, now: u64, duration_ms: u64) -> f64 {
        now.saturating_sub(self.release_start) as f64 / duration_ms.max(1) as f64
    }

    pub fn is_releasing(&self) -> bool {
        self.releasing
    }

    pub fn particles_to_release(&self) -> u64 {
        self.particles_to_release
    }

    pub fn particles_released(&self) -> u64 {
        self.particles_released
    }
}
