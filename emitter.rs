//! One fountain per category
//!
//! An emitter turns a cumulative count into particles: every increase in the
//! count launches that many droplets over the next release cycle, spins the
//! base in proportion to the current activity rate, and keeps the fountain
//! alive. Time is always passed in as milliseconds from an arbitrary epoch.

use log::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::liveness::{Liveness, LivenessMachine, SampleTimer};
use crate::particle::{Particle, ParticlePool};
use crate::rate::RateEstimator;
use crate::release::ReleaseCycle;
use crate::rng::Rng;
use crate::settings::{Settings, DEFAULT_POOL_SIZE};
use crate::transition::PositionTransition;

pub const LABEL_CAPACITY: usize = 32;

/// Category name, stored inline.
pub type Label = heapless::String<LABEL_CAPACITY>;

/// Colour used by renderers for a dormant fountain.
pub const DORMANT_COLOR: [f32; 3] = [0.15, 0.15, 0.15];

pub fn make_label(name: &str) -> Result<Label> {
    if name.is_empty() {
        return Err(Error::EmptyLabel);
    }
    let mut label = Label::new();
    label.push_str(name).map_err(|_| Error::LabelTooLong {
        len: name.len(),
        max: LABEL_CAPACITY,
    })?;
    Ok(label)
}

/// Receives every launch of particles, e.g. to drive a sound per release.
pub trait ReleaseSink {
    fn released(&mut self, label: &str, count: usize, rate: f32);
}

impl ReleaseSink for () {
    fn released(&mut self, _label: &str, _count: usize, _rate: f32) {}
}

/// Read-only view of an emitter for one frame.
#[derive(Copy, Clone, Debug)]
pub struct Snapshot<'a> {
    pub label: &'a str,
    pub position: [f32; 3],
    pub rotation: f32,
    pub liveness: Liveness,
    pub color: [f32; 3],
    pub rate: f32,
    /// All pool slots in stable order; hidden ones have `visible == false`.
    pub particles: &'a [Particle],
    /// Bumped every tick the particle buffer changed.
    pub generation: u64,
}

impl<'a> Snapshot<'a> {
    pub fn is_active(&self) -> bool {
        self.liveness == Liveness::Active
    }

    pub fn visible_particles(&self) -> impl Iterator<Item = &'a Particle> + 'a {
        self.particles.iter().filter(|p| p.visible)
    }
}

pub struct Emitter<const N: usize = DEFAULT_POOL_SIZE> {
    label: Label,
    color: [f32; 3],
    settings: Settings,
    rng: Rng,

    pool: ParticlePool<N>,
    release: ReleaseCycle,
    rate: RateEstimator,
    liveness: LivenessMachine,
    sampler: SampleTimer,
    transition: PositionTransition,

    last_count: Option<u64>,
    rotation: f32,
    generation: u64,
}

fn check_target(target: [f32; 2]) -> Result<()> {
    if target.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(Error::NonFiniteTarget)
    }
}

impl<const N: usize> Emitter<N> {
    /// New dormant fountain standing at `target`.
    pub fn new(label: Label, target: [f32; 2], settings: Settings, now: u64) -> Result<Self> {
        check_target(target)?;

        let mut rng = Rng::for_label(settings.rng_seed, &label);
        let color = [rng.random(), rng.random(), rng.random()];
        debug!("fountain {} created at ({}, {})", label, target[0], target[1]);

        Ok(Self {
            color,
            rng,
            pool: ParticlePool::new(),
            release: ReleaseCycle::default(),
            rate: RateEstimator::new(settings.short_window_ms, settings.long_window_ms),
            liveness: LivenessMachine::new(settings.death_duration_ms),
            sampler: SampleTimer::start(settings.sample_frequency_ms, now),
            transition: PositionTransition::new(
                [target[0], 0.0, target[1]],
                settings.move_duration_ms,
            ),
            last_count: None,
            rotation: 0.0,
            generation: 0,
            label,
            settings,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.state()
    }

    pub fn rate(&self) -> f32 {
        self.rate.current_rate()
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn position(&self) -> [f32; 3] {
        self.transition.current()
    }

    pub fn last_count(&self) -> Option<u64> {
        self.last_count
    }

    pub fn release_cycle(&self) -> &ReleaseCycle {
        &self.release
    }

    pub fn pool(&self) -> &ParticlePool<N> {
        &self.pool
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Request a new planar slot; the fountain glides there.
    pub fn set_target(&mut self, target: [f32; 2], now: u64) -> Result<()> {
        check_target(target)?;
        self.transition.retarget(target, now);
        Ok(())
    }

    /// Consume the latest cumulative count. Returns the delta that was
    /// acted on (zero for the first observation, repeats and resets).
    pub fn observe_count(&mut self, count: u64, now: u64) -> u64 {
        let Some(last) = self.last_count else {
            // First count only sets the baseline
            self.last_count = Some(count);
            return 0;
        };

        if count < last {
            warn!("fountain {} count went backwards ({} -> {})", self.label, last, count);
            self.last_count = Some(count);
            return 0;
        }

        let delta = count - last;
        if delta == 0 {
            return 0;
        }

        self.last_count = Some(count);
        self.rate.push(now, delta as f32);
        if self.liveness.record_input(now) {
            debug!("fountain {} awake", self.label);
        }
        self.release.begin(delta, now);
        trace!(
            "fountain {} releasing {} over {}ms",
            self.label,
            delta,
            self.settings.release_duration_ms
        );
        delta
    }

    pub fn sampler(&self) -> &SampleTimer {
        &self.sampler
    }

    /// Stop the dormancy timer ahead of removal. A retired fountain never
    /// runs another dormancy check from `tick`.
    pub fn retire(&mut self) {
        self.sampler.cancel();
    }

    /// Dormancy check, normally run by the emitter's own sample timer.
    pub fn sample(&mut self, now: u64) {
        if self.liveness.sample(now) {
            debug!("fountain {} dormant", self.label);
        }
    }

    /// One simulation frame.
    pub fn tick<S: ReleaseSink + ?Sized>(
        &mut self,
        now: u64,
        target: [f32; 2],
        count: Option<u64>,
        sink: &mut S,
    ) -> Result<()> {
        self.set_target(target, now)?;
        self.transition.advance(now);

        if let Some(count) = count {
            self.observe_count(count, now);
        }

        if self.sampler.poll(now) {
            self.sample(now);
        }

        if !self.liveness.is_active() {
            return Ok(());
        }

        let mut changed = false;
        if self.release.is_releasing() {
            let launched = self
                .release
                .advance(now, &mut self.pool, &mut self.rng, &self.settings);
            if launched > 0 {
                sink.released(&self.label, launched, self.rate.current_rate());
                changed = true;
            }
        }

        changed |= self.pool.step(self.settings.gravity);
        self.rotation += self.settings.spin_per_tick * self.rate.current_rate();

        if changed {
            self.generation = self.generation.wrapping_add(1);
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            label: &self.label,
            position: self.transition.current(),
            rotation: self.rotation,
            liveness: self.liveness.state(),
            color: self.color,
            rate: self.rate.current_rate(),
            particles: self.pool.particles(),
            generation: self.generation,
        }
    }

    /// Apply new settings at runtime. The pool size is fixed at compile time.
    pub fn update_settings(&mut self, settings: Settings) {
        self.liveness.set_death_duration(settings.death_duration_ms);
        self.sampler.set_period(settings.sample_frequency_ms);
        self.transition.set_move_duration(settings.move_duration_ms);
        self.rate
            .set_windows(settings.short_window_ms, settings.long_window_ms);
        self.settings = settings;
    }
}

impl<const N: usize> Drop for Emitter<N> {
    fn drop(&mut self) {
        debug!("fountain {} removed", self.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    const FRAME: u64 = 16;

    fn fountain(now: u64) -> Emitter<1000> {
        let label = make_label("tcp").unwrap();
        Emitter::new(label, [0.0, 0.0], Settings::default(), now).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        launches: Vec<usize>,
    }

    impl ReleaseSink for Recorder {
        fn released(&mut self, label: &str, count: usize, rate: f32) {
            assert_eq!(label, "tcp");
            assert!(rate.is_finite());
            self.launches.push(count);
        }
    }

    #[test]
    fn labels_are_validated() {
        assert_eq!(make_label(""), Err(Error::EmptyLabel));
        let long = "x".repeat(LABEL_CAPACITY + 1);
        assert_eq!(
            make_label(&long),
            Err(Error::LabelTooLong {
                len: LABEL_CAPACITY + 1,
                max: LABEL_CAPACITY
            })
        );
        assert_eq!(make_label("udp").unwrap().as_str(), "udp");
    }

    #[test]
    fn first_count_only_sets_baseline() {
        let mut emitter = fountain(0);
        assert_eq!(emitter.observe_count(500, 0), 0);
        assert_eq!(emitter.liveness(), Liveness::Dormant);
        assert!(!emitter.release_cycle().is_releasing());
        assert_eq!(emitter.observe_count(550, 1000), 50);
        assert_eq!(emitter.liveness(), Liveness::Active);
        assert_eq!(emitter.release_cycle().particles_to_release(), 50);
    }

    #[test]
    fn duplicate_and_lower_counts_are_noops() {
        let mut emitter = fountain(0);
        emitter.observe_count(100, 0);
        assert_eq!(emitter.observe_count(100, 1000), 0);
        assert_eq!(emitter.liveness(), Liveness::Dormant);

        assert_eq!(emitter.observe_count(40, 2000), 0);
        assert_eq!(emitter.last_count(), Some(40));
        assert!(!emitter.release_cycle().is_releasing());

        assert_eq!(emitter.observe_count(45, 3000), 5);
    }

    #[test]
    fn release_then_fall_back_to_pool() {
        let mut emitter = fountain(0);
        let mut sink = Recorder::default();
        emitter.tick(0, [0.0, 0.0], Some(1000), &mut sink).unwrap();
        emitter.tick(FRAME, [0.0, 0.0], Some(1050), &mut sink).unwrap();

        let mut now = FRAME;
        while now < 960 + FRAME {
            now += FRAME;
            emitter.tick(now, [0.0, 0.0], Some(1050), &mut sink).unwrap();
        }
        assert_eq!(emitter.release_cycle().particles_released(), 50);
        assert_eq!(sink.launches.iter().sum::<usize>(), 50);

        // Max flight is 2 * 30 / 0.2 = 300 ticks
        for _ in 0..400 {
            now += FRAME;
            emitter.tick(now, [0.0, 0.0], Some(1050), &mut sink).unwrap();
        }
        assert_eq!(emitter.pool().visible_count(), 0);
        assert_eq!(emitter.liveness(), Liveness::Active);
    }

    #[test]
    fn goes_dormant_after_silence() {
        let mut emitter = fountain(0);
        emitter.tick(0, [0.0, 0.0], Some(10), &mut ()).unwrap();
        emitter.tick(100, [0.0, 0.0], Some(20), &mut ()).unwrap();
        assert_eq!(emitter.liveness(), Liveness::Active);

        let settings = Settings::default();
        let mut now = 100;
        while now < 100 + settings.death_duration_ms {
            now += FRAME;
            emitter.tick(now, [0.0, 0.0], Some(20), &mut ()).unwrap();
            assert_eq!(emitter.liveness(), Liveness::Active, "died early at {now}");
        }

        let deadline = 100 + settings.death_duration_ms + settings.sample_frequency_ms;
        while now <= deadline {
            now += FRAME;
            emitter.tick(now, [0.0, 0.0], Some(20), &mut ()).unwrap();
        }
        assert_eq!(emitter.snapshot().liveness, Liveness::Dormant);
    }

    #[test]
    fn dormant_fountain_leaves_particles_alone() {
        let mut emitter = fountain(0);
        emitter.tick(0, [0.0, 0.0], Some(0), &mut ()).unwrap();
        emitter.tick(100, [0.0, 0.0], Some(200), &mut ()).unwrap();
        emitter.tick(600, [0.0, 0.0], None, &mut ()).unwrap();
        assert!(emitter.pool().visible_count() > 0);

        // Force dormancy with particles still in flight
        emitter.sample(100 + Settings::default().death_duration_ms + 1);
        assert_eq!(emitter.liveness(), Liveness::Dormant);

        let frozen: Vec<Particle> = emitter.pool().particles().to_vec();
        let generation = emitter.snapshot().generation;
        let rotation = emitter.rotation();
        for step in 1..50 {
            emitter.tick(20_000 + step * FRAME, [0.0, 0.0], None, &mut ()).unwrap();
        }
        assert_eq!(emitter.pool().particles(), frozen.as_slice());
        assert_eq!(emitter.snapshot().generation, generation);
        assert_eq!(emitter.rotation(), rotation);
    }

    #[test]
    fn new_input_revives_dormant_fountain() {
        let mut emitter = fountain(0);
        emitter.observe_count(0, 0);
        emitter.observe_count(5, 10);
        emitter.sample(20_000);
        assert_eq!(emitter.liveness(), Liveness::Dormant);

        emitter.tick(20_016, [0.0, 0.0], Some(9), &mut ()).unwrap();
        assert_eq!(emitter.liveness(), Liveness::Active);
        assert!(emitter.release_cycle().is_releasing());
    }

    #[test]
    fn retired_fountain_stops_sampling() {
        let mut emitter = fountain(0);
        emitter.tick(0, [0.0, 0.0], Some(0), &mut ()).unwrap();
        emitter.tick(16, [0.0, 0.0], Some(5), &mut ()).unwrap();
        assert!(!emitter.sampler().is_cancelled());

        emitter.retire();
        assert!(emitter.sampler().is_cancelled());

        // Long past the death duration, but no check runs any more
        emitter.tick(60_000, [0.0, 0.0], None, &mut ()).unwrap();
        assert_eq!(emitter.liveness(), Liveness::Active);
    }

    #[test]
    fn spin_only_while_active() {
        let mut emitter = fountain(0);
        emitter.tick(0, [0.0, 0.0], Some(0), &mut ()).unwrap();
        emitter.tick(16, [0.0, 0.0], Some(0), &mut ()).unwrap();
        assert_eq!(emitter.rotation(), 0.0);

        emitter.tick(32, [0.0, 0.0], Some(10), &mut ()).unwrap();
        // First delta gives a rate of exactly 1
        assert!(libm::fabsf(emitter.rotation() - 0.1) < 1e-6);
    }

    #[test]
    fn target_change_glides() {
        let mut emitter = fountain(0);
        emitter.tick(0, [0.0, 0.0], None, &mut ()).unwrap();
        emitter.tick(1000, [100.0, 0.0], None, &mut ()).unwrap();
        emitter.tick(3500, [100.0, 0.0], None, &mut ()).unwrap();
        let x = emitter.position()[0];
        assert!(x > 0.0 && x < 100.0);

        emitter.tick(6000, [100.0, 0.0], None, &mut ()).unwrap();
        assert_eq!(emitter.position(), [100.0, 0.0, 0.0]);
    }

    #[test]
    fn non_finite_target_rejected() {
        let label = make_label("tcp").unwrap();
        assert!(matches!(
            Emitter::<16>::new(label, [f32::NAN, 0.0], Settings::default(), 0),
            Err(Error::NonFiniteTarget)
        ));

        let mut emitter = fountain(0);
        assert_eq!(
            emitter.tick(10, [0.0, f32::INFINITY], None, &mut ()),
            Err(Error::NonFiniteTarget)
        );
        assert_eq!(emitter.position(), [0.0; 3]);
    }

    #[test]
    fn snapshot_exposes_whole_pool_in_order() {
        let mut emitter = fountain(0);
        emitter.tick(0, [0.0, 0.0], Some(0), &mut ()).unwrap();
        emitter.tick(16, [0.0, 0.0], Some(3), &mut ()).unwrap();
        emitter.tick(1000, [0.0, 0.0], None, &mut ()).unwrap();

        let snapshot = emitter.snapshot();
        assert_eq!(snapshot.label, "tcp");
        assert_eq!(snapshot.particles.len(), 1000);
        assert_eq!(snapshot.visible_particles().count(), 3);
        assert!(snapshot.particles[..3].iter().all(|p| p.visible));
        assert!(snapshot.generation > 0);
    }
}
