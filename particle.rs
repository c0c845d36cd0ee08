//! Particle pool and integrator
//!
//! Each fountain owns a fixed array of particles that lives as long as the
//! fountain does. Particles are launched from the base, fall under gravity,
//! and go back to the pool the moment they drop below the ground plane.

use crate::rng::Rng;
use crate::settings::Settings;

// Particle structure
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Particle {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub visible: bool,
}

impl Particle {
    // Back to the base, hidden, ready for reuse
    fn recycle(&mut self) {
        *self = Particle::default();
    }

    fn launch(&mut self, rng: &mut Rng, settings: &Settings) {
        let lateral = settings.launch_lateral_max;
        let dx = rng.random_range(-lateral, lateral);
        let dy = rng.random_range(settings.launch_vertical_min, settings.launch_vertical_max);
        let dz = rng.random_range(-lateral, lateral);

        self.position = [0.0; 3];
        self.velocity = [dx, dy, dz];
        self.visible = true;
    }
}

pub struct ParticlePool<const N: usize> {
    particles: [Particle; N],
    visible: usize,
}

impl<const N: usize> Default for ParticlePool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ParticlePool<N> {
    pub fn new() -> Self {
        Self {
            particles: [Particle::default(); N],
            visible: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn visible_count(&self) -> usize {
        self.visible
    }

    pub fn free_slots(&self) -> usize {
        N - self.visible
    }

    /// Every slot in pool order, hidden ones included.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Launch up to `count` hidden particles, scanning in index order.
    /// Returns how many were actually launched; any shortfall is dropped.
    pub fn release(&mut self, count: usize, rng: &mut Rng, settings: &Settings) -> usize {
        let mut launched = 0;
        if count == 0 {
            return launched;
        }

        for particle in self.particles.iter_mut() {
            if particle.visible {
                continue;
            }
            particle.launch(rng, settings);
            launched += 1;
            if launched == count {
                break;
            }
        }

        self.visible += launched;
        launched
    }

    /// Advance every visible particle one tick. Returns true if any
    /// particle moved.
    pub fn step(&mut self, gravity: f32) -> bool {
        if self.visible == 0 {
            return false;
        }

        let mut grounded = 0;
        for particle in self.particles.iter_mut() {
            if !particle.visible {
                continue;
            }

            let p = &mut particle.position;
            let v = &mut particle.velocity;
            p[0] += v[0];
            p[1] += v[1];
            p[2] += v[2];
            v[1] += gravity;

            // Check ground contact
            if p[1] < 0.0 {
                particle.recycle();
                grounded += 1;
            }
        }

        self.visible -= grounded;
        true
    }
}
