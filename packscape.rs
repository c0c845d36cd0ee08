//! packscape - Live per-category particle fountains
//!
//! Each category in a streaming count feed gets its own fountain: new
//! events become droplets released over a short cycle, the base spins with
//! the category's activity rate, and a fountain with no recent input goes
//! dormant. no_std; the host supplies time as milliseconds and renders the
//! snapshots.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod composer;
pub mod emitter;
pub mod error;
pub mod liveness;
pub mod particle;
pub mod rate;
pub mod release;
pub mod rng;
pub mod settings;
pub mod transition;

pub use composer::{circle_slot, shorten_label, Packscape};
pub use emitter::{make_label, Emitter, Label, ReleaseSink, Snapshot, DORMANT_COLOR};
pub use error::{Error, Result};
pub use liveness::{Liveness, LivenessMachine, SampleTimer};
pub use particle::{Particle, ParticlePool};
pub use rate::{MovingAverage, RateEstimator};
pub use release::ReleaseCycle;
pub use settings::{Settings, DEFAULT_POOL_SIZE};
pub use transition::{ease_quad_in_out, PositionTransition};
