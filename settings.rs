//! Engine configuration
//!
//! Every timing and physics constant lives here so the simulator (or a
//! settings file) can tune fountains without touching the engine.

use crate::error::{Error, Result};

/// Particles per fountain unless a caller picks another pool size.
pub const DEFAULT_POOL_SIZE: usize = 1000;

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Settings {
    // Release scheduling
    pub release_duration_ms: u64,

    // Physics (units per tick)
    pub gravity: f32,
    pub launch_lateral_max: f32,
    pub launch_vertical_min: f32,
    pub launch_vertical_max: f32,

    // Liveness
    pub death_duration_ms: u64,
    pub sample_frequency_ms: u64,

    // Movement between layout slots
    pub move_duration_ms: u64,

    // Rate estimation windows
    pub short_window_ms: u64,
    pub long_window_ms: u64,

    // Base rotation per tick at a rate of 1.0
    pub spin_per_tick: f32,

    // Layout
    pub circle_radius: f32,

    // RNG seed
    pub rng_seed: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            release_duration_ms: 950,
            gravity: -0.2,
            launch_lateral_max: 1.0,
            launch_vertical_min: 10.0,
            launch_vertical_max: 30.0,
            death_duration_ms: 10_000,
            sample_frequency_ms: 1000,
            move_duration_ms: 5000,
            short_window_ms: 5 * 1000,
            long_window_ms: 5 * 60 * 1000,
            spin_per_tick: 0.1,
            circle_radius: 400.0,
            rng_seed: 0x12345678,
        }
    }
}

impl Settings {
    /// Reject settings that would divide by zero or feed NaN into the
    /// simulation.
    pub fn validate(&self) -> Result<()> {
        if self.release_duration_ms == 0 {
            return Err(Error::InvalidSettings("release_duration_ms"));
        }
        if self.sample_frequency_ms == 0 {
            return Err(Error::InvalidSettings("sample_frequency_ms"));
        }
        if self.move_duration_ms == 0 {
            return Err(Error::InvalidSettings("move_duration_ms"));
        }
        if self.short_window_ms == 0 || self.long_window_ms == 0 {
            return Err(Error::InvalidSettings("window"));
        }

        let floats = [
            ("gravity", self.gravity),
            ("launch_lateral_max", self.launch_lateral_max),
            ("launch_vertical_min", self.launch_vertical_min),
            ("launch_vertical_max", self.launch_vertical_max),
            ("spin_per_tick", self.spin_per_tick),
            ("circle_radius", self.circle_radius),
        ];
        for (name, value) in floats {
            if !value.is_finite() {
                return Err(Error::InvalidSettings(name));
            }
        }
        if self.launch_vertical_max < self.launch_vertical_min {
            return Err(Error::InvalidSettings("launch_vertical_max"));
        }

        // xorshift32 never leaves the all-zero state
        if self.rng_seed == 0 {
            return Err(Error::InvalidSettings("rng_seed"));
        }
        Ok(())
    }
}
