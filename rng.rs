//! Simple PRNG (xorshift32), seeded per fountain so runs are reproducible

#[derive(Copy, Clone, Debug)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        // Zero is a fixed point of xorshift
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    /// Seed derived from a base seed and a category label (FNV-1a over the
    /// label bytes), so each fountain gets its own stable stream.
    pub fn for_label(seed: u32, label: &str) -> Self {
        let mut hash: u32 = 0x811C_9DC5;
        for byte in label.bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x0100_0193);
        }
        Self::new(seed ^ hash)
    }

    /// Uniform in `[0, 1]`.
    pub fn random(&mut self) -> f32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        (self.state as f32) / (u32::MAX as f32)
    }

    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random() * (max - min)
    }
}
