//! Activity rate estimation
//!
//! Two exponentially time-weighted moving averages over the same stream of
//! deltas. Their ratio says whether a category is busier (> 1) or quieter
//! (< 1) than its own recent history.

/// Exponentially time-weighted moving average.
///
/// A sample's weight decays by `exp(-age / window)`, so samples older than a
/// few windows stop influencing the average.
#[derive(Copy, Clone, Debug)]
pub struct MovingAverage {
    window_ms: f32,
    average: f32,
    variance: f32,
    last_sample: Option<u64>,
}

impl MovingAverage {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms: window_ms.max(1) as f32,
            average: 0.0,
            variance: 0.0,
            last_sample: None,
        }
    }

    // Weight given to a new sample arriving `elapsed_ms` after the previous one
    fn alpha(&self, elapsed_ms: u64) -> f32 {
        1.0 - libm::expf(-(elapsed_ms as f32) / self.window_ms)
    }

    pub fn push(&mut self, timestamp: u64, magnitude: f32) {
        if !magnitude.is_finite() {
            return;
        }

        match self.last_sample {
            None => {
                // First sample seeds the average
                self.average = magnitude;
                self.variance = 0.0;
                self.last_sample = Some(timestamp);
            }
            Some(previous) => {
                // Out-of-order timestamps count as simultaneous
                let alpha = self.alpha(timestamp.saturating_sub(previous));
                let diff = magnitude - self.average;
                let increment = alpha * diff;
                self.average += increment;
                self.variance = (1.0 - alpha) * (self.variance + diff * increment);
                self.last_sample = Some(timestamp.max(previous));
            }
        }
    }

    pub fn moving_average(&self) -> f32 {
        self.average
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }

    pub fn deviation(&self) -> f32 {
        libm::sqrtf(self.variance.max(0.0))
    }

    pub fn is_empty(&self) -> bool {
        self.last_sample.is_none()
    }

    pub fn set_window(&mut self, window_ms: u64) {
        self.window_ms = window_ms.max(1) as f32;
    }
}

/// Short-over-long activity ratio for one category.
#[derive(Copy, Clone, Debug)]
pub struct RateEstimator {
    short: MovingAverage,
    long: MovingAverage,
}

impl RateEstimator {
    pub fn new(short_window_ms: u64, long_window_ms: u64) -> Self {
        Self {
            short: MovingAverage::new(short_window_ms),
            long: MovingAverage::new(long_window_ms),
        }
    }

    pub fn push(&mut self, timestamp: u64, magnitude: f32) {
        self.short.push(timestamp, magnitude);
        self.long.push(timestamp, magnitude);
    }

    /// `1.0` is the normal pace for this category. Always finite and
    /// non-negative; exactly `1.0` before any history exists.
    pub fn current_rate(&self) -> f32 {
        let long = self.long.moving_average();
        if self.long.is_empty() || long == 0.0 {
            return 1.0;
        }

        let rate = self.short.moving_average() / long;
        if rate.is_finite() {
            rate.max(0.0)
        } else {
            1.0
        }
    }

    pub fn set_windows(&mut self, short_window_ms: u64, long_window_ms: u64) {
        self.short.set_window(short_window_ms);
        self.long.set_window(long_window_ms);
    }

    pub fn short(&self) -> &MovingAverage {
        &self.short
    }

    pub fn long(&self) -> &MovingAverage {
        &self.long
    }
}
