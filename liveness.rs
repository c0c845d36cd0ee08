//! Fountain liveness
//!
//! A fountain wakes the moment new events arrive and is declared dormant
//! only by a periodic check, once nothing has arrived for longer than the
//! death duration.

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Liveness {
    #[default]
    Dormant,
    Active,
}

/// Recurring deadline, polled by whoever drives the clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SampleTimer {
    period_ms: u64,
    next_due: Option<u64>,
}

impl SampleTimer {
    /// Armed so the first firing is one period after `now`.
    pub fn start(period_ms: u64, now: u64) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_due: Some(now.saturating_add(period_ms)),
        }
    }

    /// Returns true at most once per call when the deadline has passed,
    /// then schedules the next one. Missed periods are not replayed.
    pub fn poll(&mut self, now: u64) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let behind = (now - due) / self.period_ms;
                self.next_due = Some(due + (behind + 1) * self.period_ms);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.next_due.is_none()
    }

    pub fn set_period(&mut self, period_ms: u64) {
        self.period_ms = period_ms.max(1);
    }
}

#[derive(Copy, Clone, Debug)]
pub struct LivenessMachine {
    state: Liveness,
    last_input: Option<u64>,
    death_duration_ms: u64,
}

impl LivenessMachine {
    pub fn new(death_duration_ms: u64) -> Self {
        Self {
            state: Liveness::Dormant,
            last_input: None,
            death_duration_ms,
        }
    }

    pub fn state(&self) -> Liveness {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == Liveness::Active
    }

    pub fn last_input(&self) -> Option<u64> {
        self.last_input
    }

    pub fn set_death_duration(&mut self, death_duration_ms: u64) {
        self.death_duration_ms = death_duration_ms;
    }

    /// New events arrived. Returns true if this woke the fountain.
    pub fn record_input(&mut self, now: u64) -> bool {
        self.last_input = Some(now);
        let woke = self.state == Liveness::Dormant;
        self.state = Liveness::Active;
        woke
    }

    /// Sampling check. Returns true if the fountain just went dormant.
    pub fn sample(&mut self, now: u64) -> bool {
        if self.state != Liveness::Active {
            return false;
        }
        let Some(last) = self.last_input else {
            return false;
        };
        if now.saturating_sub(last) > self.death_duration_ms {
            self.state = Liveness::Dormant;
            return true;
        }
        false
    }
}
