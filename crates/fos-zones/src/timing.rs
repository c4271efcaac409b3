//! Throttle and debounce gates
//!
//! The gates hold no callbacks. The caller asks the gate whether to schedule
//! a run and then schedules it on its own task queue.

/// Outcome of a throttled request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Schedule one run after this many milliseconds
    Schedule(u64),
    /// A run is already scheduled for this window
    Suppressed,
}

/// Trailing-edge throttle: at most one run per window.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: u64,
    scheduled: bool,
    last_fired_ms: Option<u64>,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            scheduled: false,
            last_fired_ms: None,
        }
    }

    /// Ask for a run
    pub fn request(&mut self) -> ThrottleDecision {
        if self.scheduled {
            return ThrottleDecision::Suppressed;
        }
        self.scheduled = true;
        ThrottleDecision::Schedule(self.interval_ms)
    }

    /// Mark the scheduled run as started, re-opening the gate
    pub fn fire(&mut self, now_ms: u64) {
        self.scheduled = false;
        self.last_fired_ms = Some(now_ms);
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn last_fired_ms(&self) -> Option<u64> {
        self.last_fired_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

/// Debounce by generation: only the latest call's run goes through.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay_ms: u64,
    generation: u64,
}

impl Debounce {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms, generation: 0 }
    }

    /// Register a call, superseding earlier ones. Returns its generation.
    pub fn call(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Whether the run scheduled for `generation` should still execute
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }
}
