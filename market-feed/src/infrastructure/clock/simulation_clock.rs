use crate::domain::{Clock, Timestamp};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Simulation clock used to stamp instrument updates
///
/// Runs in real time by default. A fixed clock only moves through
/// `advance()`, which keeps generated records reproducible.
/// Clones share state.
#[derive(Debug)]
pub struct SimulationClock {
    inner: Arc<RwLock<ClockState>>,
}

#[derive(Debug)]
struct ClockState {
    /// The reference point in simulated time
    simulated_time: DateTime<Utc>,
    /// The wall clock time when simulation started/was last advanced
    wall_clock_reference: DateTime<Utc>,
    fixed: bool,
}

impl ClockState {
    fn current(&self) -> Timestamp {
        if self.fixed {
            self.simulated_time
        } else {
            self.simulated_time + (Utc::now() - self.wall_clock_reference)
        }
    }
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::with_state(Utc::now(), false)
    }

    /// Create a fixed clock starting at a specific time
    pub fn at(time: DateTime<Utc>) -> Self {
        Self::with_state(time, true)
    }

    /// Create a fixed clock at the current time
    pub fn fixed() -> Self {
        Self::at(Utc::now())
    }

    /// Move simulated time forward. Works in both modes.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.write();
        state.simulated_time = state.current() + duration;
        state.wall_clock_reference = Utc::now();
    }

    fn with_state(simulated_time: DateTime<Utc>, fixed: bool) -> Self {
        SimulationClock {
            inner: Arc::new(RwLock::new(ClockState {
                simulated_time,
                wall_clock_reference: Utc::now(),
                fixed,
            })),
        }
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SimulationClock {
    fn clone(&self) -> Self {
        SimulationClock {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Clock for SimulationClock {
    fn now(&self) -> Timestamp {
        self.inner.read().current()
    }
}
