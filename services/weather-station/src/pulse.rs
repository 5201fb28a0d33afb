//! Debounced pulse accumulation for interrupt-driven sensors
//!
//! The anemometer and the rain bucket close a reed switch once per rotation
//! or tip. Edges arrive from the GPIO callback at arbitrary times while the
//! sampler drains the count once per window, so both sides go through one
//! lock: an edge racing a drain lands in exactly one window.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct PulseState {
    count: u32,
    last_accepted: Option<Instant>,
}

/// Per-sensor debounced edge counter
#[derive(Debug)]
pub struct PulseAccumulator {
    debounce: Duration,
    state: Mutex<PulseState>,
}

impl PulseAccumulator {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: Mutex::new(PulseState::default()),
        }
    }

    /// Record an edge, returning whether it was counted
    ///
    /// Edges closer than the debounce interval to the last accepted edge are
    /// contact bounce and are dropped. An edge stamped before the last
    /// accepted one counts as bounce too.
    pub fn accept(&self, edge: Instant) -> bool {
        let mut state = self.lock();
        if let Some(last) = state.last_accepted {
            if edge.saturating_duration_since(last) < self.debounce || edge < last {
                return false;
            }
        }
        state.last_accepted = Some(edge);
        state.count = state.count.saturating_add(1);
        true
    }

    /// Take the current count and reset it to zero
    ///
    /// The debounce reference survives the drain so a bounce straddling the
    /// window boundary is still suppressed.
    pub fn drain(&self) -> u32 {
        std::mem::take(&mut self.lock().count)
    }

    /// Current count without resetting it
    pub fn count(&self) -> u32 {
        self.lock().count
    }

    fn lock(&self) -> MutexGuard<'_, PulseState> {
        // The state is two plain fields, a panic mid-update cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
