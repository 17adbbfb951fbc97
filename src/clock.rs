//! Monotonic time source and bounded delays.
//!
//! Every wait in the control plane goes through [`Clock`] so the bounds
//! (startup connect, scan deadline, inter-chunk delay) can be verified on the
//! host with [`ManualClock`] without sleeping.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Millisecond clock with a blocking delay.
pub trait Clock {
    /// Milliseconds elapsed since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;

    /// Block the calling context for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Wall clock backed by [`Instant`] and `std::thread::sleep`.
///
/// Works unchanged on ESP-IDF, where `std::thread::sleep` yields to FreeRTOS.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Virtual clock that only moves when told to.
///
/// Clones share the same time, so a test can keep a handle while the
/// provisioner owns another. `delay_ms` advances time instantly.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }
}
