// Time sources for the frame loop.

use std::time::Instant;

/// Monotonic time in seconds.
pub trait Clock {
    fn now(&self) -> f32;
}

/// Seconds since construction, read from the system clock.
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    pub t: f32,
}

#[cfg(test)]
impl ManualClock {
    pub fn advance(&mut self, dt: f32) {
        self.t += dt;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> f32 {
        self.t
    }
}
