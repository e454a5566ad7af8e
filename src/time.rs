//! Caller-side frame timing.
//!
//! The kernel integrates whatever `dt` it is given. [`FrameClock`] is the
//! helper a render loop uses to produce that `dt`: it measures wall-clock
//! time between frames, applies a time scale, and clamps the result to a
//! maximum step so a stalled frame cannot blow up the integration.
//!
//! # Example
//!
//! ```ignore
//! use swarmkit::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//! loop {
//!     let dt = clock.tick();
//!     system.update(dt);
//!     // draw system.active_particles() ...
//! }
//! ```

use std::time::{Duration, Instant};

/// Largest step handed to the simulation by default, in seconds.
pub const DEFAULT_MAX_DELTA: f32 = 0.05;

/// Frame timer producing clamped simulation steps.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    /// Simulated time accumulated from returned steps.
    elapsed_secs: f32,
    /// Last returned step.
    delta_secs: f32,
    /// Last measured wall-clock step before scaling and clamping.
    raw_delta_secs: f32,
    frame_count: u64,
    max_delta: f32,
    fixed_delta: Option<f32>,
    time_scale: f32,
    paused: bool,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            raw_delta_secs: 0.0,
            frame_count: 0,
            max_delta: DEFAULT_MAX_DELTA,
            fixed_delta: None,
            time_scale: 1.0,
            paused: false,
        }
    }

    /// Set the largest step [`tick`](Self::tick) may return.
    pub fn with_max_delta(mut self, max_delta: f32) -> Self {
        self.max_delta = max_delta.max(0.0);
        self
    }

    /// Mark the start of a new frame and return the step to simulate.
    ///
    /// Returns `0.0` while paused.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.raw_delta_secs = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;

        self.delta_secs = if self.paused {
            0.0
        } else {
            let step = self.fixed_delta.unwrap_or(self.raw_delta_secs) * self.time_scale;
            step.min(self.max_delta)
        };
        self.elapsed_secs += self.delta_secs;
        self.delta_secs
    }

    /// Last step returned by [`tick`](Self::tick).
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Last measured wall-clock frame time, unscaled and unclamped.
    #[inline]
    pub fn raw_delta(&self) -> f32 {
        self.raw_delta_secs
    }

    /// Total simulated time.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Use a fixed step instead of wall-clock time. `None` restores real timing.
    ///
    /// The fixed step is still scaled and clamped.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Set time scale multiplier (negative values clamp to 0).
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Last step as a Duration.
    pub fn delta_duration(&self) -> Duration {
        Duration::from_secs_f32(self.delta_secs)
    }

    /// Restart timing from now. Scale, clamp and fixed step are kept.
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.elapsed_secs = 0.0;
        self.delta_secs = 0.0;
        self.raw_delta_secs = 0.0;
        self.frame_count = 0;
        self.paused = false;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
