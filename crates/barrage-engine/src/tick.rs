//! Fixed-timestep driving of a [`Space`].
//!
//! The simulation always advances in whole ticks of `fixed_dt` seconds. A
//! [`FrameClock`] turns variable wall-clock frame times into a number of
//! ticks to run, carrying the remainder over to the next frame. When a frame
//! falls too far behind, at most `max_ticks_per_frame` ticks run and the
//! excess time is dropped instead of being replayed later, so a slow frame
//! cannot snowball into ever longer catch-up frames.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use barrage_engine::prelude::*;
//!
//! let registry = Arc::new(barrage_engine::builtin_registry().unwrap());
//! let config = TickConfig { fixed_dt: 0.1, max_ticks_per_frame: 3, seed: 1 };
//! let mut tick_loop = TickLoop::with_config(registry, &config);
//!
//! assert_eq!(tick_loop.advance_frame(Duration::from_millis(250)), 2);
//! // 10 s behind: capped at 3 ticks, the rest is dropped.
//! assert_eq!(tick_loop.advance_frame(Duration::from_secs(10)), 3);
//! assert_eq!(tick_loop.tick_count(), 5);
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use barrage_pool::registry::Registry;

use crate::space::Space;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Upper bound on ticks run for one frame. Must be at least 1.
    pub max_ticks_per_frame: u32,
    /// Seed of the space's random generator; 0 draws a fresh one.
    pub seed: u64,
}

impl Default for TickConfig {
    /// 60 Hz, at most 5 catch-up ticks per frame, random seed.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_ticks_per_frame: 5,
            seed: 0,
        }
    }
}

pub(crate) fn assert_valid_dt(fixed_dt: f64) {
    assert!(
        fixed_dt > 0.0 && fixed_dt.is_finite(),
        "fixed_dt must be positive and finite, got {fixed_dt}"
    );
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// FrameClock
// ---------------------------------------------------------------------------

/// Converts frame times into fixed ticks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    fixed_dt: f64,
    max_ticks_per_frame: u32,
    accumulator: f64,
    dropped: f64,
}

impl FrameClock {
    /// # Panics
    ///
    /// Panics if `fixed_dt` is not positive and finite or
    /// `max_ticks_per_frame` is 0.
    pub fn new(fixed_dt: f64, max_ticks_per_frame: u32) -> Self {
        assert_valid_dt(fixed_dt);
        assert!(max_ticks_per_frame > 0, "max_ticks_per_frame must be at least 1");
        Self {
            fixed_dt,
            max_ticks_per_frame,
            accumulator: 0.0,
            dropped: 0.0,
        }
    }

    /// Add `frame_seconds` of elapsed time and return the number of ticks to
    /// run now. Negative or non-finite frame times count as zero.
    pub fn advance(&mut self, frame_seconds: f64) -> u32 {
        if frame_seconds.is_finite() && frame_seconds > 0.0 {
            self.accumulator += frame_seconds;
        }
        let due = (self.accumulator / self.fixed_dt).floor();
        let max = self.max_ticks_per_frame;
        if due > max as f64 {
            let kept = self.accumulator % self.fixed_dt;
            let dropped = self.accumulator - kept - max as f64 * self.fixed_dt;
            self.dropped += dropped;
            self.accumulator = kept;
            debug!(due, max, dropped, "frame fell behind, dropping time");
            max
        } else {
            self.accumulator = (self.accumulator - due * self.fixed_dt).max(0.0);
            due as u32
        }
    }

    /// Fraction of a tick accumulated but not yet run, in `[0, 1)`.
    pub fn alpha(&self) -> f64 {
        self.accumulator / self.fixed_dt
    }

    /// Total seconds dropped by the catch-up limit.
    pub fn dropped_time(&self) -> f64 {
        self.dropped
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn max_ticks_per_frame(&self) -> u32 {
        self.max_ticks_per_frame
    }
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// A [`Space`] with a [`FrameClock`] in front of it.
pub struct TickLoop {
    space: Space,
    clock: FrameClock,
}

impl TickLoop {
    pub fn new(space: Space, max_ticks_per_frame: u32) -> Self {
        let clock = FrameClock::new(space.fixed_dt(), max_ticks_per_frame);
        Self { space, clock }
    }

    /// An empty space built from `config`.
    pub fn with_config(registry: Arc<Registry>, config: &TickConfig) -> Self {
        Self::new(Space::new(registry, config), config.max_ticks_per_frame)
    }

    /// Run exactly one tick, bypassing the clock.
    pub fn tick(&mut self) {
        self.space.tick();
    }

    pub fn run_ticks(&mut self, count: u64) {
        self.space.run_ticks(count);
    }

    /// Account for one rendered frame of `frame_time` and run the ticks that
    /// became due. Returns how many ran.
    pub fn advance_frame(&mut self, frame_time: Duration) -> u32 {
        let ticks = self.clock.advance(frame_time.as_secs_f64());
        for _ in 0..ticks {
            self.space.tick();
        }
        ticks
    }

    // -- accessors ----------------------------------------------------------

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut Space {
        &mut self.space
    }

    pub fn into_space(self) -> Space {
        self.space
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn tick_count(&self) -> u64 {
        self.space.tick_count()
    }

    pub fn sim_time(&self) -> f64 {
        self.space.sim_time()
    }
}

impl std::fmt::Debug for TickLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickLoop")
            .field("tick", &self.space.tick_count())
            .field("clock", &self.clock)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
