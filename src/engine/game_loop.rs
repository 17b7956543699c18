/// Fixed timestep driver
///
/// Converts variable frame times into a whole number of fixed simulation
/// ticks. Frame times are passed in rather than read from a clock, so a
/// recorded sequence of frame times always yields the same ticks.
use crate::game::config::ArenaConfig;
use std::time::Duration;

/// Accumulator state
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    /// Length of one tick
    step: Duration,
    /// Time not yet consumed by ticks
    accumulator: Duration,
    max_steps: u32,
    paused: bool,
    frame_count: u64,
    tick_count: u64,
    /// Ticks thrown away because a frame exceeded `max_steps`
    dropped_ticks: u64,
}

impl FixedTimestep {
    /// Timestep running at `tick_rate` ticks per second
    pub fn new(tick_rate: f32, max_steps: u32) -> Self {
        Self {
            step: Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1.0))),
            accumulator: Duration::ZERO,
            max_steps: max_steps.max(1),
            paused: false,
            frame_count: 0,
            tick_count: 0,
            dropped_ticks: 0,
        }
    }

    /// Timestep at the arena's tick rate and step cap
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self::new(config.tick_rate, config.max_steps_per_frame)
    }

    /// Feed one frame's elapsed time, returns the number of ticks to run
    pub fn advance(&mut self, frame_time: Duration) -> u32 {
        self.frame_count += 1;

        // If paused, don't accumulate time for updates
        if self.paused {
            return 0;
        }

        self.accumulator += frame_time;

        let mut ticks = 0;
        while self.accumulator >= self.step && ticks < self.max_steps {
            self.accumulator -= self.step;
            ticks += 1;
        }

        // Too far behind: drop whole ticks, keep the fractional remainder
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            self.dropped_ticks += 1;
        }

        self.tick_count += u64::from(ticks);
        ticks
    }

    /// Length of one tick in seconds
    pub fn step_secs(&self) -> f32 {
        self.step.as_secs_f32()
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Interpolation factor between the last two ticks, in `[0, 1)`
    pub fn alpha(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.step.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn dropped_ticks(&self) -> u64 {
        self.dropped_ticks
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Simulation paused");
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Reset accumulator to prevent a burst of ticks
            self.accumulator = Duration::ZERO;
            log::info!("Simulation resumed");
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::from_config(&ArenaConfig::DEFAULT)
    }
}
