//! Monotonic frame clock.
//!
//! The clock is ticked exactly once per rendered frame. Where the time comes
//! from is injectable so the frame loop can be driven synchronously in tests
//! with a fixed step instead of wall-clock time.

use instant::Instant;

/// Source of "now" in seconds. Implementations need not be monotonic; the
/// clock never lets `time` go backwards.
pub trait TimeSource {
    fn now_sec(&mut self) -> f64;
}

/// Wall-clock time since construction (works on wasm through `instant`).
pub struct InstantSource {
    origin: Instant,
}

impl InstantSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for InstantSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for InstantSource {
    fn now_sec(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Advances by a constant step on every query.
#[derive(Clone, Debug)]
pub struct FixedStepSource {
    now: f64,
    step: f64,
}

impl FixedStepSource {
    pub fn new(step: f64) -> Self {
        Self { now: 0.0, step }
    }
}

impl TimeSource for FixedStepSource {
    fn now_sec(&mut self) -> f64 {
        self.now += self.step;
        self.now
    }
}

/// Elapsed time and inter-frame delta, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    pub time: f64,
    pub dt: f64,
}

pub struct FrameClock {
    source: Box<dyn TimeSource>,
    started: Option<f64>,
    current: FrameTime,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_source(Box::new(InstantSource::new()))
    }

    pub fn with_source(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            started: None,
            current: FrameTime::default(),
        }
    }

    /// Advance to "now". The first tick establishes the origin and reports
    /// `dt = 0`; a source that moves backwards also reports `dt = 0`.
    pub fn tick(&mut self) -> FrameTime {
        let now = self.source.now_sec();
        let origin = *self.started.get_or_insert(now);
        let time = (now - origin).max(self.current.time);
        self.current = FrameTime {
            time,
            dt: time - self.current.time,
        };
        self.current
    }

    pub fn time(&self) -> f64 {
        self.current.time
    }

    pub fn dt(&self) -> f64 {
        self.current.dt
    }

    pub fn current(&self) -> FrameTime {
        self.current
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Vec<f64>);

    impl TimeSource for Scripted {
        fn now_sec(&mut self) -> f64 {
            self.0.remove(0)
        }
    }

    #[test]
    fn first_tick_has_zero_dt() {
        let mut clock = FrameClock::with_source(Box::new(Scripted(vec![12.0, 12.5])));
        assert_eq!(clock.tick(), FrameTime { time: 0.0, dt: 0.0 });
        assert_eq!(clock.tick(), FrameTime { time: 0.5, dt: 0.5 });
    }

    #[test]
    fn time_never_goes_backwards() {
        let mut clock = FrameClock::with_source(Box::new(Scripted(vec![0.0, 2.0, 1.0, 3.0])));
        clock.tick();
        clock.tick();
        let stalled = clock.tick();
        assert_eq!(stalled.time, 2.0);
        assert_eq!(stalled.dt, 0.0);
        let resumed = clock.tick();
        assert_eq!(resumed.time, 3.0);
        assert_eq!(resumed.dt, 1.0);
    }

    #[test]
    fn fixed_step_source_advances_evenly() {
        let mut clock = FrameClock::with_source(Box::new(FixedStepSource::new(0.25)));
        clock.tick();
        for _ in 0..4 {
            assert!((clock.tick().dt - 0.25).abs() < 1e-12);
        }
        assert!((clock.time() - 1.0).abs() < 1e-12);
    }
}
