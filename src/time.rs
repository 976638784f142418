use std::time::Instant;

/// Source of monotonic timestamps in seconds
///
/// Injected into [`FrameTimer`] so tests can replay synthetic time
pub trait TimeSource {
    fn now(&mut self) -> f64;
}

/// [`TimeSource`] backed by [`Instant`], which never runs backward
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl TimeSource for MonotonicClock {
    fn now(&mut self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

pub struct FrameTimer<C = MonotonicClock> {
    source: C,
    last_time: f64,
    accumulator: f32,
    frame_count: u32,
    /// Time in seconds since the last frame
    pub delta: f32,
    /// Frames per second, updated once per second
    pub fps: u32,
    /// Total number of frames timed since start
    pub frame: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(MonotonicClock::default())
    }
}

impl<C: TimeSource> FrameTimer<C> {
    pub fn new(mut source: C) -> Self {
        let last_time = source.now();
        Self {
            source,
            last_time,
            accumulator: 0.0,
            frame_count: 0,
            delta: 0.0,
            fps: 0,
            frame: 0,
        }
    }

    /// Samples the time source & returns the delta since the previous call
    ///
    /// A delta that comes out negative or non-finite is clamped to zero
    pub fn update(&mut self) -> f32 {
        let cur_time = self.source.now();
        let delta = (cur_time - self.last_time) as f32;

        self.delta = if delta.is_finite() && delta > 0.0 {
            delta
        } else {
            if delta != 0.0 {
                log::warn!("time source went backward or broke (dt = {delta}); using 0");
            }
            0.0
        };
        // don't let a NaN or infinite timestamp poison every following delta
        if cur_time.is_finite() {
            self.last_time = cur_time;
        }

        self.accumulator += self.delta;
        self.frame_count += 1;
        self.frame += 1;

        if self.accumulator >= 1.0 {
            self.fps = self.frame_count;
            log::debug!("{} fps", self.fps);
            self.frame_count = 0;
            self.accumulator = 0.0;
        }

        self.delta
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Replays a fixed list of timestamps, repeating the last one when exhausted
    pub(crate) struct ScriptedClock {
        times: VecDeque<f64>,
        last: f64,
    }

    impl ScriptedClock {
        pub(crate) fn new(times: impl IntoIterator<Item = f64>) -> Self {
            Self {
                times: times.into_iter().collect(),
                last: 0.0,
            }
        }
    }

    impl TimeSource for ScriptedClock {
        fn now(&mut self) -> f64 {
            if let Some(t) = self.times.pop_front() {
                self.last = t;
            }
            self.last
        }
    }

    #[test]
    fn delta_tracks_time_source() {
        let mut timer = FrameTimer::new(ScriptedClock::new([1.0, 1.25, 1.5]));
        assert!((timer.update() - 0.25).abs() < 1e-6);
        assert!((timer.update() - 0.25).abs() < 1e-6);
        assert_eq!(timer.frame, 2);
    }

    #[test]
    fn backward_jump_clamps_to_zero() {
        let mut timer = FrameTimer::new(ScriptedClock::new([5.0, 4.0, 4.5]));
        assert_eq!(timer.update(), 0.0);
        // the regressed timestamp becomes the new baseline
        assert!((timer.update() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn nan_timestamp_clamps_to_zero() {
        let mut timer = FrameTimer::new(ScriptedClock::new([1.0, f64::NAN, 1.5]));
        assert_eq!(timer.update(), 0.0);
        assert!((timer.update() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn infinite_timestamp_clamps_to_zero() {
        let mut timer = FrameTimer::new(ScriptedClock::new([1.0, f64::INFINITY, 1.5]));
        assert_eq!(timer.update(), 0.0);
        assert!((timer.update() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fps_updates_once_per_second() {
        let times = (0..=4).map(|i| i as f64 * 0.25);
        let mut timer = FrameTimer::new(ScriptedClock::new(times));
        for _ in 0..3 {
            timer.update();
        }
        assert_eq!(timer.fps, 0);
        timer.update();
        assert_eq!(timer.fps, 4);
    }

    #[test]
    fn monotonic_clock_never_regresses() {
        let mut clock = MonotonicClock::default();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
