use serde::Deserialize;

use crate::error::{Error, Result};

/// Stalls spanning more intervals than this skip most of them in one subtraction
const BULK_SKIP_THRESHOLD: f32 = 1024.0;

/// How the clock spends accumulated time that spans more than one interval
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StepPolicy {
    /// Advance once per whole interval & keep the remainder, so a stall is caught up
    #[default]
    CatchUp,
    /// Advance at most once per tick & zero the accumulator, discarding any excess
    DropExcess,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Running,
}

/// Fixed-interval frame clock over an ordered sequence of frame names
///
/// Frame changes are driven by elapsed seconds, not by how often `tick` is called
#[derive(Clone, Debug)]
pub struct AnimationClock {
    frames: Vec<String>,
    current: usize,
    timer: f32,
    interval: f32,
    policy: StepPolicy,
    state: ClockState,
}

impl AnimationClock {
    /// Creates a running clock starting at the first frame
    pub fn new<S: Into<String>>(frames: impl IntoIterator<Item = S>, interval: f32) -> Result<Self> {
        let frames: Vec<String> = frames.into_iter().map(Into::into).collect();
        if frames.is_empty() {
            return Err(Error::EmptySequence);
        }
        if !(interval.is_finite() && interval > 0.0) {
            return Err(Error::InvalidInterval(interval));
        }

        Ok(Self {
            frames,
            current: 0,
            timer: 0.0,
            interval,
            policy: StepPolicy::default(),
            state: ClockState::Running,
        })
    }

    pub fn with_policy(mut self, policy: StepPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Feeds `dt` seconds into the clock & returns how many frames it advanced
    ///
    /// Negative, NaN & infinite `dt` count as zero. An idle clock ignores time entirely
    pub fn tick(&mut self, dt: f32) -> u64 {
        if self.state == ClockState::Idle || !dt.is_finite() || dt <= 0.0 {
            return 0;
        }

        self.timer += dt;
        if self.timer < self.interval {
            return 0;
        }

        let steps = match self.policy {
            StepPolicy::DropExcess => {
                self.timer = 0.0;
                1
            }
            StepPolicy::CatchUp => {
                let mut steps = 0;
                let whole = (self.timer / self.interval).floor();
                if whole > BULK_SKIP_THRESHOLD {
                    // leave one interval for the loop so it settles the remainder
                    let bulk = whole - 1.0;
                    self.timer = (self.timer - bulk * self.interval).max(0.0);
                    steps = bulk as u64;
                }
                while self.timer >= self.interval {
                    self.timer -= self.interval;
                    steps += 1;
                }
                steps
            }
        };

        let len = self.frames.len() as u64;
        self.current = ((self.current as u64 + steps % len) % len) as usize;
        steps
    }

    /// Stops consuming time; the current frame stays put
    pub fn pause(&mut self) {
        self.state = ClockState::Idle;
    }

    pub fn resume(&mut self) {
        self.state = ClockState::Running;
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_frame(&self) -> &str {
        &self.frames[self.current]
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Seconds accumulated toward the next frame
    pub fn accumulated(&self) -> f32 {
        self.timer
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn policy(&self) -> StepPolicy {
        self.policy
    }
}
