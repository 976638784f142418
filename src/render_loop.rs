use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    animation::AnimationClock,
    error::Result,
    time::{FrameTimer, MonotonicClock, TimeSource},
};

/// Whatever puts a named atlas frame on screen for one refresh
pub trait FrameRenderer {
    fn render_frame(&mut self, frame: &str) -> Result<()>;
}

/// Shared flag that ends the loop before its next iteration
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Whether the host should schedule another iteration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stopped,
}

/// Per-refresh driver: measures elapsed time, advances the animation & renders the frame
///
/// The host calls [`RenderLoop::tick`] once per display refresh & schedules the next call
/// only when it returns [`Tick::Continue`]
pub struct RenderLoop<C = MonotonicClock> {
    clock: AnimationClock,
    timer: FrameTimer<C>,
    stop: StopHandle,
}

impl<C: TimeSource> RenderLoop<C> {
    pub fn new(clock: AnimationClock, timer: FrameTimer<C>) -> Self {
        Self {
            clock,
            timer,
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut AnimationClock {
        &mut self.clock
    }

    pub fn timer(&self) -> &FrameTimer<C> {
        &self.timer
    }

    /// Runs one iteration
    ///
    /// A render error stops the loop for good & is handed back to the host
    pub fn tick(&mut self, renderer: &mut impl FrameRenderer) -> Result<Tick> {
        if self.stop.is_stopped() {
            return Ok(Tick::Stopped);
        }

        let dt = self.timer.update();
        let advanced = self.clock.tick(dt);
        if advanced > 1 {
            log::trace!("caught up {advanced} frames after a {dt:.3}s refresh");
        }

        if let Err(e) = renderer.render_frame(self.clock.current_frame()) {
            self.stop.stop();
            return Err(e);
        }

        Ok(if self.stop.is_stopped() {
            Tick::Stopped
        } else {
            Tick::Continue
        })
    }
}
