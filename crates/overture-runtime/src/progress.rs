#![forbid(unsafe_code)]

//! Fixed-duration cosmetic progress value.
//!
//! The ticker is deliberately unaware of the intro timeline: it advances from
//! 0.0 to 1.0 over its own duration, one sample per frame, and reaching 1.0
//! changes nothing but the bar.
//!
//! # Invariants
//!
//! 1. At most one run is live. `start` cancels the previous run.
//! 2. The value never decreases within a run.
//! 3. Once elapsed time reaches the duration the value is exactly 1.0 and the
//!    frame callback is released.
//! 4. A callback from a cancelled or superseded run is inert, even when
//!    invoked by hand.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::frame::{FrameControl, FrameHandle, FrameScheduler};

#[derive(Debug, Default)]
struct TickerState {
    value: f32,
    started_at: Duration,
    duration: Duration,
    /// Bumped by every `start` and `cancel`; callbacks compare against it.
    generation: u64,
    running: bool,
}

/// Per-frame progress from 0.0 to 1.0.
#[derive(Debug)]
pub struct ProgressTicker {
    state: Rc<RefCell<TickerState>>,
    scheduler: FrameScheduler,
    handle: Option<FrameHandle>,
}

impl ProgressTicker {
    /// Ticker driven by `scheduler`.
    #[must_use]
    pub fn new(scheduler: FrameScheduler) -> Self {
        Self {
            state: Rc::new(RefCell::new(TickerState::default())),
            scheduler,
            handle: None,
        }
    }

    /// Begin a run of `duration` measured from `now`.
    ///
    /// The returned handle cancels this run only; keep it in the owner's
    /// dispose bag.
    pub fn start(&mut self, duration: Duration, now: Duration) -> FrameHandle {
        self.cancel();
        {
            let mut state = self.state.borrow_mut();
            state.value = 0.0;
            state.started_at = now;
            state.duration = duration;
            state.running = true;
        }
        let handle = self.scheduler.request("progress", self.frame_callback());
        tracing::debug!(duration_ms = duration.as_millis() as u64, "progress ticker started");
        self.handle = Some(handle.clone());
        handle
    }

    /// Stop advancing and release the frame callback. The value is kept.
    pub fn cancel(&mut self) {
        let mut state = self.state.borrow_mut();
        state.generation = state.generation.wrapping_add(1);
        let was_running = std::mem::replace(&mut state.running, false);
        drop(state);
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
        if was_running {
            tracing::trace!("progress ticker cancelled");
        }
    }

    /// Current value in [0.0, 1.0].
    #[must_use]
    pub fn value(&self) -> f32 {
        self.state.borrow().value
    }

    /// Whether a run is advancing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Whether the current run still holds a scheduler slot.
    #[must_use]
    pub fn has_frame_callback(&self) -> bool {
        self.handle.as_ref().is_some_and(FrameHandle::is_active)
    }

    /// A callback bound to the current run.
    ///
    /// Once the run ends, is cancelled or is superseded, the callback does
    /// nothing and returns [`FrameControl::Stop`].
    pub fn frame_callback(&self) -> impl FnMut(Duration) -> FrameControl + 'static {
        let state = Rc::clone(&self.state);
        let generation = state.borrow().generation;
        move |now| {
            let mut state = state.borrow_mut();
            if state.generation != generation || !state.running {
                return FrameControl::Stop;
            }
            let elapsed = now.saturating_sub(state.started_at);
            if elapsed >= state.duration {
                state.value = 1.0;
                state.running = false;
                return FrameControl::Stop;
            }
            let t = (elapsed.as_secs_f64() / state.duration.as_secs_f64()) as f32;
            state.value = state.value.max(t.clamp(0.0, 1.0));
            FrameControl::Continue
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}
