#![forbid(unsafe_code)]

//! Deterministic driver for an [`IntroOverlay`].
//!
//! Owns a [`DeterministicClock`] and pumps frames at a fixed interval, so a
//! whole session can be replayed in tests or in the headless demo without
//! real time passing.

use std::time::Duration;

use overture_core::{Clock, DeterministicClock, InputEvent};

use crate::overlay::{IntroOverlay, OverlayState};

/// One frame at 60 Hz, rounded to whole milliseconds.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Fixed-step clock plus overlay.
#[derive(Debug)]
pub struct OverlaySimulator {
    overlay: IntroOverlay,
    clock: DeterministicClock,
    frame_interval: Duration,
}

impl OverlaySimulator {
    /// Drive `overlay` from time zero. The overlay is not mounted yet.
    #[must_use]
    pub fn new(overlay: IntroOverlay) -> Self {
        Self {
            overlay,
            clock: DeterministicClock::new(),
            frame_interval: FRAME_INTERVAL,
        }
    }

    /// Use a different frame step. Zero is replaced by one millisecond.
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = if interval.is_zero() {
            Duration::from_millis(1)
        } else {
            interval
        };
        self
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now_mono()
    }

    #[must_use]
    pub fn overlay(&self) -> &IntroOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut IntroOverlay {
        &mut self.overlay
    }

    #[must_use]
    pub fn state(&self) -> OverlayState {
        self.overlay.state()
    }

    /// Mount at the current time.
    pub fn mount(&mut self) {
        let now = self.now();
        self.overlay.mount(now);
    }

    /// Deliver `event` at the current time.
    pub fn dispatch(&mut self, event: impl Into<InputEvent>) {
        let now = self.now();
        self.overlay.dispatch(event.into(), now);
    }

    /// Step one frame, then deliver `inputs` within the same turn.
    pub fn turn(&mut self, inputs: impl IntoIterator<Item = InputEvent>) {
        let now = self.clock.advance(self.frame_interval);
        self.overlay.turn(now, inputs);
    }

    /// Step one frame.
    pub fn step(&mut self) {
        let now = self.clock.advance(self.frame_interval);
        self.overlay.frame(now);
    }

    /// Step frames until at least `span` has passed.
    pub fn run_for(&mut self, span: Duration) {
        let end = self.now().saturating_add(span);
        while self.now() < end {
            let step = self.frame_interval.min(end - self.now());
            let now = self.clock.advance(step);
            self.overlay.frame(now);
        }
    }

    /// Step until the overlay reaches `state` or `limit` passes.
    ///
    /// Returns whether the state was reached.
    pub fn run_until(&mut self, state: OverlayState, limit: Duration) -> bool {
        let end = self.now().saturating_add(limit);
        while self.overlay.state() != state {
            if self.now() >= end {
                return false;
            }
            self.step();
        }
        true
    }

    /// Unwrap the overlay.
    #[must_use]
    pub fn into_overlay(self) -> IntroOverlay {
        self.overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_for_lands_exactly() {
        let mut sim = OverlaySimulator::new(IntroOverlay::builder().build());
        sim.mount();
        sim.run_for(Duration::from_millis(1000));
        assert_eq!(sim.now(), Duration::from_millis(1000));
    }

    #[test]
    fn run_until_reports_timeout() {
        let mut sim = OverlaySimulator::new(IntroOverlay::builder().build());
        sim.mount();
        assert!(!sim.run_until(OverlayState::Dismissed, Duration::from_secs(1)));
        assert!(sim.run_until(OverlayState::ContentShown, Duration::from_secs(10)));
        assert!(sim.now() >= Duration::from_millis(6400));
    }
}
